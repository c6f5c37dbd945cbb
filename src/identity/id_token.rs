//! Google ID token payload decoding.
//!
//! The token is only read for its `email` claim. Signatures are not
//! verified: the bearer token, not the ID token, is what the document store
//! checks.

use super::IdentityError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdTokenClaims {
    pub email: Option<String>,
    pub email_verified: Option<bool>,
    pub sub: Option<String>,
    pub iss: Option<String>,
    pub exp: Option<u64>,
    #[serde(flatten)]
    pub custom: serde_json::Map<String, serde_json::Value>,
}

/// Decode the claims of a compact JWS without checking its signature.
pub fn decode_claims(token: &str) -> Result<IdTokenClaims, IdentityError> {
    let token = token.trim();
    let header = jsonwebtoken::decode_header(token)
        .map_err(|e| IdentityError::MalformedToken(format!("invalid header: {}", e)))?;

    let mut segments = token.split('.');
    let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
        (Some(_), Some(payload), Some(_), None) => payload,
        _ => {
            return Err(IdentityError::MalformedToken(
                "expected three dot-separated segments".to_string(),
            ))
        }
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| IdentityError::MalformedToken(format!("payload is not base64url: {}", e)))?;

    let claims: IdTokenClaims = serde_json::from_slice(&bytes)
        .map_err(|e| IdentityError::MalformedToken(format!("payload is not JSON: {}", e)))?;

    tracing::debug!(
        alg = ?header.alg,
        kid = header.kid.as_deref().unwrap_or("-"),
        has_email = claims.email.is_some(),
        "Decoded ID token payload"
    );

    Ok(claims)
}

/// Extract the reader's email from an ID token.
pub fn email_from_id_token(token: &str) -> Result<String, IdentityError> {
    decode_claims(token)?
        .email
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
        .ok_or(IdentityError::MissingEmail)
}
