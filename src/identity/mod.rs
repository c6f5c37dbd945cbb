// Identity module
//
// Establishes who is reading and, when available, the bearer token used for
// the document fetch. Every failure degrades to a guest session.

pub mod id_token;
pub mod oauth;

pub use id_token::{decode_claims, email_from_id_token, IdTokenClaims};
pub use oauth::{
    authorization_url, AuthorizationRequest, GoogleIdentity, IdentityProvider, RedirectFragment,
    TokenResponse,
};

use crate::error::ViewerError;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("Identity provider returned error: {0}")]
    Provider(String),

    #[error("Malformed token: {0}")]
    MalformedToken(String),

    #[error("Malformed redirect: {0}")]
    MalformedRedirect(String),

    #[error("Token carries no email")]
    MissingEmail,

    #[error("Redirect state does not match the authorization request")]
    StateMismatch,

    #[error("Identity endpoint returned HTTP {0}")]
    Http(u16),

    #[error("Identity request failed: {0}")]
    Transport(String),

    #[error("Identity not configured: {0}")]
    NotConfigured(String),
}

impl From<IdentityError> for ViewerError {
    fn from(err: IdentityError) -> Self {
        ViewerError::AuthFailure(err.to_string())
    }
}

/// Who is reading, for one load attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub identity: Option<String>,
    pub bearer: Option<String>,
}

impl Session {
    pub fn guest() -> Self {
        Self::default()
    }

    pub fn new(identity: Option<String>, bearer: Option<String>) -> Self {
        let clean = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        Self {
            identity: clean(identity),
            bearer: clean(bearer),
        }
    }

    pub fn is_guest(&self) -> bool {
        self.identity.is_none()
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    pub fn bearer(&self) -> Option<&str> {
        self.bearer.as_deref()
    }
}

/// Credentials handed to [`authenticate`]. Flows are tried in field order:
/// preset, redirect, then ID token / authorization code.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    /// Host-supplied email (`email` query parameter)
    pub preset_email: Option<String>,
    /// Host-supplied bearer (`token` query parameter)
    pub preset_token: Option<String>,
    /// URL the identity provider redirected back to
    pub redirect_url: Option<String>,
    /// State generated with the authorization URL
    pub expected_state: Option<String>,
    /// Signed ID token from the credential flow
    pub id_token: Option<String>,
    /// Access token obtained alongside the ID token
    pub access_token: Option<String>,
    /// Authorization code to exchange for an access token
    pub auth_code: Option<String>,
}

impl Credentials {
    fn is_empty(&self) -> bool {
        self.preset_email.is_none()
            && self.preset_token.is_none()
            && self.redirect_url.is_none()
            && self.id_token.is_none()
            && self.access_token.is_none()
            && self.auth_code.is_none()
    }
}

/// Run the first applicable identity flow. Never fails: any error is logged
/// and yields a guest session without a bearer.
pub async fn authenticate(provider: &dyn IdentityProvider, credentials: &Credentials) -> Session {
    if credentials.is_empty() {
        tracing::info!("No credentials supplied, continuing as guest");
        return Session::guest();
    }

    match try_authenticate(provider, credentials).await {
        Ok(session) => {
            tracing::info!(
                identity = session.identity().unwrap_or("-"),
                has_bearer = session.bearer.is_some(),
                "Authenticated"
            );
            session
        }
        Err(e) => {
            tracing::warn!(error = %e, "Authentication failed, continuing as guest");
            Session::guest()
        }
    }
}

async fn try_authenticate(
    provider: &dyn IdentityProvider,
    credentials: &Credentials,
) -> Result<Session, IdentityError> {
    // (c) preset flow; a bare token is resolved to its owner
    match (&credentials.preset_email, &credentials.preset_token) {
        (Some(email), token) => return Ok(Session::new(Some(email.clone()), token.clone())),
        (None, Some(token)) => {
            let email = provider.userinfo_email(token).await?;
            return Ok(Session::new(Some(email), Some(token.clone())));
        }
        (None, None) => {}
    }

    // (b) redirect flow
    if let Some(url) = &credentials.redirect_url {
        let fragment = RedirectFragment::parse(url, credentials.expected_state.as_deref())?;
        let email = match &fragment.id_token {
            Some(token) => email_from_id_token(token)?,
            None => provider.userinfo_email(&fragment.access_token).await?,
        };
        return Ok(Session::new(Some(email), Some(fragment.access_token)));
    }

    // (a) credential flow
    let email = match &credentials.id_token {
        Some(token) => Some(email_from_id_token(token)?),
        None => None,
    };

    let (bearer, exchanged_id_token) = match (&credentials.access_token, &credentials.auth_code) {
        (Some(token), _) => (Some(token.clone()), None),
        (None, Some(code)) => {
            let tokens = provider.exchange_code(code).await?;
            (Some(tokens.access_token), tokens.id_token)
        }
        (None, None) => (None, None),
    };

    let email = match (email, exchanged_id_token, &bearer) {
        (Some(email), _, _) => email,
        (None, Some(token), _) => email_from_id_token(&token)?,
        (None, None, Some(bearer)) => provider.userinfo_email(bearer).await?,
        (None, None, None) => return Err(IdentityError::MissingEmail),
    };

    Ok(Session::new(Some(email), bearer))
}
