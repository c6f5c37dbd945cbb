//! OAuth endpoints: authorization URL, redirect fragment, code exchange and
//! userinfo.

use super::IdentityError;
use crate::config::overrides::parse_query;
use crate::config::IdentityConfig;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Parameters tying a redirect back to the request that started it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
    pub nonce: String,
}

/// Build the implicit-flow authorization URL
/// (`response_type=token id_token`) with a fresh state and nonce.
pub fn authorization_url(config: &IdentityConfig) -> Result<AuthorizationRequest, IdentityError> {
    if config.client_id.is_empty() || config.redirect_uri.is_empty() {
        return Err(IdentityError::NotConfigured(
            "identity.client_id and identity.redirect_uri are required".to_string(),
        ));
    }

    let state = uuid::Uuid::new_v4().simple().to_string();
    let nonce = uuid::Uuid::new_v4().simple().to_string();

    let url = format!(
        "{}?client_id={}&redirect_uri={}&response_type={}&scope={}&state={}&nonce={}&include_granted_scopes=true",
        config.authorization_endpoint,
        urlencoding::encode(&config.client_id),
        urlencoding::encode(&config.redirect_uri),
        urlencoding::encode("token id_token"),
        urlencoding::encode(&config.scope),
        state,
        nonce,
    );

    Ok(AuthorizationRequest { url, state, nonce })
}

/// Tokens carried back in a redirect URL fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectFragment {
    pub access_token: String,
    pub id_token: Option<String>,
    pub state: Option<String>,
}

impl RedirectFragment {
    /// Parse the fragment of `redirect_url` (or a bare fragment).
    ///
    /// `error=` in the fragment, a missing access token and a state that does
    /// not match `expected_state` are all failures.
    pub fn parse(redirect_url: &str, expected_state: Option<&str>) -> Result<Self, IdentityError> {
        let fragment = match redirect_url.split_once('#') {
            Some((_, fragment)) => fragment,
            None if !redirect_url.contains("://") => redirect_url,
            None => {
                return Err(IdentityError::MalformedRedirect(
                    "redirect URL has no fragment".to_string(),
                ))
            }
        };

        let params = parse_query(fragment);

        if let Some(error) = params.get("error") {
            return Err(IdentityError::Provider(error.clone()));
        }

        let state = params.get("state").cloned();
        if let Some(expected) = expected_state {
            if state.as_deref() != Some(expected) {
                return Err(IdentityError::StateMismatch);
            }
        }

        let access_token = params
            .get("access_token")
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                IdentityError::MalformedRedirect("fragment has no access_token".to_string())
            })?;

        let id_token = params
            .get("id_token")
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        Ok(Self {
            access_token,
            id_token,
            state,
        })
    }
}

/// Token endpoint response for an authorization-code exchange.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    email: Option<String>,
}

/// Remote identity operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Exchange an authorization code for tokens.
    async fn exchange_code(&self, code: &str) -> Result<TokenResponse, IdentityError>;

    /// Look up the email of the account owning `bearer`.
    async fn userinfo_email(&self, bearer: &str) -> Result<String, IdentityError>;
}

/// Google OAuth endpoints over HTTP.
pub struct GoogleIdentity {
    config: IdentityConfig,
    client: reqwest::Client,
}

impl GoogleIdentity {
    pub fn new(config: IdentityConfig) -> Result<Self, IdentityError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| IdentityError::Transport(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }
}

fn transport_error(e: reqwest::Error) -> IdentityError {
    if e.is_timeout() {
        IdentityError::Transport("Request timed out".to_string())
    } else if e.is_connect() {
        IdentityError::Transport(format!("Connection failed: {}", e))
    } else {
        IdentityError::Transport(format!("Request failed: {}", e))
    }
}

#[async_trait]
impl IdentityProvider for GoogleIdentity {
    async fn exchange_code(&self, code: &str) -> Result<TokenResponse, IdentityError> {
        let secret = self.config.client_secret.as_deref().ok_or_else(|| {
            IdentityError::NotConfigured(
                "identity.client_secret is required for code exchange".to_string(),
            )
        })?;

        let form = [
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", secret),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];

        let response = self
            .client
            .post(&self.config.token_endpoint)
            .header("Accept", "application/json")
            .form(&form)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(IdentityError::Http(response.status().as_u16()));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| IdentityError::MalformedToken(format!("Invalid token response: {}", e)))
    }

    async fn userinfo_email(&self, bearer: &str) -> Result<String, IdentityError> {
        let response = self
            .client
            .get(&self.config.userinfo_endpoint)
            .bearer_auth(bearer)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(IdentityError::Http(response.status().as_u16()));
        }

        let info: UserInfo = response
            .json()
            .await
            .map_err(|e| IdentityError::MalformedToken(format!("Invalid userinfo response: {}", e)))?;

        info.email
            .filter(|e| !e.trim().is_empty())
            .ok_or(IdentityError::MissingEmail)
    }
}
