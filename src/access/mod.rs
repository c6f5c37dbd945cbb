// Access decisions and the access-request flow

pub mod script;

pub use script::{ScriptClient, UNKNOWN_EMAIL};

use crate::error::ViewerError;
use crate::source::{FallbackReason, Resolution, SourceResolver};
use serde::{Deserialize, Serialize};

/// Per-load-attempt access decision. Never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Granted,
    Denied,
    Unknown,
}

/// Affordances offered when access is denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DenialChoice {
    #[default]
    RequestAccess,
    ViewSample,
}

pub const REQUEST_SUBMITTED: &str = "Request submitted. Admin will be notified.";
pub const REQUEST_FAILED: &str = "Request failed; try again later.";
pub const REQUEST_UNAVAILABLE: &str = "Access requests are not configured.";

/// Result of acting on a denial. Both choices end with the fallback
/// document loaded.
#[derive(Debug, Clone)]
pub struct DenialOutcome {
    pub choice: DenialChoice,
    /// Status line shown to the reader after an access request
    pub status_message: Option<String>,
    pub fallback: Resolution,
}

/// Acts on the reader's choice after a denied fetch.
pub struct AccessRequestFlow<'a> {
    script: Option<&'a ScriptClient>,
    resolver: &'a SourceResolver,
}

impl<'a> AccessRequestFlow<'a> {
    pub fn new(script: Option<&'a ScriptClient>, resolver: &'a SourceResolver) -> Self {
        Self { script, resolver }
    }

    pub async fn choose(
        &self,
        choice: DenialChoice,
        email: Option<&str>,
        file_id: &str,
    ) -> Result<DenialOutcome, ViewerError> {
        let status_message = match choice {
            DenialChoice::ViewSample => None,
            DenialChoice::RequestAccess => Some(self.request_access(email, file_id).await),
        };

        let fallback = self.resolver.load_fallback(FallbackReason::Requested).await?;

        Ok(DenialOutcome {
            choice,
            status_message,
            fallback,
        })
    }

    async fn request_access(&self, email: Option<&str>, file_id: &str) -> String {
        let Some(script) = self.script else {
            tracing::warn!(file_id = %file_id, "No script endpoint configured for access requests");
            return REQUEST_UNAVAILABLE.to_string();
        };

        match script.request_access(email, file_id).await {
            Ok(()) => REQUEST_SUBMITTED.to_string(),
            Err(e) => {
                tracing::warn!(file_id = %file_id, error = %e, "Access request failed");
                REQUEST_FAILED.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DocumentConfig, EndpointsConfig};
    use crate::testing::{StubServer, REFUSED_URL};
    use std::time::Duration;

    fn resolver() -> SourceResolver {
        SourceResolver::new(&DocumentConfig::default(), &EndpointsConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_view_sample_skips_request() {
        let resolver = resolver();
        let outcome = AccessRequestFlow::new(None, &resolver)
            .choose(DenialChoice::ViewSample, Some("a@b.com"), "abc")
            .await
            .unwrap();

        assert_eq!(outcome.status_message, None);
        assert!(matches!(
            outcome.fallback,
            Resolution::Fallback {
                reason: FallbackReason::Requested,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_request_access_acknowledged() {
        let server = StubServer::start(200, "application/json", br#"{"ok":true}"#.to_vec()).await;
        let script = ScriptClient::new(server.url.clone(), Duration::from_secs(5)).unwrap();
        let resolver = resolver();

        let outcome = AccessRequestFlow::new(Some(&script), &resolver)
            .choose(DenialChoice::RequestAccess, Some("a@b.com"), "abc")
            .await
            .unwrap();

        assert_eq!(outcome.status_message.as_deref(), Some(REQUEST_SUBMITTED));
        assert!(matches!(outcome.fallback, Resolution::Fallback { .. }));
        assert!(server.requests()[0].target.contains("action=requestAccess"));
    }

    #[tokio::test]
    async fn test_request_access_failure_still_loads_fallback() {
        let script = ScriptClient::new(REFUSED_URL, Duration::from_secs(2)).unwrap();
        let resolver = resolver();

        let outcome = AccessRequestFlow::new(Some(&script), &resolver)
            .choose(DenialChoice::RequestAccess, None, "abc")
            .await
            .unwrap();

        assert_eq!(outcome.status_message.as_deref(), Some(REQUEST_FAILED));
        assert!(matches!(outcome.fallback, Resolution::Fallback { .. }));
    }
}
