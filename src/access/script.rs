//! Client for the access/logging script endpoint.
//!
//! One URL serves three operations:
//! - `GET ?action=checkAccess&email=..&fileId=..` answers `{status, hasAccess}`
//! - `GET ?action=requestAccess&email=..&fileId=..` answers any JSON acknowledgement
//! - `POST` with a JSON body records reading progress

use super::AccessDecision;
use crate::error::ViewerError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Email sent when the reader is a guest.
pub const UNKNOWN_EMAIL: &str = "unknown";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckAccessResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    has_access: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct ScriptClient {
    endpoint: String,
    client: reqwest::Client,
}

impl ScriptClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ViewerError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ViewerError::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }

    fn action_url(&self, action: &str, email: Option<&str>, file_id: &str) -> String {
        let separator = if self.endpoint.contains('?') { '&' } else { '?' };
        format!(
            "{}{}action={}&fileId={}&email={}",
            self.endpoint,
            separator,
            action,
            urlencoding::encode(file_id),
            urlencoding::encode(email.unwrap_or(UNKNOWN_EMAIL)),
        )
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T, ViewerError> {
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| ViewerError::Logging(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ViewerError::Logging(format!(
                "HTTP {} response",
                response.status()
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ViewerError::Logging(format!("Invalid JSON: {}", e)))
    }

    /// Ask whether `email` may read `file_id`. Any failure is `Unknown`.
    pub async fn check_access(&self, email: Option<&str>, file_id: &str) -> AccessDecision {
        let url = self.action_url("checkAccess", email, file_id);
        match self.get_json::<CheckAccessResponse>(&url).await {
            Ok(CheckAccessResponse {
                has_access: Some(true),
                ..
            }) => AccessDecision::Granted,
            Ok(CheckAccessResponse {
                has_access: Some(false),
                status,
            }) => {
                tracing::info!(file_id = %file_id, status = status.as_deref().unwrap_or("-"), "Access check denied");
                AccessDecision::Denied
            }
            Ok(_) => {
                tracing::warn!(file_id = %file_id, "Access check response has no hasAccess field");
                AccessDecision::Unknown
            }
            Err(e) => {
                tracing::warn!(file_id = %file_id, error = %e, "Access check failed");
                AccessDecision::Unknown
            }
        }
    }

    /// Record an access request for `file_id`; the endpoint notifies an admin.
    pub async fn request_access(&self, email: Option<&str>, file_id: &str) -> Result<(), ViewerError> {
        let url = self.action_url("requestAccess", email, file_id);
        let ack: serde_json::Value = self.get_json(&url).await?;
        tracing::info!(file_id = %file_id, ack = %ack, "Access request submitted");
        Ok(())
    }

    /// POST a JSON document to the endpoint.
    pub async fn post_json<T: Serialize + ?Sized>(&self, body: &T) -> Result<(), ViewerError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(body)
            .send()
            .await
            .map_err(|e| ViewerError::Logging(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ViewerError::Logging(format!(
                "HTTP {} response",
                response.status()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StubServer, REFUSED_URL};

    fn client(url: &str) -> ScriptClient {
        ScriptClient::new(url, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_action_url_encodes_parameters() {
        let script = client("https://script.example.com/exec");
        assert_eq!(
            script.action_url("requestAccess", Some("a+b@c.com"), "abc"),
            "https://script.example.com/exec?action=requestAccess&fileId=abc&email=a%2Bb%40c.com"
        );
        assert!(script
            .action_url("checkAccess", None, "abc")
            .ends_with("&email=unknown"));
    }

    #[test]
    fn test_action_url_appends_to_existing_query() {
        let script = client("https://script.example.com/exec?v=2");
        assert!(script
            .action_url("checkAccess", None, "abc")
            .starts_with("https://script.example.com/exec?v=2&action=checkAccess"));
    }

    #[tokio::test]
    async fn test_check_access_granted() {
        let server = StubServer::start(
            200,
            "application/json",
            br#"{"status":"ok","hasAccess":true}"#.to_vec(),
        )
        .await;

        let decision = client(&server.url).check_access(Some("a@b.com"), "abc").await;
        assert_eq!(decision, AccessDecision::Granted);
        assert!(server.requests()[0]
            .target
            .starts_with("/?action=checkAccess&fileId=abc&email=a%40b.com"));
    }

    #[tokio::test]
    async fn test_check_access_denied() {
        let server = StubServer::start(
            200,
            "application/json",
            br#"{"status":"denied","hasAccess":false}"#.to_vec(),
        )
        .await;
        let decision = client(&server.url).check_access(Some("a@b.com"), "abc").await;
        assert_eq!(decision, AccessDecision::Denied);
    }

    #[tokio::test]
    async fn test_check_access_failure_is_unknown() {
        let decision = client(REFUSED_URL).check_access(Some("a@b.com"), "abc").await;
        assert_eq!(decision, AccessDecision::Unknown);

        let server = StubServer::start(200, "text/html", b"<html>".to_vec()).await;
        let decision = client(&server.url).check_access(Some("a@b.com"), "abc").await;
        assert_eq!(decision, AccessDecision::Unknown);
    }

    #[tokio::test]
    async fn test_request_access_requires_json_ack() {
        let server = StubServer::start(200, "application/json", br#"{"ok":true}"#.to_vec()).await;
        assert!(client(&server.url).request_access(None, "abc").await.is_ok());

        let server = StubServer::start(200, "text/plain", b"queued".to_vec()).await;
        assert!(matches!(
            client(&server.url).request_access(None, "abc").await,
            Err(ViewerError::Logging(_))
        ));
    }

    #[tokio::test]
    async fn test_post_json_sends_body() {
        let server = StubServer::start(200, "application/json", b"{}".to_vec()).await;
        client(&server.url)
            .post_json(&serde_json::json!({"pagesRead": 2}))
            .await
            .unwrap();

        let requests = server.requests();
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].header("content-type"), Some("application/json"));
        assert_eq!(requests[0].body, r#"{"pagesRead":2}"#);
    }
}
