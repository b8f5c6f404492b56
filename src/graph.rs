//! Client for the Meta Graph API targeting search.
//!
//! Every taxonomy endpoint of the proxy ends up as one
//! `GET {base_url}/{api_version}/search?type=…&q=…&access_token=…` call.
//! The [`TargetingApi`] trait is the seam between the proxy and the network;
//! [`GraphApi`] is the real implementation and tests substitute their own.
//!
//! The access token is appended here and nowhere else. Error values carry
//! no URL, so a failure message can be returned to clients or logged
//! without exposing the credential.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::config::UpstreamConfig;

/// Why an upstream call produced no data.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("Missing META_ACCESS_TOKEN on server")]
    MissingCredential,
    #[error("upstream request failed: {0}")]
    Transport(String),
    #[error("upstream returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("upstream returned an unreadable body: {0}")]
    Malformed(String),
}

impl UpstreamError {
    /// Short failure class used as a log field.
    pub fn class(&self) -> &'static str {
        match self {
            UpstreamError::MissingCredential => "missing_credential",
            UpstreamError::Transport(_) => "transport",
            UpstreamError::Status { .. } => "status",
            UpstreamError::Malformed(_) => "malformed",
        }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        UpstreamError::Transport(err.without_url().to_string())
    }
}

/// Upstream targeting search.
///
/// `params` are sent verbatim as query parameters, in order. Empty values
/// are skipped. The result is the raw `data` array of the response.
#[async_trait]
pub trait TargetingApi: Send + Sync {
    async fn search(&self, params: &[(&str, String)]) -> Result<Vec<Value>, UpstreamError>;
}

/// [`TargetingApi`] backed by `reqwest`.
pub struct GraphApi {
    client: reqwest::Client,
    search_url: String,
    access_token: Option<String>,
}

impl GraphApi {
    pub fn new(config: &UpstreamConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let search_url = format!(
            "{}/{}/search",
            config.base_url.trim_end_matches('/'),
            config.api_version.trim_matches('/')
        );
        Ok(Self {
            client,
            search_url,
            access_token: config.access_token.clone(),
        })
    }

    pub fn has_credential(&self) -> bool {
        self.access_token.is_some()
    }
}

#[async_trait]
impl TargetingApi for GraphApi {
    async fn search(&self, params: &[(&str, String)]) -> Result<Vec<Value>, UpstreamError> {
        let token = self
            .access_token
            .as_deref()
            .ok_or(UpstreamError::MissingCredential)?;

        let mut query: Vec<(&str, &str)> = params
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| (*k, v.as_str()))
            .collect();
        query.push(("access_token", token));

        let response = self.client.get(&self.search_url).query(&query).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        parse_search_body(&body)
    }
}

/// Extract the `data` array from a search response body.
pub fn parse_search_body(body: &str) -> Result<Vec<Value>, UpstreamError> {
    let json: Value =
        serde_json::from_str(body).map_err(|e| UpstreamError::Malformed(e.to_string()))?;
    match json.get("data") {
        Some(Value::Array(items)) => Ok(items.clone()),
        Some(Value::Null) | None => Ok(Vec::new()),
        Some(_) => Err(UpstreamError::Malformed("data is not an array".to_string())),
    }
}

/// The Graph API's `error.message`, or the raw body when it has none.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| {
            json.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_body() {
        let items = parse_search_body(r#"{"data":[{"id":"1"},{"id":"2"}]}"#).unwrap();
        assert_eq!(items.len(), 2);
        assert!(parse_search_body(r#"{"paging":{}}"#).unwrap().is_empty());
        assert!(matches!(
            parse_search_body("<html>"),
            Err(UpstreamError::Malformed(_))
        ));
        assert!(matches!(
            parse_search_body(r#"{"data":"nope"}"#),
            Err(UpstreamError::Malformed(_))
        ));
    }

    #[test]
    fn test_error_message_prefers_graph_error() {
        let body = r#"{"error":{"message":"Invalid OAuth access token.","code":190}}"#;
        assert_eq!(error_message(body), "Invalid OAuth access token.");
        assert_eq!(error_message(" Bad Gateway \n"), "Bad Gateway");
    }

    #[test]
    fn test_search_url() {
        let config = UpstreamConfig {
            base_url: "http://127.0.0.1:9/".to_string(),
            api_version: "v20.0".to_string(),
            ..UpstreamConfig::default()
        };
        let api = GraphApi::new(&config).unwrap();
        assert_eq!(api.search_url, "http://127.0.0.1:9/v20.0/search");
        assert!(!api.has_credential());
    }

    #[tokio::test]
    async fn test_missing_credential_short_circuits() {
        let api = GraphApi::new(&UpstreamConfig::default()).unwrap();
        let err = api
            .search(&[("type", "adinterest".to_string())])
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::MissingCredential));
        assert_eq!(err.to_string(), "Missing META_ACCESS_TOKEN on server");
    }

    #[tokio::test]
    async fn test_transport_error_hides_token() {
        let config = UpstreamConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            timeout_secs: 2,
            access_token: Some("SECRET-TOKEN".to_string()),
            ..UpstreamConfig::default()
        };
        let api = GraphApi::new(&config).unwrap();
        let err = api.search(&[("q", "coffee".to_string())]).await.unwrap_err();
        assert_eq!(err.class(), "transport");
        assert!(!err.to_string().contains("SECRET-TOKEN"));
    }
}
