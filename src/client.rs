//! [`TaxonomyFetcher`] implementations used by the CLI.
//!
//! - [`HttpFetcher`] talks to a running proxy server (`--server URL`).
//! - [`LocalFetcher`] runs the proxy in-process against the Graph API.
//!
//! Both return the proxy's `ok` envelope; validation rejections come back
//! as `{ok:false, error}` just as the server's `400` body would.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use targeting_finder_core::controller::TaxonomyFetcher;
use targeting_finder_core::lead::LeadPayload;
use targeting_finder_core::models::ProxyResponse;
use targeting_finder_core::request::ProxyRequest;

use crate::config::Config;
use crate::graph::GraphApi;
use crate::proxy::{TaxonomyProxy, TaxonomyQuery};

/// The fetcher for a CLI command: HTTP to `server` when given, otherwise
/// an in-process proxy built from `config`.
pub fn make_fetcher(config: &Config, server: Option<&str>) -> Result<Arc<dyn TaxonomyFetcher>> {
    match server {
        Some(url) => {
            let timeout = Duration::from_secs(config.upstream.timeout_secs);
            Ok(Arc::new(HttpFetcher::new(url, timeout)?))
        }
        None => {
            let api = Arc::new(GraphApi::new(&config.upstream)?);
            let proxy = TaxonomyProxy::new(api, config.upstream.locale.clone());
            Ok(Arc::new(LocalFetcher::new(proxy)))
        }
    }
}

/// Fetches from a proxy server over HTTP.
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFetcher {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        reqwest::Url::parse(base_url).with_context(|| format!("Invalid server URL: {}", base_url))?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Submit a lead through the server's `/consult` endpoint.
    pub async fn submit_lead(&self, payload: &LeadPayload) -> Result<()> {
        let url = format!("{}/consult", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(payload)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", url))?;
        let status = response.status();
        let body: serde_json::Value = response
            .json()
            .await
            .with_context(|| "Invalid JSON from /consult")?;
        if status.is_success() && body["ok"].as_bool() == Some(true) {
            return Ok(());
        }
        let message = body["error"].as_str().unwrap_or("Submission failed");
        anyhow::bail!("{}", message)
    }
}

#[async_trait]
impl TaxonomyFetcher for HttpFetcher {
    async fn fetch(&self, request: &ProxyRequest) -> Result<ProxyResponse> {
        let url = format!("{}{}", self.base_url, request.relative_url());
        tracing::debug!(url = %url, "fetching");
        let response = self.client.get(&url).send().await?;
        let response: ProxyResponse = response
            .json()
            .await
            .with_context(|| format!("Invalid JSON from {}", request.endpoint.path()))?;
        Ok(response)
    }
}

/// Runs the proxy in-process.
pub struct LocalFetcher {
    proxy: TaxonomyProxy,
}

impl LocalFetcher {
    pub fn new(proxy: TaxonomyProxy) -> Self {
        Self { proxy }
    }
}

#[async_trait]
impl TaxonomyFetcher for LocalFetcher {
    async fn fetch(&self, request: &ProxyRequest) -> Result<ProxyResponse> {
        let query = TaxonomyQuery::from_request(request);
        Ok(match self.proxy.handle(request.endpoint, &query).await {
            Ok(response) => response,
            Err(rejected) => ProxyResponse::failure(rejected.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{TargetingApi, UpstreamError};
    use serde_json::{json, Value};
    use targeting_finder_core::models::Category;
    use targeting_finder_core::request::{build_request, SearchOptions};

    struct FixedApi;

    #[async_trait]
    impl TargetingApi for FixedApi {
        async fn search(&self, params: &[(&str, String)]) -> Result<Vec<Value>, UpstreamError> {
            let q = params
                .iter()
                .find(|(k, _)| *k == "q")
                .map(|(_, v)| v.clone())
                .unwrap_or_default();
            Ok(vec![json!({"id": "7", "name": q, "audience_size": 42})])
        }
    }

    #[tokio::test]
    async fn test_local_fetcher_round_trip() {
        let fetcher = LocalFetcher::new(TaxonomyProxy::new(Arc::new(FixedApi), "en_US"));
        let request = build_request(Category::JobTitles, "nurse", &SearchOptions::default(), 10);
        let response = fetcher.fetch(&request).await.unwrap();
        let items = response.into_items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "nurse");
        assert_eq!(items[0].audience_size, Some(42));
    }

    #[test]
    fn test_http_fetcher_rejects_bad_url() {
        assert!(HttpFetcher::new("not a url", Duration::from_secs(1)).is_err());
        assert!(HttpFetcher::new("http://127.0.0.1:3000/", Duration::from_secs(1)).is_ok());
    }
}
