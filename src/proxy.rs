//! Taxonomy proxy: request validation, upstream dispatch and reshaping.
//!
//! [`TaxonomyProxy::handle`] is the transport-independent core of the four
//! taxonomy endpoints. The axum handlers in [`crate::server`] and the
//! in-process [`crate::client::LocalFetcher`] both go through it, so the
//! HTTP server and the CLI behave identically.
//!
//! Failure tiers:
//!
//! - Discriminator validation (`klass`, `type`) fails with a
//!   [`RequestError`], which the server turns into `400`.
//! - An empty query answers `{ok:true, data:[]}` without calling upstream.
//! - Any upstream failure becomes a soft `{ok:false, notAvailable:true}`.

use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use targeting_finder_core::models::{ProxyResponse, TaxonomyItem, ALL_COUNTRIES};
use targeting_finder_core::request::{
    Endpoint, ProxyRequest, MAX_LIMIT, MIN_LIMIT, TARGETING_TYPES,
};

use crate::graph::{TargetingApi, UpstreamError};

/// Query parameters accepted by the taxonomy endpoints. Unused ones are
/// ignored per endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaxonomyQuery {
    pub q: Option<String>,
    pub limit: Option<String>,
    pub country: Option<String>,
    pub klass: Option<String>,
    /// `class` is accepted for `klass`; `klass` wins when both are sent.
    pub class: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl TaxonomyQuery {
    /// Rebuild the query from a client-side [`ProxyRequest`].
    pub fn from_request(request: &ProxyRequest) -> Self {
        let get = |key: &str| request.param(key).map(str::to_string);
        Self {
            q: get("q"),
            limit: get("limit"),
            country: get("country"),
            klass: get("klass"),
            class: get("class"),
            kind: get("type"),
        }
    }

    fn query(&self) -> &str {
        self.q.as_deref().map(str::trim).unwrap_or_default()
    }

    fn klass(&self) -> Option<&str> {
        [self.klass.as_deref(), self.class.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|k| !k.is_empty())
    }
}

/// A request rejected before any upstream call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("Missing klass (e.g., industries)")]
    MissingKlass,
    #[error("Unsupported type")]
    UnsupportedType,
}

fn default_limit(endpoint: Endpoint) -> u32 {
    match endpoint {
        Endpoint::Interests => 25,
        Endpoint::Behaviors => 200,
        Endpoint::Categories => 50,
        Endpoint::Targeting => 25,
    }
}

/// Parse a `limit` parameter and clamp it into `[MIN_LIMIT, MAX_LIMIT]`.
///
/// Missing, zero, or non-numeric values use the endpoint default.
pub fn parse_limit(raw: Option<&str>, default: u32) -> u32 {
    match raw.map(str::trim).and_then(|s| s.parse::<i64>().ok()) {
        Some(0) | None => default,
        Some(n) => n.clamp(MIN_LIMIT as i64, MAX_LIMIT as i64) as u32,
    }
}

/// Pick the best available reach figure.
///
/// Order: exact, lower bound, upper bound (each with its legacy name).
/// Zero and non-numeric values count as absent.
pub fn audience_size(raw: &Value) -> Option<u64> {
    const KEYS: [&str; 5] = [
        "audience_size",
        "audience_size_lower_bound",
        "audience_size_lower",
        "audience_size_upper_bound",
        "audience_size_upper",
    ];
    KEYS.iter()
        .filter_map(|key| raw.get(*key).and_then(positive_count))
        .next()
}

fn positive_count(value: &Value) -> Option<u64> {
    let n = match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f.max(0.0) as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }?;
    (n > 0).then_some(n)
}

fn item_id(raw: &Value) -> Option<String> {
    match raw.get("id")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn string_field(raw: &Value, key: &str) -> Option<String> {
    raw.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Reshape one upstream record for `endpoint`. Records without an id are dropped.
pub fn reshape(endpoint: Endpoint, raw: &Value) -> Option<TaxonomyItem> {
    let id = item_id(raw)?;
    let name = string_field(raw, "name").unwrap_or_default();
    let mut item = TaxonomyItem::new(id, name, audience_size(raw));
    match endpoint {
        Endpoint::Interests => {
            item.topic = string_field(raw, "topic");
            item.path = raw.get("path").and_then(Value::as_array).map(|parts| {
                parts
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            });
        }
        Endpoint::Behaviors => {
            item.description = string_field(raw, "description");
        }
        Endpoint::Categories | Endpoint::Targeting => {}
    }
    Some(item)
}

/// The taxonomy proxy. Stateless per request.
#[derive(Clone)]
pub struct TaxonomyProxy {
    api: Arc<dyn TargetingApi>,
    locale: String,
}

impl TaxonomyProxy {
    pub fn new(api: Arc<dyn TargetingApi>, locale: impl Into<String>) -> Self {
        Self {
            api,
            locale: locale.into(),
        }
    }

    /// Answer one taxonomy request.
    pub async fn handle(
        &self,
        endpoint: Endpoint,
        query: &TaxonomyQuery,
    ) -> Result<ProxyResponse, RequestError> {
        let params = self.upstream_params(endpoint, query)?;

        if query.query().is_empty() {
            return Ok(ProxyResponse::empty());
        }

        let scoped = params.iter().any(|(k, _)| *k == "country");
        let mut outcome = self.api.search(&params).await;
        if scoped {
            if let Err(err) = &outcome {
                tracing::warn!(
                    endpoint = endpoint.path(),
                    class = err.class(),
                    "country-scoped search failed, retrying once"
                );
                outcome = self.api.search(&params).await;
            }
        }

        Ok(match outcome {
            Ok(records) => {
                let items: Vec<TaxonomyItem> = records
                    .iter()
                    .filter_map(|raw| reshape(endpoint, raw))
                    .collect();
                tracing::debug!(endpoint = endpoint.path(), count = items.len(), "search ok");
                ProxyResponse::success(items)
            }
            Err(err) => not_available(endpoint, err),
        })
    }

    /// Validate discriminators and build the upstream parameter list.
    fn upstream_params(
        &self,
        endpoint: Endpoint,
        query: &TaxonomyQuery,
    ) -> Result<Vec<(&'static str, String)>, RequestError> {
        let q = query.query().to_string();
        let limit = parse_limit(query.limit.as_deref(), default_limit(endpoint)).to_string();

        let params = match endpoint {
            Endpoint::Interests => {
                let mut params = vec![
                    ("type", "adinterest".to_string()),
                    ("q", q),
                    ("limit", limit),
                    ("locale", self.locale.clone()),
                ];
                let country = query
                    .country
                    .as_deref()
                    .map(|c| c.trim().to_ascii_uppercase())
                    .unwrap_or_default();
                if !country.is_empty() && country != ALL_COUNTRIES {
                    params.push(("country", country));
                }
                params
            }
            Endpoint::Behaviors => vec![
                ("type", "adtargetingcategory".to_string()),
                ("class", "behaviors".to_string()),
                ("q", q),
                ("limit", limit),
            ],
            Endpoint::Categories => {
                let klass = query.klass().ok_or(RequestError::MissingKlass)?;
                vec![
                    ("type", "adtargetingcategory".to_string()),
                    ("class", klass.to_string()),
                    ("q", q),
                    ("limit", limit),
                ]
            }
            Endpoint::Targeting => {
                let kind = query
                    .kind
                    .as_deref()
                    .filter(|t| TARGETING_TYPES.contains(t))
                    .ok_or(RequestError::UnsupportedType)?;
                vec![
                    ("type", kind.to_string()),
                    ("q", q),
                    ("limit", limit),
                    ("locale", self.locale.clone()),
                ]
            }
        };
        Ok(params)
    }
}

fn not_available(endpoint: Endpoint, err: UpstreamError) -> ProxyResponse {
    tracing::warn!(
        endpoint = endpoint.path(),
        class = err.class(),
        error = %err,
        "upstream search failed"
    );
    ProxyResponse::not_available(err.to_string())
}
