//! Mapping from a category tab to a concrete proxy request.
//!
//! Every [`Category`] maps to exactly one proxy [`Endpoint`] plus a fixed
//! discriminator parameter. The mapping is a single exhaustive `match`, so
//! adding a category without deciding its endpoint fails to compile.
//!
//! | Category | Endpoint | Discriminator |
//! |----------|----------|---------------|
//! | interests | `/interests` | `country` |
//! | behaviors | `/behaviors` | — |
//! | jobtitles | `/targeting` | `type=adworkposition` |
//! | employers | `/targeting` | `type=adworkemployer` |
//! | education | `/targeting` | `type=adeducationmajor` / `adeducationschool` |
//! | industry | `/categories` | `klass=industries` |

use serde::Serialize;
use std::fmt;

use crate::models::{Category, EducationKind, ALL_COUNTRIES};

/// Result count requested for the suggestion dropdown.
pub const SUGGEST_LIMIT: u32 = 8;
/// Result count for a committed search when the user has not chosen one.
pub const DEFAULT_LIMIT: u32 = 25;
pub const MIN_LIMIT: u32 = 1;
pub const MAX_LIMIT: u32 = 500;

/// Targeting types accepted by the generic `/targeting` endpoint.
pub const TARGETING_TYPES: [&str; 4] = [
    "adworkposition",
    "adworkemployer",
    "adeducationmajor",
    "adeducationschool",
];

/// Clamp a user-supplied limit into `[MIN_LIMIT, MAX_LIMIT]`.
///
/// Zero is treated as "unset" and falls back to [`DEFAULT_LIMIT`];
/// negative values clamp up to [`MIN_LIMIT`].
pub fn clamp_limit(raw: i64) -> u32 {
    if raw == 0 {
        return DEFAULT_LIMIT;
    }
    raw.clamp(MIN_LIMIT as i64, MAX_LIMIT as i64) as u32
}

/// The proxy endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Endpoint {
    Interests,
    Behaviors,
    Categories,
    Targeting,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Interests => "/interests",
            Endpoint::Behaviors => "/behaviors",
            Endpoint::Categories => "/categories",
            Endpoint::Targeting => "/targeting",
        }
    }
}

/// Sub-options that influence request building.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    /// Country filter for interests; `ALL` for unscoped.
    pub country: String,
    pub education: EducationKind,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            country: ALL_COUNTRIES.to_string(),
            education: EducationKind::default(),
        }
    }
}

/// A concrete request against one proxy endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyRequest {
    pub endpoint: Endpoint,
    /// Query parameters in emission order.
    pub params: Vec<(&'static str, String)>,
}

impl ProxyRequest {
    /// Look up a parameter by key.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// URL-encoded query string without the leading `?`.
    pub fn query_string(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.params.iter().map(|(k, v)| (*k, v.as_str())))
            .finish()
    }

    /// Path plus query, relative to the proxy root (e.g. `/behaviors?q=x&limit=8`).
    pub fn relative_url(&self) -> String {
        format!("{}?{}", self.endpoint.path(), self.query_string())
    }
}

impl fmt::Display for ProxyRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.relative_url())
    }
}

/// Build the proxy request for `category` with an already-clamped `limit`.
pub fn build_request(
    category: Category,
    query: &str,
    options: &SearchOptions,
    limit: u32,
) -> ProxyRequest {
    let q = ("q", query.to_string());
    let lim = ("limit", limit.to_string());
    let (endpoint, params) = match category {
        Category::Interests => (
            Endpoint::Interests,
            vec![q, lim, ("country", options.country.clone())],
        ),
        Category::Behaviors => (Endpoint::Behaviors, vec![q, lim]),
        Category::JobTitles => (
            Endpoint::Targeting,
            vec![("type", "adworkposition".to_string()), q, lim],
        ),
        Category::Employers => (
            Endpoint::Targeting,
            vec![("type", "adworkemployer".to_string()), q, lim],
        ),
        Category::Education => (
            Endpoint::Targeting,
            vec![
                ("type", options.education.targeting_type().to_string()),
                q,
                lim,
            ],
        ),
        Category::Industry => (
            Endpoint::Categories,
            vec![("klass", "industries".to_string()), q, lim],
        ),
    };
    ProxyRequest { endpoint, params }
}

/// Build the suggestion request for `category` (fixed [`SUGGEST_LIMIT`]).
pub fn build_suggest_request(
    category: Category,
    query: &str,
    options: &SearchOptions,
) -> ProxyRequest {
    build_request(category, query, options, SUGGEST_LIMIT)
}
