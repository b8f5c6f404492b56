//! Core data models shared by the proxy, the controller, and the exports.
//!
//! [`TaxonomyItem`] is what every taxonomy endpoint returns and what the
//! selection set stores. [`ProxyResponse`] is the `ok` envelope used on the
//! wire by all proxy endpoints.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single targeting entity (interest, behavior, job title, …).
///
/// Identity is [`id`](TaxonomyItem::id): two items with the same id are the
/// same selectable entity even if their names differ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyItem {
    /// Opaque upstream identifier, unique within a taxonomy class.
    pub id: String,
    pub name: String,
    /// Reported reach, or `None` when the upstream platform withholds it.
    #[serde(default)]
    pub audience_size: Option<u64>,
    /// Interest topic (interests only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// Interest taxonomy path, root first (interests only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<String>>,
    /// Behavior description (behaviors only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TaxonomyItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>, audience_size: Option<u64>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            audience_size,
            topic: None,
            path: None,
            description: None,
        }
    }
}

/// The JSON envelope returned by every taxonomy proxy endpoint.
///
/// When `ok` is false, `data` is absent and callers must ignore it.
/// `not_available` marks a soft upstream failure that clients render as
/// "no results" rather than as an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<TaxonomyItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(
        default,
        rename = "notAvailable",
        skip_serializing_if = "Option::is_none"
    )]
    pub not_available: Option<bool>,
}

impl ProxyResponse {
    pub fn success(data: Vec<TaxonomyItem>) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
            not_available: None,
        }
    }

    /// `{ok:true, data:[]}`: the short-circuit answer for an empty query.
    pub fn empty() -> Self {
        Self::success(Vec::new())
    }

    /// Hard failure, used for request validation errors.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error.into()),
            not_available: None,
        }
    }

    /// Soft failure: the upstream could not answer.
    pub fn not_available(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error.into()),
            not_available: Some(true),
        }
    }

    /// Items a client should display: `data` on success, nothing otherwise.
    pub fn into_items(self) -> Vec<TaxonomyItem> {
        if self.ok {
            self.data.unwrap_or_default()
        } else {
            Vec::new()
        }
    }
}

/// The category tabs a user can search in. Categories are mutually
/// exclusive views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Interests,
    Behaviors,
    JobTitles,
    Employers,
    Education,
    Industry,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Interests,
        Category::Behaviors,
        Category::JobTitles,
        Category::Employers,
        Category::Education,
        Category::Industry,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Interests => "interests",
            Category::Behaviors => "behaviors",
            Category::JobTitles => "jobtitles",
            Category::Employers => "employers",
            Category::Education => "education",
            Category::Industry => "industry",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "interests" | "interest" => Ok(Category::Interests),
            "behaviors" | "behaviours" | "behavior" => Ok(Category::Behaviors),
            "jobtitles" | "jobs" | "job-titles" => Ok(Category::JobTitles),
            "employers" | "employer" => Ok(Category::Employers),
            "education" => Ok(Category::Education),
            "industry" | "industries" => Ok(Category::Industry),
            other => anyhow::bail!(
                "Unknown category: '{}'. Use interests, behaviors, jobtitles, employers, education, or industry.",
                other
            ),
        }
    }
}

/// Education sub-type: field of study or school.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EducationKind {
    #[default]
    Major,
    School,
}

impl EducationKind {
    /// The upstream targeting `type` for this sub-type.
    pub fn targeting_type(&self) -> &'static str {
        match self {
            EducationKind::Major => "adeducationmajor",
            EducationKind::School => "adeducationschool",
        }
    }
}

impl FromStr for EducationKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "major" | "adeducationmajor" => Ok(EducationKind::Major),
            "school" | "adeducationschool" => Ok(EducationKind::School),
            other => anyhow::bail!("Unknown education type: '{}'. Use major or school.", other),
        }
    }
}

/// Country code meaning "not scoped to a country".
pub const ALL_COUNTRIES: &str = "ALL";

/// Country filter choices offered to users, `(code, display name)`.
///
/// Any two-letter ISO code is accepted by the proxy; this list is what the
/// front end offers for display.
pub const COUNTRIES: &[(&str, &str)] = &[
    (ALL_COUNTRIES, "All Countries"),
    ("US", "United States"),
    ("GB", "United Kingdom"),
    ("IN", "India"),
    ("AE", "United Arab Emirates"),
    ("AU", "Australia"),
    ("CA", "Canada"),
    ("DE", "Germany"),
    ("FR", "France"),
    ("ES", "Spain"),
    ("IT", "Italy"),
    ("SG", "Singapore"),
    ("SA", "Saudi Arabia"),
];

/// Normalise a user-supplied country filter.
///
/// Returns the upper-cased code, or an error if it is neither `ALL` nor a
/// two-letter alphabetic code.
pub fn normalize_country(code: &str) -> anyhow::Result<String> {
    let upper = code.trim().to_ascii_uppercase();
    if upper == ALL_COUNTRIES
        || (upper.len() == 2 && upper.chars().all(|c| c.is_ascii_alphabetic()))
    {
        Ok(upper)
    } else {
        anyhow::bail!("invalid country code: '{}'", code)
    }
}

/// Regional-indicator flag for a country code (`"US"` → 🇺🇸).
///
/// Non-letters are ignored, so `ALL` yields the three letters' indicators
/// which terminals render as plain letters.
pub fn country_flag(code: &str) -> String {
    code.chars()
        .filter(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_uppercase())
        .filter_map(|c| char::from_u32(0x1F1E6 + (c as u32 - 'A' as u32)))
        .collect()
}
