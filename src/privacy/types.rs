//! Classification types
//!
//! Wire and in-memory types for per-column privacy classifications and
//! the result of classifying a single record.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Privacy category of a single column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PiiCategory {
    /// Identifies a person on its own (email, name, phone)
    Direct,
    /// Identifies a person in combination with other data
    Indirect,
    /// Activity and usage patterns
    Behavioral,
    /// Health data, a special category under GDPR Article 9
    Health,
    /// Not personal data
    None,
}

impl PiiCategory {
    pub const ALL: [PiiCategory; 5] = [
        Self::Direct,
        Self::Indirect,
        Self::Behavioral,
        Self::Health,
        Self::None,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "DIRECT",
            Self::Indirect => "INDIRECT",
            Self::Behavioral => "BEHAVIORAL",
            Self::Health => "HEALTH",
            Self::None => "NONE",
        }
    }
}

impl std::fmt::Display for PiiCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PiiCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DIRECT" => Ok(Self::Direct),
            "INDIRECT" => Ok(Self::Indirect),
            "BEHAVIORAL" => Ok(Self::Behavioral),
            "HEALTH" => Ok(Self::Health),
            "NONE" => Ok(Self::None),
            other => Err(format!("unknown PII category: {}", other)),
        }
    }
}

/// Stored privacy classification of one `(schema, table, column)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldClassification {
    pub schema_name: String,
    pub table_name: String,
    pub column_name: String,
    pub pii_category: PiiCategory,
    /// Requires heightened legal treatment (health data)
    #[serde(default)]
    pub is_sensitive: bool,
    #[serde(default)]
    pub legal_basis_tag: Option<String>,
    #[serde(default)]
    pub purpose: Option<String>,
    #[serde(default)]
    pub retention_period: Option<String>,
}

impl FieldClassification {
    /// Build a classification with no compliance metadata
    pub fn new(
        schema_name: impl Into<String>,
        table_name: impl Into<String>,
        column_name: impl Into<String>,
        pii_category: PiiCategory,
        is_sensitive: bool,
    ) -> Self {
        Self {
            schema_name: schema_name.into(),
            table_name: table_name.into(),
            column_name: column_name.into(),
            pii_category,
            is_sensitive,
            legal_basis_tag: None,
            purpose: None,
            retention_period: None,
        }
    }

    /// Cache key: `"table.column"`
    pub fn lookup_key(&self) -> String {
        lookup_key(&self.table_name, &self.column_name)
    }

    pub fn is_pii(&self) -> bool {
        self.pii_category != PiiCategory::None
    }
}

/// Cache key for a table/field pair
pub fn lookup_key(table_name: &str, field_name: &str) -> String {
    format!("{}.{}", table_name, field_name)
}

/// Whether the classification data behind a result could be trusted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    /// Loaded within the TTL window
    Fresh,
    /// Last reload failed; serving an older classification set
    Stale,
    /// Never loaded; every field reads as not PII
    Unavailable,
}

/// PII found in a single record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    /// Record fields classified as anything other than NONE
    pub fields: Vec<String>,
    /// Category of each entry in `fields`
    pub categories: HashMap<String, PiiCategory>,
    pub has_sensitive_data: bool,
    /// Fields whose classification is marked sensitive
    pub sensitive_fields: Vec<String>,
    pub availability: Availability,
}

impl ClassificationResult {
    pub fn empty(availability: Availability) -> Self {
        Self {
            fields: Vec::new(),
            categories: HashMap::new(),
            has_sensitive_data: false,
            sensitive_fields: Vec::new(),
            availability,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
