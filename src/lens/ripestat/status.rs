//! Status vocabulary for RIPEstat responses.
//!
//! RIPEstat reports several free-form status strings: the top-level call
//! status, the data call maturity (`data_call_status`), message severities,
//! and RPKI validity states. All of them are normalized here by their first
//! whitespace-delimited word, case-insensitively.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};

/// Normalized status tag
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StatusTag {
    Error,
    Info,
    Warning,
    Ok,
    Supported,
    Deprecated,
    Maintenance,
    Development,
    Valid,
    Invalid,
    InvalidAsn,
    #[default]
    Unknown,
    /// A word outside the known vocabulary, lower-cased
    Other(String),
}

/// Known vocabulary, keyed by the lower-cased first word.
///
/// New statuses only need a row here.
const VOCABULARY: &[(&str, StatusTag)] = &[
    ("error", StatusTag::Error),
    ("info", StatusTag::Info),
    ("warning", StatusTag::Warning),
    ("ok", StatusTag::Ok),
    ("supported", StatusTag::Supported),
    ("deprecated", StatusTag::Deprecated),
    ("maintenance", StatusTag::Maintenance),
    ("development", StatusTag::Development),
    ("valid", StatusTag::Valid),
    ("invalid", StatusTag::Invalid),
    ("invalid_asn", StatusTag::InvalidAsn),
    ("unknown", StatusTag::Unknown),
];

impl StatusTag {
    /// Normalize a declared status string.
    ///
    /// Only the first word is considered, so `"supported - connect to ..."`
    /// becomes [`StatusTag::Supported`]. Unrecognized words pass through as
    /// [`StatusTag::Other`]. An empty string yields `Other("")`.
    pub fn normalize(s: &str) -> StatusTag {
        let word = s
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_lowercase();

        VOCABULARY
            .iter()
            .find(|(name, _)| *name == word)
            .map(|(_, tag)| tag.clone())
            .unwrap_or(StatusTag::Other(word))
    }

    /// The tag as a lower-case string
    pub fn as_str(&self) -> &str {
        match self {
            StatusTag::Other(word) => word.as_str(),
            tag => VOCABULARY
                .iter()
                .find(|(_, known)| known == tag)
                .map(|(name, _)| *name)
                .unwrap_or("unknown"),
        }
    }
}

impl Display for StatusTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for StatusTag {
    fn from(value: &str) -> Self {
        StatusTag::normalize(value)
    }
}

impl Serialize for StatusTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for StatusTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(StatusTag::normalize(&s))
    }
}
