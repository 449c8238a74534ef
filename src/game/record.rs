use serde::{Deserialize, Serialize};

/// A creature record as returned by the info endpoint.
///
/// Only `id` and `name` drive the round; the rest is carried for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub names: Vec<LocalizedName>,
    #[serde(default)]
    pub genus: String,
    #[serde(default)]
    pub entries: Vec<String>,
    #[serde(default)]
    pub varieties: Vec<Variety>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain: Option<Chain>,
    #[serde(default)]
    pub missingno: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedName {
    pub name: String,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variety {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub default: bool,
    #[serde(default)]
    pub display: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chain {
    pub url: String,
}

impl Record {
    /// Minimal record with no metadata (tests, stub sources).
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Record {
            id,
            name: name.into(),
            names: Vec::new(),
            genus: String::new(),
            entries: Vec::new(),
            varieties: Vec::new(),
            chain: None,
            missingno: false,
        }
    }

    /// Display name for `language` (e.g. "ja", "fr"), falling back to `name`.
    pub fn localized_name(&self, language: &str) -> &str {
        self.names
            .iter()
            .find(|n| n.language.eq_ignore_ascii_case(language))
            .map(|n| n.name.as_str())
            .unwrap_or(&self.name)
    }

    pub fn default_variety(&self) -> Option<&Variety> {
        self.varieties.iter().find(|v| v.default)
    }
}
