//! Core shared types and identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use uuid::Uuid;

use crate::errors::{SharedError, SharedResult};

/// Global run ID singleton - set once at startup
static RUN_ID: OnceLock<RunId> = OnceLock::new();

/// Identifier of one scheduled invocation of the bot
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Initialize the global run ID for this process
    pub fn init() -> &'static RunId {
        RUN_ID.get_or_init(RunId::new)
    }

    /// Get the global run ID, initializing it on first use
    pub fn current() -> &'static RunId {
        Self::init()
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form keeps log lines readable
        let full = self.0.simple().to_string();
        write!(f, "run_{}", &full[..8])
    }
}

/// Opaque identifier of a candidate image (its file name inside the library)
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(String);

impl ImageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ImageId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ImageId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for ImageId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Taxon key derived from an image's base file name
///
/// `genus_code` is always exactly two characters; `species_slug` is the part of the
/// base name after the first underscore.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaxonKey {
    pub genus_code: String,
    pub species_slug: String,
}

impl TaxonKey {
    pub fn new(genus_code: impl Into<String>, species_slug: impl Into<String>) -> Self {
        Self {
            genus_code: genus_code.into(),
            species_slug: species_slug.into(),
        }
    }

    /// Species epithet as it should be written in a binomial name
    pub fn species_epithet(&self) -> String {
        self.species_slug.replace('_', " ")
    }
}

impl fmt::Display for TaxonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.genus_code, self.species_slug)
    }
}

/// Caption language variants published on every run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    English,
    French,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::English, Language::French];

    /// ISO 639-1 code
    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::French => "fr",
        }
    }

    pub fn from_code(s: &str) -> SharedResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" => Ok(Language::English),
            "fr" | "french" | "français" | "francais" => Ok(Language::French),
            other => Err(SharedError::InvalidConfig {
                field: "language".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Language {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::from_code(s)
    }
}
