//! Genus lookup table and taxon resolution
//!
//! The table is a small curated two-column file (`code`, `name`) loaded whole at
//! startup and read-only afterwards.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{PosterError, PosterResult};

use super::filename::GENUS_CODE_LEN;

/// Fixed mapping from two-character genus code to genus name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenusTable {
    entries: HashMap<String, String>,
}

impl GenusTable {
    /// Build a table from already validated pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Load the table file in one read
    pub async fn load(path: &Path) -> PosterResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| PosterError::GenusTable {
                path: path.to_path_buf(),
                line: 0,
                reason: e.to_string(),
            })?;
        Self::parse(&content, path)
    }

    /// Parse table text; `origin` is only used in error messages
    ///
    /// Accepted separators are tab, comma and semicolon. Blank lines, `#` comments
    /// and a `code,name` header are skipped. Any other defect fails the whole load.
    pub fn parse(content: &str, origin: &Path) -> PosterResult<Self> {
        let mut entries = HashMap::new();

        for (idx, raw) in content.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let fail = |reason: String| PosterError::GenusTable {
                path: PathBuf::from(origin),
                line: line_no,
                reason,
            };

            let (code, name) = line
                .split_once(|c| c == '\t' || c == ',' || c == ';')
                .ok_or_else(|| fail("expected two columns".to_string()))?;
            let code = code.trim();
            let name = name.trim();

            if entries.is_empty() && code.eq_ignore_ascii_case("code") {
                continue;
            }
            if code.chars().count() != GENUS_CODE_LEN {
                return Err(fail(format!(
                    "genus code '{code}' must be {GENUS_CODE_LEN} characters"
                )));
            }
            if name.is_empty() {
                return Err(fail(format!("genus code '{code}' has no name")));
            }
            if entries.insert(code.to_string(), name.to_string()).is_some() {
                return Err(fail(format!("duplicate genus code '{code}'")));
            }
        }

        Ok(Self { entries })
    }

    /// Exact-match lookup of a genus code
    pub fn resolve(&self, genus_code: &str) -> PosterResult<&str> {
        self.entries
            .get(genus_code)
            .map(String::as_str)
            .ok_or_else(|| PosterError::UnknownGenus {
                code: genus_code.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Map a genus code to its canonical genus name
pub fn resolve<'a>(genus_code: &str, table: &'a GenusTable) -> PosterResult<&'a str> {
    table.resolve(genus_code)
}
