//! GBIF species-name registry client
//!
//! Uses the name matching endpoint (`/v1/species/match`) to turn a parsed
//! `genus species` pair into a canonical name and a species page URL.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use shared::{run_debug, RunId};

use crate::error::{PosterError, PosterResult};
use crate::traits::TaxonRegistry;
use crate::types::TaxonRecord;

pub const DEFAULT_GBIF_API: &str = "https://api.gbif.org/";
pub const GBIF_SPECIES_PAGE: &str = "https://www.gbif.org/species/";

/// Subset of the GBIF match response we rely on
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeciesMatch {
    pub usage_key: Option<u64>,
    pub canonical_name: Option<String>,
    pub scientific_name: Option<String>,
    pub rank: Option<String>,
    pub match_type: String,
    #[serde(default)]
    pub confidence: Option<u32>,
}

impl SpeciesMatch {
    /// Accept exact and fuzzy matches; anything coarser means the species is unknown
    pub fn into_record(self, query: &str) -> PosterResult<TaxonRecord> {
        let not_found = |message: String| PosterError::Enrichment {
            query: query.to_string(),
            message,
        };

        match self.match_type.as_str() {
            "EXACT" | "FUZZY" => {}
            other => return Err(not_found(format!("no species match (matchType {other})"))),
        }

        let usage_key = self
            .usage_key
            .ok_or_else(|| not_found("match has no usageKey".to_string()))?;
        let canonical_name = self
            .canonical_name
            .or(self.scientific_name)
            .ok_or_else(|| not_found("match has no name".to_string()))?;

        Ok(TaxonRecord {
            canonical_name,
            url: format!("{GBIF_SPECIES_PAGE}{usage_key}"),
        })
    }
}

/// Registry client backed by the public GBIF API
pub struct GbifRegistry {
    client: reqwest::Client,
    base_url: Url,
}

impl GbifRegistry {
    pub fn new(base_url: Url, timeout: Duration) -> PosterResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("plate-poster/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, base_url })
    }

    fn match_url(&self, name: &str) -> PosterResult<Url> {
        let mut url = self
            .base_url
            .join("v1/species/match")
            .map_err(|e| PosterError::config("registry_url", e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("name", name)
            .append_pair("strict", "true");
        Ok(url)
    }
}

#[async_trait]
impl TaxonRegistry for GbifRegistry {
    async fn lookup(&self, genus: &str, species: &str) -> PosterResult<TaxonRecord> {
        let query = format!("{genus} {species}");
        let url = self.match_url(&query)?;

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PosterError::Enrichment {
                query,
                message: format!("registry answered HTTP {status}"),
            });
        }

        let matched: SpeciesMatch = response.json().await?;
        run_debug!(
            RunId::current(),
            "🔎 Registry match for '{}': {:?} ({:?}, confidence {:?})",
            query,
            matched.canonical_name,
            matched.rank,
            matched.confidence
        );
        matched.into_record(&query)
    }
}
