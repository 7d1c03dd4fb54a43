//! Test fixtures and data for poster tests

use std::path::Path;
use std::time::Duration;

use poster::{GenusTable, RunConfig, TaxonRecord};
use shared::{ImageId, Language};
use url::Url;

/// Standard test data and fixtures
pub struct TestFixtures;

impl TestFixtures {
    pub const GAMBIAE: &'static str = "An_gambiae.jpg";
    pub const AEGYPTI: &'static str = "Ae_aegypti.jpg";
    pub const ALBOPICTUS: &'static str = "Ae_albopictus.png";
    pub const PIPIENS: &'static str = "Cx_pipiens.jpg";

    /// Standard configuration values
    pub const DEFAULT_WINDOW: usize = 2;
    pub const MAX_IMAGE_BYTES: usize = 1024;

    /// Genus table covering every fixture image
    pub fn genus_table() -> GenusTable {
        GenusTable::from_pairs([("An", "Anopheles"), ("Ae", "Aedes"), ("Cx", "Culex")])
    }

    /// The four plates of the standard library
    pub fn pool() -> Vec<ImageId> {
        [Self::GAMBIAE, Self::AEGYPTI, Self::ALBOPICTUS, Self::PIPIENS]
            .into_iter()
            .map(ImageId::from)
            .collect()
    }

    /// Registry answer for a genus/species pair
    pub fn record_for(genus: &str, species: &str) -> TaxonRecord {
        TaxonRecord {
            canonical_name: format!("{genus} {species}"),
            url: format!("https://www.gbif.org/species/{}", genus.len() * 1000 + species.len()),
        }
    }

    /// Small JPEG-looking payload
    pub fn image_bytes() -> Vec<u8> {
        vec![0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10]
    }

    /// Run configuration pointing its paths into `dir`
    pub fn config(dir: &Path) -> RunConfig {
        RunConfig {
            pool_dir: dir.join("plates"),
            ledger_path: dir.join("posted.txt"),
            genus_table_path: dir.join("genera.csv"),
            recent_window: Self::DEFAULT_WINDOW,
            max_image_bytes: Self::MAX_IMAGE_BYTES,
            languages: vec![Language::English, Language::French],
            registry_url: Url::parse("https://api.gbif.org/").unwrap(),
            social_url: Url::parse("https://example.social/").unwrap(),
            magick_program: "magick".to_string(),
            http_timeout: Duration::from_secs(5),
            dry_run: false,
        }
    }
}
