//! Run configuration
//!
//! Paths and tunables come from the command line; secrets come from the environment
//! (a `.env` file in the current or a parent directory is loaded first). The
//! resulting [`RunConfig`] and [`Secrets`] are passed explicitly to every component.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use url::Url;

use shared::Language;

use crate::error::{PosterError, PosterResult};
use crate::services::registry::DEFAULT_GBIF_API;

pub const DEFAULT_RECENT_WINDOW: usize = 30;
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 8_000_000;

/// Environment variable holding the access token for a language's account
pub fn token_var(language: Language) -> String {
    format!("POSTER_TOKEN_{}", language.code().to_uppercase())
}

pub const WEBHOOK_VAR: &str = "POSTER_WEBHOOK_URL";

/// Post one plate from the image library to the social network
#[derive(Parser, Debug, Clone)]
#[command(name = "poster")]
#[command(about = "Posts a not-recently-posted plate with bilingual captions")]
pub struct Args {
    /// Directory holding the candidate images
    #[arg(long)]
    pub pool_dir: PathBuf,

    /// Ledger of already posted images (one file name per line)
    #[arg(long, default_value = "posted.txt")]
    pub ledger: PathBuf,

    /// Two-column genus table (code, name)
    #[arg(long)]
    pub genus_table: PathBuf,

    /// Number of most recent ledger entries excluded from selection
    #[arg(long, default_value_t = DEFAULT_RECENT_WINDOW)]
    pub recent_window: usize,

    /// Upload size ceiling in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_IMAGE_BYTES)]
    pub max_image_bytes: usize,

    /// Caption languages, one post per language
    #[arg(long, value_delimiter = ',', default_value = "en,fr")]
    pub languages: Vec<Language>,

    /// Species registry base URL
    #[arg(long, default_value = DEFAULT_GBIF_API)]
    pub registry_url: Url,

    /// Social instance base URL
    #[arg(long)]
    pub social_url: Url,

    /// ImageMagick executable used for re-encoding
    #[arg(long, default_value = crate::services::encoder::DEFAULT_MAGICK_PROGRAM)]
    pub magick: String,

    /// HTTP timeout in seconds
    #[arg(long, default_value = "30")]
    pub http_timeout_secs: u64,

    /// Prepare everything but publish nothing and leave the ledger alone
    #[arg(long)]
    pub dry_run: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// Explicit configuration of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub pool_dir: PathBuf,
    pub ledger_path: PathBuf,
    pub genus_table_path: PathBuf,
    pub recent_window: usize,
    pub max_image_bytes: usize,
    pub languages: Vec<Language>,
    pub registry_url: Url,
    pub social_url: Url,
    pub magick_program: String,
    pub http_timeout: Duration,
    pub dry_run: bool,
}

impl RunConfig {
    pub fn from_args(args: &Args) -> PosterResult<Self> {
        let mut languages = Vec::new();
        for language in &args.languages {
            if !languages.contains(language) {
                languages.push(*language);
            }
        }
        if languages.is_empty() {
            return Err(PosterError::config("languages", "at least one language is required"));
        }
        if args.max_image_bytes == 0 {
            return Err(PosterError::config("max_image_bytes", "must be positive"));
        }

        Ok(Self {
            pool_dir: args.pool_dir.clone(),
            ledger_path: args.ledger.clone(),
            genus_table_path: args.genus_table.clone(),
            recent_window: args.recent_window,
            max_image_bytes: args.max_image_bytes,
            languages,
            registry_url: with_trailing_slash(args.registry_url.clone()),
            social_url: with_trailing_slash(args.social_url.clone()),
            magick_program: args.magick.clone(),
            http_timeout: Duration::from_secs(args.http_timeout_secs),
            dry_run: args.dry_run,
        })
    }
}

/// `Url::join` drops the last path segment unless the base ends with a slash
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Credentials read from the environment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Secrets {
    pub tokens: HashMap<Language, String>,
    pub webhook_url: Option<Url>,
}

impl Secrets {
    /// Load `.env` if present, then read the variables for `languages`
    pub fn from_env(languages: &[Language]) -> PosterResult<Self> {
        // Silently ignored when there is no .env file
        let _ = dotenv::dotenv();
        Self::from_lookup(languages, |name| std::env::var(name).ok())
    }

    /// Read secrets through an arbitrary variable lookup
    pub fn from_lookup<F>(languages: &[Language], lookup: F) -> PosterResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let tokens = languages
            .iter()
            .filter_map(|language| {
                lookup(&token_var(*language))
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
                    .map(|v| (*language, v))
            })
            .collect();

        let webhook_url = match lookup(WEBHOOK_VAR).filter(|v| !v.trim().is_empty()) {
            Some(raw) => Some(
                Url::parse(raw.trim()).map_err(|e| PosterError::config(WEBHOOK_VAR, e.to_string()))?,
            ),
            None => None,
        };

        Ok(Self {
            tokens,
            webhook_url,
        })
    }

    /// Every language must have a token unless nothing will be published
    pub fn validate(&self, config: &RunConfig) -> PosterResult<()> {
        if config.dry_run {
            return Ok(());
        }
        let missing: Vec<String> = config
            .languages
            .iter()
            .filter(|language| !self.tokens.contains_key(*language))
            .map(|language| token_var(*language))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(PosterError::config(
                "tokens",
                format!("missing {}", missing.join(", ")),
            ))
        }
    }
}
