//! Plate poster library
//!
//! Picks an image that was not posted recently, derives its taxon from the file
//! name, enriches it through a species-name registry and publishes bilingual posts.
//! The ledger of posted images is only appended once every post went out.

pub mod bot;
pub mod config;
pub mod core;
pub mod error;
pub mod services;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use bot::{Bot, RunResult};
pub use config::{Args, RunConfig, Secrets};
pub use core::{GenusTable, Selection};
pub use error::{PosterError, PosterResult};
pub use traits::{CandidateSource, ImageEncoder, Ledger, Notifier, Publisher, TaxonRegistry};
pub use types::{FailureReport, Post, PublishReceipt, RunFailure, RunOutcome, RunStage, TaxonRecord};
