//! Trait definitions with mockall annotations for testing
//!
//! Every collaborator of the bot sits behind one of these traits so a run can be
//! driven end to end against mocks.

use std::collections::HashSet;

use shared::ImageId;

use crate::error::PosterResult;
use crate::types::{EncodedImage, FailureReport, Post, PublishReceipt, TaxonRecord};

/// Source of the candidate pool and of image bytes
#[mockall::automock]
#[async_trait::async_trait]
pub trait CandidateSource: Send + Sync {
    /// List every candidate currently available
    async fn list_candidates(&self) -> PosterResult<Vec<ImageId>>;

    /// Read the raw bytes of a candidate
    async fn read_image(&self, id: &ImageId) -> PosterResult<Vec<u8>>;
}

/// Persisted history of posted images
#[mockall::automock]
#[async_trait::async_trait]
pub trait Ledger: Send + Sync {
    /// The last `n` entries (all of them if fewer exist)
    ///
    /// A ledger that does not exist yet is empty, not an error.
    async fn recent(&self, n: usize) -> PosterResult<HashSet<ImageId>>;

    /// Durably append one entry
    async fn append(&self, id: &ImageId) -> PosterResult<()>;
}

/// Species-name registry used to enrich a parsed taxon
#[mockall::automock]
#[async_trait::async_trait]
pub trait TaxonRegistry: Send + Sync {
    /// Look up the canonical name and reference URL of `genus species`
    async fn lookup(&self, genus: &str, species: &str) -> PosterResult<TaxonRecord>;
}

/// Image re-encode service
#[mockall::automock]
#[async_trait::async_trait]
pub trait ImageEncoder: Send + Sync {
    /// Fit an image under `max_bytes`, best effort when that is infeasible
    async fn fit(&self, bytes: Vec<u8>, max_bytes: usize) -> PosterResult<EncodedImage>;
}

/// Social network client
#[mockall::automock]
#[async_trait::async_trait]
pub trait Publisher: Send + Sync {
    /// Publish one language variant with its image
    async fn publish(&self, post: &Post) -> PosterResult<PublishReceipt>;
}

/// Operator notification channel
#[mockall::automock]
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, report: &FailureReport) -> PosterResult<()>;
}
