//! Poster-specific types

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shared::{ImageId, Language, RunId, TaxonKey};
use thiserror::Error;

use crate::error::PosterError;

/// Canonical taxon identity returned by the species-name registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonRecord {
    pub canonical_name: String,
    pub url: String,
}

/// Image bytes ready for upload plus the parameters used to produce them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub mime: String,
    /// JPEG quality used, `None` when the original was kept
    pub quality: Option<u8>,
    pub scale_percent: u8,
}

impl EncodedImage {
    pub fn original(bytes: Vec<u8>, mime: impl Into<String>) -> Self {
        Self {
            bytes,
            mime: mime.into(),
            quality: None,
            scale_percent: 100,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// One language variant of the run's post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    /// Run that composed the post; keys the status idempotency header
    pub run_id: RunId,
    pub language: Language,
    pub text: String,
    pub alt_text: String,
    pub image: Arc<EncodedImage>,
    /// File name sent with the media upload
    pub file_name: String,
}

/// Confirmation of a published status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishReceipt {
    pub language: Language,
    pub status_id: String,
    pub url: Option<String>,
}

/// Stages of a run, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStage {
    LoadCandidates,
    ReadLedger,
    Parse,
    Resolve,
    Enrich,
    Encode,
    Publish,
    CommitLedger,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunStage::LoadCandidates => "load_candidates",
            RunStage::ReadLedger => "read_ledger",
            RunStage::Parse => "parse",
            RunStage::Resolve => "resolve",
            RunStage::Enrich => "enrich",
            RunStage::Encode => "encode",
            RunStage::Publish => "publish",
            RunStage::CommitLedger => "commit_ledger",
        };
        f.write_str(name)
    }
}

/// Everything derived for the selected candidate before publishing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedPost {
    pub image_id: ImageId,
    pub key: TaxonKey,
    pub genus_name: String,
    pub record: TaxonRecord,
    pub posts: Vec<Post>,
}

/// Successful (or cleanly aborted) run results
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every language variant was published and the ledger was appended
    Published {
        image_id: ImageId,
        receipts: Vec<PublishReceipt>,
    },
    /// Nothing eligible remained; no side effects happened
    Exhausted { pool_size: usize, excluded: usize },
    /// Prepared but not published, ledger untouched
    DryRun(Box<PreparedPost>),
}

/// A run that failed at a given stage; the ledger was not appended
#[derive(Debug, Error)]
#[error("run failed at stage {stage}: {error}")]
pub struct RunFailure {
    pub stage: RunStage,
    pub image_id: Option<ImageId>,
    #[source]
    pub error: PosterError,
}

impl RunFailure {
    pub fn new(stage: RunStage, image_id: Option<ImageId>, error: PosterError) -> Self {
        Self {
            stage,
            image_id,
            error,
        }
    }

    /// Failures caused by catalog data rather than a transient collaborator problem
    pub fn is_data_defect(&self) -> bool {
        matches!(
            self.error,
            PosterError::MalformedIdentifier { .. }
                | PosterError::UnknownGenus { .. }
                | PosterError::InvalidLedgerEntry { .. }
        )
    }
}

/// Report sent to the operator when a run fails
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReport {
    pub run_id: RunId,
    pub stage: RunStage,
    pub image_id: Option<ImageId>,
    pub message: String,
    pub data_defect: bool,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl FailureReport {
    pub fn from_failure(run_id: RunId, failure: &RunFailure) -> Self {
        Self {
            run_id,
            stage: failure.stage,
            image_id: failure.image_id.clone(),
            message: failure.error.to_string(),
            data_defect: failure.is_data_defect(),
            timestamp: chrono::Utc::now(),
        }
    }
}
