//! Publish orchestrator
//!
//! One call to [`Bot::run`] is one scheduled run:
//! select -> parse -> resolve -> enrich -> encode -> compose -> publish -> commit.
//! Publishing and the ledger append form a two-phase commit: the candidate is only
//! recorded once every language variant has been published.

use std::path::Path;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use shared::{logging, run_debug, run_info, run_warn, ImageId, RunId};

use crate::config::RunConfig;
use crate::core::{self, GenusTable, Selection};
use crate::error::PosterError;
use crate::services::ledger;
use crate::traits::{
    CandidateSource, ImageEncoder, Ledger, Notifier, Publisher, TaxonRegistry,
};
use crate::types::{
    FailureReport, Post, PreparedPost, PublishReceipt, RunFailure, RunOutcome, RunStage,
};

/// Result of one run
pub type RunResult = Result<RunOutcome, RunFailure>;

/// Outcome of the preparation phase
enum Preparation {
    Ready(PreparedPost),
    Exhausted { pool_size: usize, excluded: usize },
}

/// Scheduled poster with dependency injection
pub struct Bot<C, L, R, E, P, N>
where
    C: CandidateSource,
    L: Ledger,
    R: TaxonRegistry,
    E: ImageEncoder,
    P: Publisher,
    N: Notifier,
{
    /// Must be the process run id (`RunId::init()`); services log under the global one
    pub run_id: RunId,
    pub config: RunConfig,
    pub genus_table: GenusTable,
    pub library: C,
    pub ledger: L,
    pub registry: R,
    pub encoder: E,
    pub publisher: P,
    pub notifier: N,
    rng: StdRng,
}

impl<C, L, R, E, P, N> Bot<C, L, R, E, P, N>
where
    C: CandidateSource,
    L: Ledger,
    R: TaxonRegistry,
    E: ImageEncoder,
    P: Publisher,
    N: Notifier,
{
    /// Create a bot whose selection draws from a process-seeded generator
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        run_id: RunId,
        config: RunConfig,
        genus_table: GenusTable,
        library: C,
        ledger: L,
        registry: R,
        encoder: E,
        publisher: P,
        notifier: N,
    ) -> Self {
        Self {
            run_id,
            config,
            genus_table,
            library,
            ledger,
            registry,
            encoder,
            publisher,
            notifier,
            rng: StdRng::from_entropy(),
        }
    }

    /// Use a fixed seed for reproducible selection
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Run once and notify the operator when the run fails
    pub async fn run_and_report(&mut self) -> RunResult {
        let result = self.run().await;
        if let Err(failure) = &result {
            self.report(failure).await;
        }
        result
    }

    /// Run the whole pipeline once
    pub async fn run(&mut self) -> RunResult {
        let prepared = match self.prepare().await? {
            Preparation::Ready(prepared) => prepared,
            Preparation::Exhausted {
                pool_size,
                excluded,
            } => {
                run_warn!(
                    self.run_id,
                    "⚠️ No eligible candidates: {} in pool, {} recently posted",
                    pool_size,
                    excluded
                );
                return Ok(RunOutcome::Exhausted {
                    pool_size,
                    excluded,
                });
            }
        };

        if self.config.dry_run {
            run_info!(
                self.run_id,
                "🧪 Dry run: would publish {} in {} language(s)",
                prepared.image_id,
                prepared.posts.len()
            );
            return Ok(RunOutcome::DryRun(Box::new(prepared)));
        }

        // Phase 1: every variant must be published
        let receipts = self.publish_all(&prepared).await?;

        // Phase 2: commit
        self.ledger
            .append(&prepared.image_id)
            .await
            .map_err(|e| {
                RunFailure::new(RunStage::CommitLedger, Some(prepared.image_id.clone()), e)
            })?;

        logging::log_success(
            &self.run_id,
            &format!(
                "Published {} ({}) in {} language(s)",
                prepared.image_id,
                prepared.record.canonical_name,
                receipts.len()
            ),
        );
        Ok(RunOutcome::Published {
            image_id: prepared.image_id,
            receipts,
        })
    }

    async fn prepare(&mut self) -> Result<Preparation, RunFailure> {
        let pool = self
            .library
            .list_candidates()
            .await
            .map_err(|e| RunFailure::new(RunStage::LoadCandidates, None, e))?;
        let excluded = self
            .ledger
            .recent(self.config.recent_window)
            .await
            .map_err(|e| RunFailure::new(RunStage::ReadLedger, None, e))?;
        run_debug!(
            self.run_id,
            "Pool has {} candidates, {} excluded by the last {} posts",
            pool.len(),
            excluded.len(),
            self.config.recent_window
        );

        let image_id = match core::select(&pool, &excluded, &mut self.rng) {
            Selection::Picked(id) => id,
            Selection::Exhausted => {
                return Ok(Preparation::Exhausted {
                    pool_size: pool.len(),
                    excluded: excluded.len(),
                })
            }
        };
        logging::log_progress(&self.run_id, "Selected", image_id.as_str());

        let fail = |stage: RunStage, id: &ImageId| {
            let id = id.clone();
            move |e: PosterError| RunFailure::new(stage, Some(id), e)
        };

        // An image the ledger cannot record would be posted again every run
        ledger::validate_entry(&image_id).map_err(fail(RunStage::Parse, &image_id))?;

        let key = core::parse(&image_id).map_err(fail(RunStage::Parse, &image_id))?;
        let genus_name = self
            .genus_table
            .resolve(&key.genus_code)
            .map_err(fail(RunStage::Resolve, &image_id))?
            .to_string();

        let record = self
            .registry
            .lookup(&genus_name, &key.species_epithet())
            .await
            .map_err(fail(RunStage::Enrich, &image_id))?;
        logging::log_progress(
            &self.run_id,
            "Resolved",
            &format!("{} -> {} ({})", key, record.canonical_name, record.url),
        );

        let raw = self
            .library
            .read_image(&image_id)
            .await
            .map_err(fail(RunStage::Encode, &image_id))?;
        let original_len = raw.len();
        let image = self
            .encoder
            .fit(raw, self.config.max_image_bytes)
            .await
            .map_err(fail(RunStage::Encode, &image_id))?;
        run_debug!(
            self.run_id,
            "Image {} bytes -> {} bytes (quality {:?}, scale {}%)",
            original_len,
            image.len(),
            image.quality,
            image.scale_percent
        );

        let file_name = upload_file_name(&image_id, &image.mime);
        let image = Arc::new(image);
        let posts = self
            .config
            .languages
            .iter()
            .map(|language| {
                let caption = core::compose(&record, *language);
                Post {
                    run_id: self.run_id,
                    language: *language,
                    text: caption.text,
                    alt_text: caption.alt_text,
                    image: Arc::clone(&image),
                    file_name: file_name.clone(),
                }
            })
            .collect();

        Ok(Preparation::Ready(PreparedPost {
            image_id,
            key,
            genus_name,
            record,
            posts,
        }))
    }

    /// Publish variants in order, stopping at the first failure
    async fn publish_all(&self, prepared: &PreparedPost) -> Result<Vec<PublishReceipt>, RunFailure> {
        let mut receipts = Vec::with_capacity(prepared.posts.len());
        for post in &prepared.posts {
            match self.publisher.publish(post).await {
                Ok(receipt) => {
                    run_info!(
                        self.run_id,
                        "📣 Published {} variant as status {}",
                        receipt.language,
                        receipt.status_id
                    );
                    receipts.push(receipt);
                }
                Err(e) => {
                    if !receipts.is_empty() {
                        run_warn!(
                            self.run_id,
                            "⚠️ {} variant(s) already published before the failure; ledger left unchanged",
                            receipts.len()
                        );
                    }
                    return Err(RunFailure::new(
                        RunStage::Publish,
                        Some(prepared.image_id.clone()),
                        e,
                    ));
                }
            }
        }
        Ok(receipts)
    }

    async fn report(&self, failure: &RunFailure) {
        logging::log_error(&self.run_id, &format!("Stage {}", failure.stage), &failure.error);
        let report = FailureReport::from_failure(self.run_id, failure);
        if let Err(e) = self.notifier.notify(&report).await {
            logging::log_error(&self.run_id, "Operator notification", &e);
        }
    }
}

/// Upload file name matching the encoded format
pub fn upload_file_name(id: &ImageId, mime: &str) -> String {
    let name = Path::new(id.as_str())
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(id.as_str());
    if mime != "image/jpeg" {
        return name.to_string();
    }
    let path = Path::new(name);
    let is_jpeg = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"))
        .unwrap_or(false);
    if is_jpeg {
        return name.to_string();
    }
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(name);
    format!("{stem}.jpg")
}
