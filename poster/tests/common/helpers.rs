//! Test helpers and builder patterns for poster tests

use std::collections::HashSet;

use poster::services::FileLedger;
use poster::traits::{
    MockCandidateSource, MockImageEncoder, MockNotifier, MockPublisher, MockTaxonRegistry,
};
use poster::types::EncodedImage;
use poster::{Bot, GenusTable, Ledger, PosterError, PublishReceipt, RunConfig};
use shared::{ImageId, RunId};
use tempfile::TempDir;

use super::fixtures::TestFixtures;

/// Bot wired with mocks and a real ledger file
pub type TestBot = Bot<
    MockCandidateSource,
    FileLedger,
    MockTaxonRegistry,
    MockImageEncoder,
    MockPublisher,
    MockNotifier,
>;

/// Builder creating test bots with sensible defaults
///
/// Defaults: the standard four-image pool, a registry and encoder that always
/// succeed, a publisher that accepts every post, and a notifier that must not be
/// called.
pub struct BotBuilder {
    temp: TempDir,
    config: RunConfig,
    genus_table: GenusTable,
    library: MockCandidateSource,
    registry: MockTaxonRegistry,
    encoder: MockImageEncoder,
    publisher: MockPublisher,
    notifier: MockNotifier,
    ledger_lines: Vec<String>,
    seed: u64,
}

impl BotBuilder {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let config = TestFixtures::config(temp.path());

        Self {
            temp,
            config,
            genus_table: TestFixtures::genus_table(),
            library: Self::library_mock(TestFixtures::pool()),
            registry: Self::registry_mock(),
            encoder: Self::encoder_mock(),
            publisher: TestHelpers::accepting_publisher(),
            notifier: MockNotifier::new(),
            ledger_lines: Vec::new(),
            seed: 7,
        }
    }

    fn library_mock(pool: Vec<ImageId>) -> MockCandidateSource {
        let mut library = MockCandidateSource::new();
        library
            .expect_list_candidates()
            .returning(move || Ok(pool.clone()))
            .times(0..);
        library
            .expect_read_image()
            .returning(|_| Ok(TestFixtures::image_bytes()))
            .times(0..);
        library
    }

    fn registry_mock() -> MockTaxonRegistry {
        let mut registry = MockTaxonRegistry::new();
        registry
            .expect_lookup()
            .returning(|genus, species| Ok(TestFixtures::record_for(genus, species)))
            .times(0..);
        registry
    }

    fn encoder_mock() -> MockImageEncoder {
        let mut encoder = MockImageEncoder::new();
        encoder
            .expect_fit()
            .returning(|bytes, _| Ok(EncodedImage::original(bytes, "image/jpeg")))
            .times(0..);
        encoder
    }

    /// Replace the candidate pool
    pub fn with_pool(mut self, names: &[&str]) -> Self {
        let pool = names.iter().map(|n| ImageId::from(*n)).collect();
        self.library = Self::library_mock(pool);
        self
    }

    /// Pre-populate the ledger file
    pub fn with_ledger(mut self, lines: &[&str]) -> Self {
        self.ledger_lines = lines.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.config.recent_window = window;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn dry_run(mut self) -> Self {
        self.config.dry_run = true;
        self
    }

    /// Configure the registry mock with a setup function (replaces the default)
    pub fn with_registry<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(&mut MockTaxonRegistry),
    {
        self.registry = MockTaxonRegistry::new();
        setup(&mut self.registry);
        self
    }

    /// Configure the publisher mock with a setup function (replaces the default)
    pub fn with_publisher<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(&mut MockPublisher),
    {
        self.publisher = MockPublisher::new();
        setup(&mut self.publisher);
        self
    }

    /// Configure the encoder mock with a setup function (replaces the default)
    pub fn with_encoder<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(&mut MockImageEncoder),
    {
        self.encoder = MockImageEncoder::new();
        setup(&mut self.encoder);
        self
    }

    /// Configure the notifier mock with a setup function
    pub fn with_notifier<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(&mut MockNotifier),
    {
        setup(&mut self.notifier);
        self
    }

    /// Build the bot; the temp dir must outlive it
    pub fn build(self) -> (TestBot, TempDir) {
        if !self.ledger_lines.is_empty() {
            let mut content = self.ledger_lines.join("\n");
            content.push('\n');
            std::fs::write(&self.config.ledger_path, content).unwrap();
        }

        let ledger = FileLedger::new(self.config.ledger_path.clone());
        let bot = Bot::new(
            *RunId::current(),
            self.config,
            self.genus_table,
            self.library,
            ledger,
            self.registry,
            self.encoder,
            self.publisher,
            self.notifier,
        )
        .with_seed(self.seed);
        (bot, self.temp)
    }
}

/// Helper functions for common test operations
pub struct TestHelpers;

impl TestHelpers {
    /// Publisher that accepts every post and numbers the statuses by language
    pub fn accepting_publisher() -> MockPublisher {
        let mut publisher = MockPublisher::new();
        publisher
            .expect_publish()
            .returning(|post| Ok(Self::receipt(post.language)))
            .times(0..);
        publisher
    }

    pub fn receipt(language: shared::Language) -> PublishReceipt {
        PublishReceipt {
            language,
            status_id: format!("status-{language}"),
            url: Some(format!("https://example.social/@plates/status-{language}")),
        }
    }

    pub fn publish_error(language: shared::Language) -> PosterError {
        PosterError::Publish {
            language,
            message: "HTTP 503".to_string(),
        }
    }

    /// Ledger entries currently on disk, in order
    pub async fn ledger_entries(bot: &TestBot) -> Vec<ImageId> {
        bot.ledger.entries().await.unwrap()
    }

    pub async fn recent(bot: &TestBot, n: usize) -> HashSet<ImageId> {
        bot.ledger.recent(n).await.unwrap()
    }
}
