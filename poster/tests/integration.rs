//! End-to-end run tests
//!
//! Every collaborator except the ledger is a mockall mock; the ledger is a real
//! file so commit and no-commit behaviour is observed on disk.

use poster::{PosterError, RunOutcome, RunStage};
use shared::{ImageId, Language};

mod common;
use common::{BotBuilder, TestFixtures, TestHelpers};

#[tokio::test]
async fn test_successful_run_publishes_both_languages_and_commits() {
    // Arrange
    let (mut bot, _temp) = BotBuilder::new().with_pool(&[TestFixtures::GAMBIAE]).build();

    // Act
    let outcome = bot.run_and_report().await.unwrap();

    // Assert
    match outcome {
        RunOutcome::Published { image_id, receipts } => {
            assert_eq!(image_id, ImageId::from(TestFixtures::GAMBIAE));
            let languages: Vec<Language> = receipts.iter().map(|r| r.language).collect();
            assert_eq!(languages, vec![Language::English, Language::French]);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(
        TestHelpers::ledger_entries(&bot).await,
        vec![ImageId::from(TestFixtures::GAMBIAE)]
    );
}

#[tokio::test]
async fn test_posts_carry_resolved_taxon() {
    let (mut bot, _temp) = BotBuilder::new()
        .with_pool(&[TestFixtures::GAMBIAE])
        .with_publisher(|publisher| {
            publisher
                .expect_publish()
                .withf(|post| {
                    post.text.starts_with("Anopheles gambiae")
                        && post.alt_text.contains("Anopheles gambiae")
                        && post.file_name == "An_gambiae.jpg"
                })
                .times(2)
                .returning(|post| Ok(TestHelpers::receipt(post.language)));
        })
        .build();

    assert!(matches!(
        bot.run().await.unwrap(),
        RunOutcome::Published { .. }
    ));
}

#[tokio::test]
async fn test_recent_window_excludes_last_entries() {
    // Ledger [A, B, C], window 2 -> B and C excluded; pool {A, B, C, D}
    for seed in 0..20 {
        let (mut bot, _temp) = BotBuilder::new()
            .with_ledger(&[TestFixtures::GAMBIAE, TestFixtures::AEGYPTI, TestFixtures::ALBOPICTUS])
            .with_window(2)
            .with_seed(seed)
            .build();

        let outcome = bot.run().await.unwrap();
        let RunOutcome::Published { image_id, .. } = outcome else {
            panic!("expected a published run");
        };
        assert!(
            image_id == ImageId::from(TestFixtures::GAMBIAE)
                || image_id == ImageId::from(TestFixtures::PIPIENS),
            "seed {seed} picked {image_id}"
        );

        // Appended as the most recent entry, earlier entries untouched
        let entries = TestHelpers::ledger_entries(&bot).await;
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[..3], [
            ImageId::from(TestFixtures::GAMBIAE),
            ImageId::from(TestFixtures::AEGYPTI),
            ImageId::from(TestFixtures::ALBOPICTUS),
        ]);
        assert_eq!(entries[3], image_id);
        assert!(TestHelpers::recent(&bot, 1).await.contains(&image_id));
    }
}

#[tokio::test]
async fn test_empty_pool_is_exhausted_without_side_effects() {
    let (mut bot, _temp) = BotBuilder::new()
        .with_pool(&[])
        .with_publisher(|publisher| {
            publisher.expect_publish().times(0);
        })
        .build();

    let outcome = bot.run_and_report().await.unwrap();

    assert_eq!(outcome, RunOutcome::Exhausted { pool_size: 0, excluded: 0 });
    assert!(!bot.ledger.path().exists());
}

#[tokio::test]
async fn test_fully_excluded_pool_is_exhausted() {
    let (mut bot, _temp) = BotBuilder::new()
        .with_pool(&[TestFixtures::GAMBIAE, TestFixtures::AEGYPTI])
        .with_ledger(&[TestFixtures::GAMBIAE, TestFixtures::AEGYPTI])
        .with_window(5)
        .build();

    let outcome = bot.run().await.unwrap();

    assert_eq!(outcome, RunOutcome::Exhausted { pool_size: 2, excluded: 2 });
    assert_eq!(TestHelpers::ledger_entries(&bot).await.len(), 2);
}

#[tokio::test]
async fn test_corrupt_ledger_line_is_skipped() {
    let (mut bot, _temp) = BotBuilder::new()
        .with_pool(&[TestFixtures::GAMBIAE, TestFixtures::AEGYPTI])
        .with_window(5)
        .build();
    let mut raw = format!("{}\n", TestFixtures::GAMBIAE).into_bytes();
    raw.extend_from_slice(&[0xc3, 0x28, b'\n']);
    std::fs::write(bot.ledger.path(), raw).unwrap();

    let outcome = bot.run().await.unwrap();

    assert!(matches!(
        outcome,
        RunOutcome::Published { ref image_id, .. } if *image_id == ImageId::from(TestFixtures::AEGYPTI)
    ));
}

#[tokio::test]
async fn test_partial_publish_failure_does_not_commit() {
    let (mut bot, _temp) = BotBuilder::new()
        .with_pool(&[TestFixtures::PIPIENS])
        .with_publisher(|publisher| {
            publisher.expect_publish().times(2).returning(|post| {
                if post.language == Language::French {
                    Err(TestHelpers::publish_error(post.language))
                } else {
                    Ok(TestHelpers::receipt(post.language))
                }
            });
        })
        .with_notifier(|notifier| {
            notifier
                .expect_notify()
                .withf(|report| report.stage == RunStage::Publish && !report.data_defect)
                .times(1)
                .returning(|_| Ok(()));
        })
        .build();

    let failure = bot.run_and_report().await.unwrap_err();

    assert_eq!(failure.stage, RunStage::Publish);
    assert_eq!(failure.image_id, Some(ImageId::from(TestFixtures::PIPIENS)));
    assert!(matches!(failure.error, PosterError::Publish { language: Language::French, .. }));
    assert!(TestHelpers::ledger_entries(&bot).await.is_empty());
}

#[tokio::test]
async fn test_first_publish_failure_stops_remaining_variants() {
    let (mut bot, _temp) = BotBuilder::new()
        .with_publisher(|publisher| {
            publisher
                .expect_publish()
                .times(1)
                .returning(|post| Err(TestHelpers::publish_error(post.language)));
        })
        .build();

    let failure = bot.run().await.unwrap_err();

    assert_eq!(failure.stage, RunStage::Publish);
    assert!(TestHelpers::ledger_entries(&bot).await.is_empty());
}

#[tokio::test]
async fn test_unknown_genus_is_fatal_and_reported() {
    let (mut bot, _temp) = BotBuilder::new()
        .with_pool(&["Zz_mysterius.jpg"])
        .with_registry(|registry| {
            registry.expect_lookup().times(0);
        })
        .with_publisher(|publisher| {
            publisher.expect_publish().times(0);
        })
        .with_notifier(|notifier| {
            notifier
                .expect_notify()
                .withf(|report| {
                    report.stage == RunStage::Resolve
                        && report.data_defect
                        && report.message.contains("Zz")
                })
                .times(1)
                .returning(|_| Ok(()));
        })
        .build();

    let failure = bot.run_and_report().await.unwrap_err();

    assert_eq!(failure.stage, RunStage::Resolve);
    assert!(matches!(failure.error, PosterError::UnknownGenus { ref code } if code == "Zz"));
    assert!(!bot.ledger.path().exists());
}

#[tokio::test]
async fn test_filename_without_species_fails_at_parse() {
    let (mut bot, _temp) = BotBuilder::new()
        .with_pool(&["Anopheles.jpg"])
        .with_registry(|registry| {
            registry.expect_lookup().times(0);
        })
        .build();

    let failure = bot.run().await.unwrap_err();

    assert_eq!(failure.stage, RunStage::Parse);
    assert!(failure.is_data_defect());
}

#[tokio::test]
async fn test_unrecordable_name_is_never_published() {
    let name = "An_gambiae\u{7}.jpg";

    // Two consecutive runs against the same pool must both stop before publishing
    for _ in 0..2 {
        let (mut bot, _temp) = BotBuilder::new()
            .with_pool(&[name])
            .with_registry(|registry| {
                registry.expect_lookup().times(0);
            })
            .with_publisher(|publisher| {
                publisher.expect_publish().times(0);
            })
            .with_notifier(|notifier| {
                notifier
                    .expect_notify()
                    .withf(|report| report.stage == RunStage::Parse && report.data_defect)
                    .times(1)
                    .returning(|_| Ok(()));
            })
            .build();

        let failure = bot.run_and_report().await.unwrap_err();

        assert_eq!(failure.stage, RunStage::Parse);
        assert!(matches!(failure.error, PosterError::InvalidLedgerEntry { .. }));
        assert!(TestHelpers::ledger_entries(&bot).await.is_empty());
    }
}

#[tokio::test]
async fn test_posts_carry_the_bot_run_id() {
    let run_id = *shared::RunId::current();
    let (mut bot, _temp) = BotBuilder::new()
        .with_pool(&[TestFixtures::PIPIENS])
        .with_publisher(move |publisher| {
            publisher
                .expect_publish()
                .withf(move |post| post.run_id == run_id)
                .times(2)
                .returning(|post| Ok(TestHelpers::receipt(post.language)));
        })
        .build();

    assert_eq!(bot.run_id, run_id);
    assert!(matches!(bot.run().await.unwrap(), RunOutcome::Published { .. }));
}

#[tokio::test]
async fn test_registry_miss_fails_at_enrich() {
    let (mut bot, _temp) = BotBuilder::new()
        .with_pool(&[TestFixtures::AEGYPTI])
        .with_registry(|registry| {
            registry
                .expect_lookup()
                .withf(|genus, species| genus == "Aedes" && species == "aegypti")
                .times(1)
                .returning(|genus, species| {
                    Err(PosterError::Enrichment {
                        query: format!("{genus} {species}"),
                        message: "no species match".to_string(),
                    })
                });
        })
        .with_publisher(|publisher| {
            publisher.expect_publish().times(0);
        })
        .build();

    let failure = bot.run().await.unwrap_err();

    assert_eq!(failure.stage, RunStage::Enrich);
    assert!(!failure.is_data_defect());
    assert!(TestHelpers::ledger_entries(&bot).await.is_empty());
}

#[tokio::test]
async fn test_encoder_failure_fails_at_encode() {
    let (mut bot, _temp) = BotBuilder::new()
        .with_encoder(|encoder| {
            encoder
                .expect_fit()
                .withf(|_, max| *max == TestFixtures::MAX_IMAGE_BYTES)
                .returning(|_, _| {
                    Err(PosterError::Encode {
                        message: "magick exited with 1".to_string(),
                    })
                });
        })
        .build();

    let failure = bot.run().await.unwrap_err();
    assert_eq!(failure.stage, RunStage::Encode);
}

#[tokio::test]
async fn test_dry_run_prepares_without_publishing() {
    let (mut bot, _temp) = BotBuilder::new()
        .with_pool(&[TestFixtures::ALBOPICTUS])
        .dry_run()
        .with_publisher(|publisher| {
            publisher.expect_publish().times(0);
        })
        .build();

    let outcome = bot.run().await.unwrap();

    let RunOutcome::DryRun(prepared) = outcome else {
        panic!("expected a dry run");
    };
    assert_eq!(prepared.genus_name, "Aedes");
    assert_eq!(prepared.key.species_slug, "albopictus");
    assert_eq!(prepared.posts.len(), 2);
    assert_eq!(prepared.posts[1].language, Language::French);
    // Same encoded image shared by both variants
    assert!(std::sync::Arc::ptr_eq(&prepared.posts[0].image, &prepared.posts[1].image));
    assert!(!bot.ledger.path().exists());
}

#[tokio::test]
async fn test_notifier_failure_keeps_original_failure() {
    let (mut bot, _temp) = BotBuilder::new()
        .with_pool(&["Xx_unknown.jpg"])
        .with_notifier(|notifier| {
            notifier.expect_notify().times(1).returning(|_| {
                Err(PosterError::Notify {
                    message: "webhook down".to_string(),
                })
            });
        })
        .build();

    let failure = bot.run_and_report().await.unwrap_err();
    assert_eq!(failure.stage, RunStage::Resolve);
}

#[tokio::test]
async fn test_ledger_commit_failure_is_reported_after_publishing() {
    use poster::traits::{MockCandidateSource, MockImageEncoder, MockLedger, MockNotifier, MockTaxonRegistry};
    use poster::types::EncodedImage;
    use poster::Bot;
    use shared::RunId;
    use std::collections::HashSet;

    let temp = tempfile::TempDir::new().unwrap();
    let config = TestFixtures::config(temp.path());

    let mut library = MockCandidateSource::new();
    library
        .expect_list_candidates()
        .returning(|| Ok(vec![ImageId::from(TestFixtures::GAMBIAE)]));
    library
        .expect_read_image()
        .returning(|_| Ok(TestFixtures::image_bytes()));

    let mut ledger = MockLedger::new();
    ledger
        .expect_recent()
        .withf(|n| *n == TestFixtures::DEFAULT_WINDOW)
        .returning(|_| Ok(HashSet::new()));
    ledger.expect_append().times(1).returning(|id| {
        Err(PosterError::Ledger {
            operation: "append".to_string(),
            path: format!("/readonly/{id}").into(),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        })
    });

    let mut registry = MockTaxonRegistry::new();
    registry
        .expect_lookup()
        .returning(|genus, species| Ok(TestFixtures::record_for(genus, species)));
    let mut encoder = MockImageEncoder::new();
    encoder
        .expect_fit()
        .returning(|bytes, _| Ok(EncodedImage::original(bytes, "image/jpeg")));
    let mut notifier = MockNotifier::new();
    notifier
        .expect_notify()
        .withf(|report| report.stage == RunStage::CommitLedger)
        .times(1)
        .returning(|_| Ok(()));

    let mut bot = Bot::new(
        *RunId::current(),
        config,
        TestFixtures::genus_table(),
        library,
        ledger,
        registry,
        encoder,
        TestHelpers::accepting_publisher(),
        notifier,
    );

    let failure = bot.run_and_report().await.unwrap_err();
    assert_eq!(failure.stage, RunStage::CommitLedger);
}
