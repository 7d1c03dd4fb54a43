//! Main entry point for the poster binary
//!
//! Wires the real service implementations into the bot and runs it once. Meant to
//! be invoked by an external scheduler (cron, systemd timer), one run at a time.

use std::process::ExitCode;

use clap::Parser;

use poster::services::{
    DirectoryLibrary, FileLedger, GbifRegistry, MagickEncoder, MastodonPublisher, OperatorNotifier,
};
use poster::{Args, Bot, GenusTable, PosterResult, RunConfig, RunOutcome, Secrets};
use shared::{logging, run_info, run_warn, RunId};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    let run_id = *RunId::init();
    logging::init_tracing_with_level(Some(&args.log_level));
    logging::log_startup(&run_id, "plate poster run");

    match run(run_id, &args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            logging::log_error(&run_id, "Startup", &e);
            ExitCode::from(2)
        }
    }
}

/// Returns whether the run succeeded; `Err` means it could not even start
async fn run(run_id: RunId, args: &Args) -> PosterResult<bool> {
    let config = RunConfig::from_args(args)?;
    let secrets = Secrets::from_env(&config.languages)?;
    secrets.validate(&config)?;

    let genus_table = GenusTable::load(&config.genus_table_path).await?;
    logging::log_progress(
        &run_id,
        "Loaded genus table",
        &format!("{} codes", genus_table.len()),
    );

    let library = DirectoryLibrary::new(config.pool_dir.clone());
    let ledger = FileLedger::new(config.ledger_path.clone());
    let registry = GbifRegistry::new(config.registry_url.clone(), config.http_timeout)?;
    let encoder = MagickEncoder::with_program(config.magick_program.clone());
    let publisher = MastodonPublisher::new(
        config.social_url.clone(),
        secrets.tokens.clone(),
        config.http_timeout,
    )?;
    let notifier = OperatorNotifier::from_webhook(secrets.webhook_url.clone(), config.http_timeout)?;

    let mut bot = Bot::new(
        run_id, config, genus_table, library, ledger, registry, encoder, publisher, notifier,
    );

    match bot.run_and_report().await {
        Ok(RunOutcome::Published { image_id, receipts }) => {
            for receipt in &receipts {
                run_info!(
                    run_id,
                    "🔗 {}: {}",
                    receipt.language,
                    receipt.url.as_deref().unwrap_or(&receipt.status_id)
                );
            }
            logging::log_success(&run_id, &format!("Run complete, posted {image_id}"));
            Ok(true)
        }
        Ok(RunOutcome::DryRun(prepared)) => {
            for post in &prepared.posts {
                run_info!(run_id, "🧪 [{}] {}\n   alt: {}", post.language, post.text, post.alt_text);
            }
            Ok(true)
        }
        Ok(RunOutcome::Exhausted { .. }) => {
            run_warn!(run_id, "⚠️ Nothing to post this run");
            Ok(true)
        }
        // Already logged and reported by the bot
        Err(_) => Ok(false),
    }
}
