//! Service implementations
//!
//! Real implementations of the collaborator traits. These are the ones that touch
//! the file system, spawn processes or talk HTTP.

pub mod encoder;
pub mod image_library;
pub mod ledger;
pub mod notifier;
pub mod registry;
pub mod social;

pub use encoder::MagickEncoder;
pub use image_library::DirectoryLibrary;
pub use ledger::FileLedger;
pub use notifier::{LogNotifier, OperatorNotifier, WebhookNotifier};
pub use registry::GbifRegistry;
pub use social::MastodonPublisher;
