//! Common test utilities and infrastructure
//!
//! Shared fixtures and a builder that wires mocks and a real on-disk ledger into a
//! bot.

#![allow(dead_code)]

pub mod fixtures;
pub mod helpers;

// Re-export commonly used items for convenience
pub use fixtures::TestFixtures;
pub use helpers::{BotBuilder, TestBot, TestHelpers};
