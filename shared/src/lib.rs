//! Shared types for the plate poster
//!
//! Identifiers, value types and logging helpers used by the poster library,
//! its binary and its tests.

pub mod errors;
pub mod logging;
pub mod types;

pub use errors::*;
pub use types::*;
