//! Core logic: pure functions over identifiers, taxa and candidate pools

pub mod caption;
pub mod filename;
pub mod genus;
pub mod selector;

pub use caption::{compose, Caption};
pub use filename::parse;
pub use genus::{resolve, GenusTable};
pub use selector::{select, Selection};
