//! Shared helpers for unit tests.

mod builders;

pub use builders::*;
pub use sample::*;
