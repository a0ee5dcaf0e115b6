//! Shared types

pub mod error;

pub use error::{ErrorKind, NowhereError, Result};
