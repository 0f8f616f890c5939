//! # Error Handling
//!
//! Error types for the envkeep configuration core using `thiserror`.

mod types;

pub use types::{EnvkeepError, Result};
