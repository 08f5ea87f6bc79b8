//! Configuration loading for dirscan.
//!
//! Scanner settings come from a TOML or JSON file, an inline JSON variable,
//! or defaults, with a handful of environment variables overriding single
//! fields. Both the `dirscanctl` binary and embedding applications read
//! through [`ScannerConfig`] so there is one source of truth for defaults and
//! validation rules.

/// Validation and loading errors
pub mod error;
/// Configuration models
pub mod models;
/// Small parsers for environment values
pub mod util;

pub use error::ConfigLoadError;
pub use models::{ScanMode, ScannerConfig, ScannerConfigSource};
