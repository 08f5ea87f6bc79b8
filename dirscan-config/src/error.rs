use dirscan_core::ScanError;
use thiserror::Error;

/// Rejected configuration values.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    /// `workers = 0`.
    #[error("workers must be at least 1")]
    InvalidWorkers,
    /// `buffer = 0`.
    #[error("buffer must be at least 1")]
    InvalidBuffer,
    /// The name pattern does not compile.
    #[error("invalid name pattern '{pattern}'")]
    InvalidPattern {
        /// Pattern as written.
        pattern: String,
        /// Compile error from the scanner.
        #[source]
        source: ScanError,
    },
    /// An override variable could not be parsed.
    #[error("invalid value '{value}' for {key}")]
    InvalidEnvValue {
        /// Variable name.
        key: &'static str,
        /// Raw value.
        value: String,
    },
}
