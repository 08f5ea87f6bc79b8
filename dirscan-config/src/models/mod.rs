/// Scanner settings and their loader
pub mod scanner;

pub use scanner::{ScanMode, ScannerConfig, ScannerConfigSource};
