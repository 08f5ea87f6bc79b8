//! Listing scanners.
//!
//! [`RecursiveScanner`] is the bounded-concurrency tree walk; [`FlatScanner`]
//! lists a single directory; [`MultiScanner`] merges several scanners.

mod flat;
mod multi;
mod recursive;
mod task;

pub use flat::FlatScanner;
pub use multi::MultiScanner;
pub use recursive::RecursiveScanner;
