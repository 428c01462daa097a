//! The external audio engine collaborator.
//!
//! The server core only needs two capabilities: probe a file's duration and
//! extract a re-encoded excerpt for a millisecond range. Both sit behind a
//! trait so the decode/encode machinery stays swappable.

mod symphonia;

pub use self::symphonia::SymphoniaEngine;

use std::path::Path;

use async_trait::async_trait;

#[async_trait]
pub trait AudioEngine: Send + Sync {
    /// Total duration of the file at `path`, in seconds.
    async fn probe(&self, path: &Path) -> anyhow::Result<f64>;

    /// Excerpt covering `[start_ms, end_ms)` of the file at `path`,
    /// re-encoded and returned as one in-memory byte buffer.
    async fn extract(&self, path: &Path, start_ms: u64, end_ms: u64) -> anyhow::Result<Vec<u8>>;
}
