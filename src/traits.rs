//! Extension trait for window extraction backends.
//!
//! The retrieval pipeline never reads files directly; it asks an
//! [`Extractor`] for the trailing lines of a path that has already passed
//! validation and root containment. Two backends ship with the crate:
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │               Retriever                  │
//! │   validate → resolve → Extractor → ...   │
//! └──────────────┬───────────────────────────┘
//!                ▼
//!     ┌─────────────────┐  ┌─────────────────┐
//!     │ NativeExtractor │  │  TailExtractor  │
//!     │ reverse seek    │  │ argv `tail -n`  │
//!     └─────────────────┘  └─────────────────┘
//! ```
//!
//! Custom backends (remote agents, compressed archives) can be plugged in
//! with [`crate::retrieve::Retriever::with_extractor`].
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use log_window::error::Result;
//! use log_window::traits::Extractor;
//! use std::path::Path;
//!
//! pub struct FixedExtractor(Vec<u8>);
//!
//! #[async_trait]
//! impl Extractor for FixedExtractor {
//!     fn name(&self) -> &str { "fixed" }
//!
//!     async fn extract_tail(&self, _path: &Path, _window_lines: usize) -> Result<Vec<u8>> {
//!         Ok(self.0.clone())
//!     }
//! }
//! ```

use async_trait::async_trait;
use std::path::Path;
use tokio::sync::OwnedSemaphorePermit;

use crate::error::Result;

// ═══════════════════════════════════════════════════════════════════════
// Extractor Trait
// ═══════════════════════════════════════════════════════════════════════

/// A source of trailing log lines.
///
/// # Contract
///
/// - `path` has been validated and canonicalized by the caller.
/// - Returns at most `window_lines` trailing lines, in file order, with their
///   original terminators.
/// - An empty file is [`RetrievalError::EmptyWindow`](crate::error::RetrievalError::EmptyWindow);
///   missing or unreadable files are `NotFound` / `ReadFailure`.
/// - Must not block the async runtime; blocking I/O belongs in
///   `spawn_blocking` or a child process.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Backend identifier used in logs (e.g. `"native"`, `"tail"`).
    fn name(&self) -> &str;

    /// Return the last `window_lines` lines of `path`.
    async fn extract_tail(&self, path: &Path, window_lines: usize) -> Result<Vec<u8>>;

    /// Like [`extract_tail`](Extractor::extract_tail), holding a concurrency
    /// slot until the underlying work has really finished.
    ///
    /// The caller may give up on this future (on timeout). Backends whose
    /// work outlives the future, such as a read on the blocking pool, must
    /// override this and keep `permit` alive inside that work.
    async fn extract_tail_holding(
        &self,
        path: &Path,
        window_lines: usize,
        permit: OwnedSemaphorePermit,
    ) -> Result<Vec<u8>> {
        let _permit = permit;
        self.extract_tail(path, window_lines).await
    }
}
