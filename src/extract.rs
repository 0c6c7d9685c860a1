//! Bounded tail extraction.
//!
//! [`extract_tail`] reads a file backwards in [`CHUNK_SIZE`] steps until it
//! has seen enough line breaks, so memory use follows the size of the window
//! rather than the size of the file. [`TailExtractor`] delegates the same job
//! to an external `tail` binary invoked with an argument vector; no shell is
//! involved and the path is passed after `--`.

use async_trait::async_trait;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::OwnedSemaphorePermit;

use crate::config::{Config, ExtractorKind};
use crate::error::{Result, RetrievalError};
use crate::traits::Extractor;

/// Bytes read per backwards step.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Return the last `window_lines` lines of `path`.
///
/// A final line without a trailing newline counts as a line. Asking for more
/// lines than the file holds returns the whole file.
pub fn extract_tail(path: &Path, window_lines: usize) -> Result<Vec<u8>> {
    let window = read_tail(path, window_lines)
        .map_err(|e| RetrievalError::from_io(path.to_path_buf(), window_lines, e))?;

    if window.is_empty() {
        return Err(RetrievalError::EmptyWindow {
            path: path.to_path_buf(),
        });
    }
    Ok(window)
}

fn read_tail(path: &Path, window_lines: usize) -> std::io::Result<Vec<u8>> {
    let mut file = File::open(path)?;
    let metadata = file.metadata()?;
    if metadata.is_dir() {
        return Err(std::io::Error::other("path is a directory"));
    }

    let len = metadata.len();
    if len == 0 || window_lines == 0 {
        return Ok(Vec::new());
    }

    // Chunks are collected back to front and stitched together at the end.
    let mut chunks: Vec<Vec<u8>> = Vec::new();
    let mut pos = len;
    let mut newlines = 0usize;
    let mut at_last_byte = true;

    while pos > 0 {
        let step = (CHUNK_SIZE as u64).min(pos);
        pos -= step;
        file.seek(SeekFrom::Start(pos))?;
        let mut chunk = vec![0u8; step as usize];
        file.read_exact(&mut chunk)?;

        let mut cut = None;
        for i in (0..chunk.len()).rev() {
            if at_last_byte {
                at_last_byte = false;
                // The file's own trailing newline terminates the last line.
                if chunk[i] == b'\n' {
                    continue;
                }
            }
            if chunk[i] == b'\n' {
                newlines += 1;
                if newlines == window_lines {
                    cut = Some(i + 1);
                    break;
                }
            }
        }

        match cut {
            Some(start) => {
                chunks.push(chunk.split_off(start));
                break;
            }
            None => chunks.push(chunk),
        }
    }

    let total = chunks.iter().map(Vec::len).sum();
    let mut out = Vec::with_capacity(total);
    for chunk in chunks.iter().rev() {
        out.extend_from_slice(chunk);
    }
    Ok(out)
}

/// Number of lines in `buf`; an unterminated final line counts.
pub fn count_lines(buf: &[u8]) -> usize {
    let breaks = buf.iter().filter(|&&b| b == b'\n').count();
    match buf.last() {
        Some(b'\n') | None => breaks,
        Some(_) => breaks + 1,
    }
}

// ============ Backends ============

/// Reads the file in-process on the blocking thread pool.
///
/// A blocking read cannot be cancelled, so [`Extractor::extract_tail_holding`]
/// moves the concurrency permit into the blocking closure. A read that hangs
/// past the deadline keeps its slot until it returns.
pub struct NativeExtractor;

impl NativeExtractor {
    async fn run_blocking(
        path: &Path,
        window_lines: usize,
        permit: Option<OwnedSemaphorePermit>,
    ) -> Result<Vec<u8>> {
        let owned = path.to_path_buf();
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            extract_tail(&owned, window_lines)
        })
        .await
        .map_err(|e| RetrievalError::ReadFailure {
            path: path.to_path_buf(),
            window_lines,
            source: std::io::Error::other(e.to_string()),
        })?
    }
}

#[async_trait]
impl Extractor for NativeExtractor {
    fn name(&self) -> &str {
        "native"
    }

    async fn extract_tail(&self, path: &Path, window_lines: usize) -> Result<Vec<u8>> {
        Self::run_blocking(path, window_lines, None).await
    }

    async fn extract_tail_holding(
        &self,
        path: &Path,
        window_lines: usize,
        permit: OwnedSemaphorePermit,
    ) -> Result<Vec<u8>> {
        Self::run_blocking(path, window_lines, Some(permit)).await
    }
}

/// Runs an external `tail` binary.
///
/// The child is killed when the future is dropped, so an enclosing timeout
/// also reclaims the process slot.
pub struct TailExtractor {
    binary: PathBuf,
}

impl TailExtractor {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Argument vector passed to the binary. Exposed for testing.
    pub fn args(path: &Path, window_lines: usize) -> Vec<std::ffi::OsString> {
        vec![
            "-n".into(),
            window_lines.to_string().into(),
            "--".into(),
            path.as_os_str().to_os_string(),
        ]
    }
}

#[async_trait]
impl Extractor for TailExtractor {
    fn name(&self) -> &str {
        "tail"
    }

    async fn extract_tail(&self, path: &Path, window_lines: usize) -> Result<Vec<u8>> {
        let output = Command::new(&self.binary)
            .args(Self::args(path, window_lines))
            .stdin(std::process::Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| RetrievalError::ReadFailure {
                path: path.to_path_buf(),
                window_lines,
                source: e,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            log::warn!(
                "{} exited with {} for {}: {}",
                self.binary.display(),
                output.status,
                path.display(),
                stderr.trim()
            );
            if !path.exists() {
                return Err(RetrievalError::NotFound {
                    path: path.to_path_buf(),
                });
            }
            return Err(RetrievalError::ReadFailure {
                path: path.to_path_buf(),
                window_lines,
                source: std::io::Error::other(stderr.trim().to_string()),
            });
        }

        if output.stdout.is_empty() {
            return Err(RetrievalError::EmptyWindow {
                path: path.to_path_buf(),
            });
        }
        Ok(output.stdout)
    }
}

/// Build the extractor selected by `[retrieval].extractor`.
pub fn build_extractor(config: &Config) -> Arc<dyn Extractor> {
    match config.retrieval.extractor {
        ExtractorKind::Native => Arc::new(NativeExtractor),
        ExtractorKind::Tail => Arc::new(TailExtractor::new(&config.retrieval.tail_binary)),
    }
}
