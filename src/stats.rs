//! File probes: type checks, line count, and modification time.
//!
//! These back the `logwin stat` command and `POST /logs/stat`. Line counting
//! streams the file through a fixed buffer instead of loading it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::config::Config;
use crate::error::{Result, RetrievalError};

/// Combined probe results for one file.
#[derive(Debug, Clone, Serialize)]
pub struct FileStat {
    pub path: String,
    pub is_file: bool,
    pub size_bytes: u64,
    pub lines: u64,
    pub last_modified: DateTime<Utc>,
}

pub fn is_file(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
}

pub fn is_directory(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false)
}

/// Count lines; an unterminated final line counts.
pub fn line_count(path: &Path) -> Result<u64> {
    let io_err = |e| RetrievalError::inaccessible(path.to_path_buf(), e);
    let mut file = File::open(path).map_err(io_err)?;
    let mut buf = vec![0u8; 64 * 1024];
    let mut count = 0u64;
    let mut last = None;

    loop {
        let n = file.read(&mut buf).map_err(io_err)?;
        if n == 0 {
            break;
        }
        count += buf[..n].iter().filter(|&&b| b == b'\n').count() as u64;
        last = Some(buf[n - 1]);
    }

    if matches!(last, Some(b) if b != b'\n') {
        count += 1;
    }
    Ok(count)
}

pub fn last_modified(path: &Path) -> Result<DateTime<Utc>> {
    let modified = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| RetrievalError::inaccessible(path.to_path_buf(), e))?;
    Ok(DateTime::<Utc>::from(modified))
}

/// Probe `path`. Must only be called on paths that passed validation.
pub fn stat_file(path: &Path) -> Result<FileStat> {
    let metadata =
        std::fs::metadata(path).map_err(|e| RetrievalError::inaccessible(path.to_path_buf(), e))?;
    if !metadata.is_file() {
        return Err(RetrievalError::rejected(
            &path.display().to_string(),
            "not a regular file",
        ));
    }

    Ok(FileStat {
        path: path.display().to_string(),
        is_file: true,
        size_bytes: metadata.len(),
        lines: line_count(path)?,
        last_modified: last_modified(path)?,
    })
}

/// Validate, resolve, and probe a caller-supplied path.
pub async fn stat_request(config: &Config, path: &str) -> Result<FileStat> {
    let verdict =
        crate::validate::validate(path, Some(config.retrieval.must_contain.as_slice()));
    if !verdict.accepted {
        return Err(RetrievalError::rejected(
            path,
            verdict.reason.unwrap_or_default(),
        ));
    }
    let resolved =
        crate::validate::resolve_under_roots(path, &config.retrieval.allowed_roots).await?;
    let probed = resolved.clone();
    tokio::task::spawn_blocking(move || stat_file(&probed))
        .await
        .map_err(|e| RetrievalError::Inaccessible {
            path: resolved,
            source: std::io::Error::other(e.to_string()),
        })?
}

/// CLI entry point for `logwin stat`.
pub async fn run_stat(config: &Config, path: &str) -> anyhow::Result<()> {
    let stat = stat_request(config, path).await?;

    println!("path:          {}", stat.path);
    println!("size:          {}", format_bytes(stat.size_bytes));
    println!("lines:         {}", stat.lines);
    println!(
        "last_modified: {}",
        stat.last_modified.format("%Y-%m-%dT%H:%M:%SZ")
    );
    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
