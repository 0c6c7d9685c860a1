//! The retrieval pipeline.
//!
//! `validate → resolve → extract → filter → encode`, driven by
//! [`Retriever::retrieve`]. Used by both the `logwin tail` CLI command and
//! the `POST /logs/tail` HTTP endpoint.
//!
//! A rejected request stops before any filesystem access or process spawn.
//! Extraction runs under the configured deadline and a semaphore bounds the
//! number of extractions in flight.

use anyhow::Context;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

use crate::codec;
use crate::config::Config;
use crate::error::{Result, RetrievalError};
use crate::extract::{build_extractor, count_lines};
use crate::filter::{compile_pattern, filter_with};
use crate::models::{FilterOutcome, RetrievalOutcome, RetrievalRequest};
use crate::traits::Extractor;
use crate::validate::{resolve_under_roots, validate, validate_pattern};

/// Runs retrievals against one configuration. Cheap to clone.
#[derive(Clone)]
pub struct Retriever {
    config: Arc<Config>,
    extractor: Arc<dyn Extractor>,
    permits: Arc<Semaphore>,
}

impl Retriever {
    pub fn new(config: &Config) -> Self {
        Self::with_extractor(config, build_extractor(config))
    }

    /// Use a custom extraction backend instead of the configured one.
    pub fn with_extractor(config: &Config, extractor: Arc<dyn Extractor>) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(config.retrieval.max_concurrent)),
            config: Arc::new(config.clone()),
            extractor,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the full pipeline for one request.
    ///
    /// Returns [`RetrievalOutcome::NoMatch`] when a pattern was given and no
    /// line of the window survived it.
    pub async fn retrieve(&self, request: &RetrievalRequest) -> Result<RetrievalOutcome> {
        let started = Instant::now();
        let settings = &self.config.retrieval;

        if request.window_lines == 0 || request.window_lines > settings.max_lines {
            return Err(RetrievalError::rejected(
                &request.path,
                format!("window must be between 1 and {} lines", settings.max_lines),
            ));
        }

        let verdict = validate(&request.path, Some(settings.must_contain.as_slice()));
        if !verdict.accepted {
            return Err(RetrievalError::rejected(
                &request.path,
                verdict.reason.unwrap_or_default(),
            ));
        }

        let matcher = match request.pattern.as_deref() {
            Some(pattern) => {
                let verdict = validate_pattern(pattern);
                if !verdict.accepted {
                    return Err(RetrievalError::rejected(
                        pattern,
                        verdict.reason.unwrap_or_default(),
                    ));
                }
                Some(compile_pattern(pattern, request.match_mode)?)
            }
            None => None,
        };

        let deadline = Duration::from_secs(settings.timeout_secs);
        let permit = tokio::time::timeout(deadline, self.permits.clone().acquire_owned())
            .await
            .map_err(|_| RetrievalError::Busy {
                secs: settings.timeout_secs,
            })?
            .map_err(|_| RetrievalError::Busy {
                secs: settings.timeout_secs,
            })?;

        // The permit goes with the extraction; a backend that cannot be
        // cancelled keeps it until its work ends, not until the deadline.
        let window = tokio::time::timeout(deadline, async {
            let resolved = resolve_under_roots(&request.path, &settings.allowed_roots).await?;
            self.extractor
                .extract_tail_holding(&resolved, request.window_lines, permit)
                .await
        })
        .await
        .map_err(|_| {
            log::warn!(
                "{} extraction of {} timed out",
                self.extractor.name(),
                request.path
            );
            RetrievalError::Timeout {
                path: PathBuf::from(&request.path),
                secs: settings.timeout_secs,
            }
        })??;

        let payload = match &matcher {
            Some(matcher) => match filter_with(&window, matcher, request.invert_match) {
                FilterOutcome::Lines(kept) => kept,
                FilterOutcome::NoMatch => {
                    log::debug!(
                        "no line of {} matched in {:?}",
                        request.path,
                        started.elapsed()
                    );
                    return Ok(RetrievalOutcome::NoMatch);
                }
            },
            None => window,
        };

        let lines = count_lines(&payload);
        let kind = request.codec.unwrap_or(self.config.codec.default);
        let block = codec::encode_with_level(&payload, kind, self.config.codec.zstd_level)?;

        log::debug!(
            "retrieved {} lines ({} -> {} bytes, {}) from {} in {:?}",
            lines,
            block.uncompressed_length,
            block.data.len(),
            kind,
            request.path,
            started.elapsed()
        );

        Ok(RetrievalOutcome::Window { block, lines })
    }
}

/// CLI entry point for `logwin tail`.
///
/// With `output`, writes the framed block to that file; otherwise decodes
/// the block and prints the window to stdout.
pub async fn run_tail(
    config: &Config,
    request: &RetrievalRequest,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let outcome = Retriever::new(config).retrieve(request).await?;

    let (block, lines) = match outcome {
        RetrievalOutcome::Window { block, lines } => (block, lines),
        RetrievalOutcome::NoMatch => {
            println!("No matching lines.");
            return Ok(());
        }
    };

    match output {
        Some(path) => {
            std::fs::write(path, codec::encode_frame(&block))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!(
                "Wrote {} lines ({} bytes, {} compressed with {}) to {}",
                lines,
                block.uncompressed_length,
                block.data.len(),
                block.codec,
                path.display()
            );
        }
        None => {
            let text = codec::decode(&block)?;
            std::io::stdout().write_all(&text)?;
        }
    }
    Ok(())
}

/// CLI entry point for `logwin decode`.
pub fn run_decode(frame_path: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    let frame = std::fs::read(frame_path)
        .with_context(|| format!("Failed to read {}", frame_path.display()))?;
    let block = codec::decode_frame(&frame)?;
    let data = codec::decode(&block)?;

    match output {
        Some(path) => std::fs::write(path, &data)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => std::io::stdout().write_all(&data)?,
    }
    Ok(())
}
