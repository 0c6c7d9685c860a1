//! Core data models used throughout the retrieval pipeline.
//!
//! Every value here is created, consumed, and dropped within a single
//! request. Nothing is cached or shared between requests.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a filter pattern is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Every character matches itself (substring search).
    #[default]
    Literal,
    /// The pattern is a regular expression.
    Regex,
}

/// Compression scheme used for a [`CompressedBlock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecKind {
    /// General-purpose streaming scheme; the default response format.
    #[default]
    Zstd,
    /// Fast LZ4 block scheme.
    Lz4,
}

impl CodecKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodecKind::Zstd => "zstd",
            CodecKind::Lz4 => "lz4",
        }
    }
}

impl fmt::Display for CodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CodecKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "zstd" => Ok(CodecKind::Zstd),
            "lz4" => Ok(CodecKind::Lz4),
            other => Err(format!("unknown codec '{}': expected zstd or lz4", other)),
        }
    }
}

/// A single tail request.
#[derive(Debug, Clone)]
pub struct RetrievalRequest {
    pub path: String,
    pub window_lines: usize,
    pub pattern: Option<String>,
    pub invert_match: bool,
    pub match_mode: MatchMode,
    /// `None` selects the configured default codec.
    pub codec: Option<CodecKind>,
}

impl RetrievalRequest {
    pub fn new(path: impl Into<String>, window_lines: usize) -> Self {
        Self {
            path: path.into(),
            window_lines,
            pattern: None,
            invert_match: false,
            match_mode: MatchMode::Literal,
            codec: None,
        }
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>, invert_match: bool) -> Self {
        self.pattern = Some(pattern.into());
        self.invert_match = invert_match;
        self
    }

    pub fn with_match_mode(mut self, mode: MatchMode) -> Self {
        self.match_mode = mode;
        self
    }

    pub fn with_codec(mut self, codec: CodecKind) -> Self {
        self.codec = Some(codec);
        self
    }
}

/// Result of [`crate::validate::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationVerdict {
    pub accepted: bool,
    pub reason: Option<String>,
}

impl ValidationVerdict {
    pub fn accept() -> Self {
        Self {
            accepted: true,
            reason: None,
        }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            accepted: false,
            reason: Some(reason.into()),
        }
    }
}

/// Output of the pattern filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOutcome {
    /// The kept lines, in original order, with their original terminators.
    Lines(Vec<u8>),
    /// The window was non-empty but no line survived the filter.
    NoMatch,
}

/// Compressed payload plus the metadata required to decode it.
///
/// `uncompressed_length` always travels with `data`; neither block scheme
/// records it on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedBlock {
    pub codec: CodecKind,
    pub data: Vec<u8>,
    pub uncompressed_length: usize,
}

/// Successful result of a retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrievalOutcome {
    Window {
        block: CompressedBlock,
        /// Number of lines encoded in `block`.
        lines: usize,
    },
    NoMatch,
}
