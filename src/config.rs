use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::models::CodecKind;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub codec: CodecConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExtractorKind {
    #[default]
    Native,
    Tail,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Directories a requested path must resolve under. Must not be empty.
    #[serde(default = "default_allowed_roots")]
    pub allowed_roots: Vec<PathBuf>,
    /// Substrings of which a requested path must contain at least one.
    #[serde(default)]
    pub must_contain: Vec<String>,
    #[serde(default = "default_lines")]
    pub default_lines: usize,
    #[serde(default = "default_max_lines")]
    pub max_lines: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    #[serde(default)]
    pub extractor: ExtractorKind,
    #[serde(default = "default_tail_binary")]
    pub tail_binary: PathBuf,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            allowed_roots: default_allowed_roots(),
            must_contain: Vec::new(),
            default_lines: default_lines(),
            max_lines: default_max_lines(),
            timeout_secs: default_timeout_secs(),
            max_concurrent: default_max_concurrent(),
            extractor: ExtractorKind::Native,
            tail_binary: default_tail_binary(),
        }
    }
}

fn default_allowed_roots() -> Vec<PathBuf> {
    vec![PathBuf::from("./logs")]
}
fn default_lines() -> usize {
    200
}
fn default_max_lines() -> usize {
    100_000
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_max_concurrent() -> usize {
    8
}
fn default_tail_binary() -> PathBuf {
    PathBuf::from("tail")
}

#[derive(Debug, Deserialize, Clone)]
pub struct CodecConfig {
    #[serde(default)]
    pub default: CodecKind,
    #[serde(default = "default_zstd_level")]
    pub zstd_level: i32,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            default: CodecKind::Zstd,
            zstd_level: default_zstd_level(),
        }
    }
}

fn default_zstd_level() -> i32 {
    crate::codec::DEFAULT_ZSTD_LEVEL
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

impl Config {
    /// Built-in defaults, used when no config file is present.
    pub fn minimal() -> Self {
        Self::default()
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    check_config(&config)?;
    Ok(config)
}

/// Like [`load_config`], but a missing file yields [`Config::minimal`].
pub fn load_config_or_default(path: &Path) -> Result<Config> {
    if !path.exists() {
        log::debug!("no config at {}, using defaults", path.display());
        return Ok(Config::minimal());
    }
    load_config(path)
}

fn check_config(config: &Config) -> Result<()> {
    let r = &config.retrieval;

    if r.allowed_roots.is_empty() {
        anyhow::bail!("retrieval.allowed_roots must list at least one log directory");
    }
    if r.max_lines == 0 {
        anyhow::bail!("retrieval.max_lines must be > 0");
    }
    if r.default_lines == 0 || r.default_lines > r.max_lines {
        anyhow::bail!("retrieval.default_lines must be in [1, retrieval.max_lines]");
    }
    if r.timeout_secs == 0 {
        anyhow::bail!("retrieval.timeout_secs must be > 0");
    }
    if r.max_concurrent == 0 {
        anyhow::bail!("retrieval.max_concurrent must be > 0");
    }

    let levels = zstd::compression_level_range();
    if !levels.contains(&config.codec.zstd_level) {
        anyhow::bail!(
            "codec.zstd_level must be in [{}, {}]",
            levels.start(),
            levels.end()
        );
    }

    Ok(())
}
