//! # Log Window CLI (`logwin`)
//!
//! Fetches bounded, optionally filtered tail windows of large log files and
//! serves them over HTTP as compressed blocks.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `logwin tail <path>` | Print (or write a framed block of) the last N lines |
//! | `logwin decode <frame>` | Decode a framed block written by `tail --output` |
//! | `logwin check <payload>` | Run the input validator on a payload |
//! | `logwin stat <path>` | Size, line count, and modification time of a file |
//! | `logwin serve` | Start the HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! # Last 100 lines mentioning "timeout", case-insensitive
//! logwin tail /srv/logs/app.log -n 100 --grep timeout
//!
//! # Everything except health checks, stored as an LZ4 block
//! logwin tail /srv/logs/access.log --grep "GET /health" --invert --codec lz4 --output win.lw
//! logwin decode win.lw
//! ```
//!
//! Logging goes to stderr and is controlled with `RUST_LOG` (default `info`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use log_window::config;
use log_window::models::{CodecKind, MatchMode, RetrievalRequest};
use log_window::{retrieve, server, stats, validate};

/// Log Window: bounded tail retrieval for large log files.
#[derive(Parser)]
#[command(name = "logwin", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/logwin.toml`. Built-in defaults are used when
    /// the file does not exist.
    #[arg(long, global = true, default_value = "./config/logwin.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the last lines of a log file.
    Tail {
        /// Log file path. Must pass validation and resolve under an allowed root.
        path: String,

        /// Number of trailing lines. Defaults to `[retrieval].default_lines`.
        #[arg(short = 'n', long)]
        lines: Option<usize>,

        /// Keep only lines containing this pattern (case-insensitive).
        #[arg(long)]
        grep: Option<String>,

        /// Keep the lines that do NOT match `--grep` instead.
        #[arg(long, requires = "grep")]
        invert: bool,

        /// Interpret `--grep` as a regular expression instead of a literal.
        #[arg(long, requires = "grep")]
        regex: bool,

        /// Compression scheme: `zstd` or `lz4`. Defaults to `[codec].default`.
        #[arg(long)]
        codec: Option<CodecKind>,

        /// Write the compressed block (with length header) here instead of
        /// printing the decoded text.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Decode a framed block written by `tail --output`.
    Decode {
        frame: PathBuf,

        /// Write the text here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Check a payload against the input validator.
    Check {
        payload: String,

        /// Require the payload to contain at least one of these (repeatable).
        #[arg(long = "must-contain")]
        must_contain: Vec<String>,
    },

    /// Show size, line count, and modification time of a log file.
    Stat { path: String },

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Commands that don't require config
    if let Commands::Check {
        payload,
        must_contain,
    } = &cli.command
    {
        let verdict = validate::validate(payload, Some(must_contain.as_slice()));
        if verdict.accepted {
            println!("accepted");
            return Ok(());
        }
        println!("rejected: {}", verdict.reason.unwrap_or_default());
        std::process::exit(1);
    }
    if let Commands::Decode { frame, output } = &cli.command {
        return retrieve::run_decode(frame, output.as_deref());
    }

    let cfg = config::load_config_or_default(&cli.config)?;

    match cli.command {
        Commands::Tail {
            path,
            lines,
            grep,
            invert,
            regex,
            codec,
            output,
        } => {
            let mut request =
                RetrievalRequest::new(path, lines.unwrap_or(cfg.retrieval.default_lines));
            if let Some(pattern) = grep {
                request = request.with_pattern(pattern, invert);
            }
            if regex {
                request = request.with_match_mode(MatchMode::Regex);
            }
            if let Some(codec) = codec {
                request = request.with_codec(codec);
            }
            retrieve::run_tail(&cfg, &request, output.as_deref()).await?;
        }
        Commands::Stat { path } => {
            stats::run_stat(&cfg, &path).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Check { .. } | Commands::Decode { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
