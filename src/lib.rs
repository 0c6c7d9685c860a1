//! # Log Window
//!
//! Bounded, filtered, and compressed tail retrieval for large log files.
//!
//! Given a path, a line count, and an optional pattern, Log Window returns
//! the most recent lines of a file as a compressed block plus the length
//! needed to decode it. Files are read backwards from the end, so the cost
//! of a request follows the size of the window, not the size of the log.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌──────────┐   ┌──────────┐
//! │ validate │──▶│  extract  │──▶│  filter  │──▶│  codec   │
//! │ deny-list│   │ tail -n N │   │ grep -i  │   │ zstd/lz4 │
//! └──────────┘   └───────────┘   └──────────┘   └────┬─────┘
//!                                                    │
//!                      ┌─────────────────────────────┤
//!                      ▼                             ▼
//!                 ┌──────────┐                 ┌──────────┐
//!                 │   CLI    │                 │   HTTP   │
//!                 │ (logwin) │                 │  (axum)  │
//!                 └──────────┘                 └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! logwin tail /srv/logs/app.log -n 200 --grep error
//! logwin serve
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Request, verdict, block, and outcome types |
//! | [`error`] | Retrieval error taxonomy |
//! | [`validate`] | Path and pattern validation |
//! | [`extract`] | Bounded tail extraction backends |
//! | [`filter`] | Case-insensitive line filtering |
//! | [`codec`] | Length-tracked block compression |
//! | [`retrieve`] | The retrieval pipeline |
//! | [`stats`] | File type, line count, and mtime probes |
//! | [`server`] | HTTP JSON API |
//! | [`traits`] | Extractor extension trait |

pub mod codec;
pub mod config;
pub mod error;
pub mod extract;
pub mod filter;
pub mod models;
pub mod retrieve;
pub mod server;
pub mod stats;
pub mod traits;
pub mod validate;
