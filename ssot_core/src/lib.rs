//! `ssot_core` is the engine behind [ssot](https://github.com/ssot-tools/ssot). It keeps constants
//! that are duplicated across a code base (version strings, URLs, limits) in sync with a single
//! registry of authoritative values.
//!
//! ## Directives
//!
//! Source files mark the token to keep in sync with a trailing comment:
//!
//! ```text
//! const Version = "1.2.3" // ssot[version]: "(\d+\.\d+\.\d+)"
//! ```
//!
//! The text after `ssot[version]:` is a regular expression matched against the code before the
//! comment marker. Its first capture group is the part replaced with the registry value;
//! anything else it matches is kept as fixed context. The comment itself is never touched, so
//! running the tool again on its own output changes nothing.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Registry (ssot.yaml: files + constants + markers)
//!   → LinePatterns (one directive regex per extension, compiled once)
//!   → for each listed file:
//!       presence check → line rewriter (value regex → TokenSplit → replace) → write if changed
//!   → SyncReport (per-file plans + collected errors)
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Registry loading from `ssot.yaml`/`ssot.toml`/`ssot.json` and the comment
//!   marker table.
//! - [`directive`]: The per-extension directive pattern and the presence screener.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ssot_core::{SyncOptions, load_context, synchronize};
//! use std::path::Path;
//!
//! let ctx = load_context(Path::new("."), None).unwrap();
//! let mut report = synchronize(&ctx, SyncOptions::default());
//! for plan in report.changed() {
//!     println!("updated {}", plan.path.display());
//! }
//! if let Some(error) = report.take_error() {
//!     eprintln!("{error}");
//! }
//! ```

pub use config::*;
pub use directive::*;
pub use engine::*;
pub use error::*;
pub use pattern::*;
pub use rewriter::*;

pub mod config;
pub mod directive;
mod engine;
#[allow(unused_assignments)]
mod error;
mod pattern;
mod rewriter;
