//! Report output.
//!
//! - [`json`]: the serializable [`Report`] and its writer
//! - [`summary`]: a short coloured terminal summary
//!
//! # Example
//!
//! ```no_run
//! use treetidy::config::EngineConfig;
//! use treetidy::engine::Engine;
//! use treetidy::output::render_summary;
//! use std::path::Path;
//!
//! let report = Engine::new(EngineConfig::default()).run(Path::new(".")).unwrap();
//! report.write_to(&mut std::io::stdout(), true).unwrap();
//! eprint!("{}", render_summary(&report, 20));
//! ```

pub mod json;
pub mod summary;

pub use json::{JsonOutputError, Report, ReportSummary};
pub use summary::{render_summary, DEFAULT_ACTION_LIMIT};
