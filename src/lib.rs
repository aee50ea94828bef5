//! sleepscore - Sleep stage aggregation and quality scoring
//!
//! sleepscore turns raw health-store sleep samples into per-day stage totals
//! and a 0-1 quality score through a deterministic pipeline: sample ingestion →
//! interval merging → sleep-day windowing → stage aggregation → scoring →
//! report encoding.
//!
//! ## Modules
//!
//! - **Scoring**: merge, window, aggregate and score sleep stages per sleep day
//! - **Views**: date ranges, heart-rate summaries and hypnogram series for
//!   history and analytics screens

pub mod adapters;
pub mod aggregate;
pub mod config;
pub mod dates;
pub mod error;
pub mod heart_rate;
pub mod hypnogram;
pub mod merge;
pub mod pipeline;
pub mod report;
pub mod score;
pub mod types;
pub mod window;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::EngineConfig;
pub use error::ComputeError;
pub use pipeline::{samples_to_daily_reports, SleepProcessor};
pub use score::{ScoreBreakdown, ScoreEngine};
pub use types::{DateObject, ProcessedSleepData, RawSleepSample, SleepInterval, StageLabel};

/// sleepscore version embedded in all reports
pub const SLEEPSCORE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "sleepscore";
