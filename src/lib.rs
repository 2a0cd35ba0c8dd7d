//! # Depth attribution for haplohseq events
//!
//! Attributes per-sample sequencing depths from single-sample VCF files to
//! genomic events (intervals of interest, each owned by one sample), splitting
//! every event's depths into those from its own sample and those from all
//! other samples.
//!
//! ## Pipeline
//!
//! 1. **Catalog**: load event intervals from one file or a glob and sort them
//!    in karyotype order ([`events`]).
//! 2. **Stream**: read each VCF one record at a time, through `xzcat` for
//!    `.xz` files ([`calls`]).
//! 3. **Join**: walk the sorted events in lockstep with the calls, finding
//!    every event that contains each call ([`merge`]).
//! 4. **Record**: append each depth to the event's `same` or `others` file
//!    ([`depth`]).
//!
//! ## Usage Example
//!
//! ```no_run
//! use haploh_depths::{pipeline, EventSource, RunConfig, SampleTemplate};
//!
//! let config = RunConfig::default().with_output_dir("Depths");
//! let events = EventSource::Glob(SampleTemplate::parse("events-*.tsv")?);
//! let summary = pipeline::run(&config, &events, "combined-*-ad.vcf.xz")?;
//! println!("{} depths recorded", summary.values);
//! # Ok::<(), haploh_depths::DepthsError>(())
//! ```

#![warn(missing_docs, missing_debug_implementations)]

pub mod calls; // Variant call cursors and transports
pub mod chrom; // Karyotype chromosome order
pub mod depth; // Depth values and per-event sinks
pub mod events; // Event intervals and the sorted catalog
pub mod merge; // Streaming interval join
pub mod pipeline; // Run driver
pub mod sample; // Sample ids from glob templates
pub mod summary; // Median depth summaries

// Re-exports for convenience
pub use calls::{CallParseError, CallSource, CursorError, VariantCall, VariantCallCursor};
pub use chrom::compare_chromosomes;
pub use depth::{Classification, DepthPolicy, DepthRecorder, DepthSink, SinkError};
pub use events::{Event, EventCatalog, EventError, EventSource};
pub use merge::{EventCursor, MergeError, MergeJoinEngine, SourceStats};
pub use pipeline::RunSummary;
pub use sample::{SampleError, SampleTemplate};

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Default directory for depth files.
pub const DEFAULT_OUTPUT_DIR: &str = "Depths";
/// Default directory for quarantined sources.
pub const DEFAULT_QUARANTINE_DIR: &str = "Broken";
/// Default decompressor for `.xz` sources.
pub const DEFAULT_DECOMPRESSOR: &str = "xzcat";

/// What to do when a variant source fails part way through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadFailurePolicy {
    /// Abort the run.
    Abort,
    /// Move the source into `dir` and continue with the next one.
    Quarantine {
        /// Directory receiving failed sources.
        dir: PathBuf,
    },
}

/// Configuration for a depth attribution run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Directory receiving the depth files.
    pub output_dir: PathBuf,
    /// Handling of sources that fail mid-read.
    pub read_failure: ReadFailurePolicy,
    /// Handling of depths above the 16-bit range.
    pub depth_policy: DepthPolicy,
    /// Program used to decompress `.xz` sources.
    pub decompressor: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            read_failure: ReadFailurePolicy::Abort,
            depth_policy: DepthPolicy::Reject,
            decompressor: DEFAULT_DECOMPRESSOR.to_string(),
        }
    }
}

impl RunConfig {
    /// Set the output directory.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Set the read-failure policy.
    pub fn with_read_failure(mut self, policy: ReadFailurePolicy) -> Self {
        self.read_failure = policy;
        self
    }

    /// Set the depth overflow policy.
    pub fn with_depth_policy(mut self, policy: DepthPolicy) -> Self {
        self.depth_policy = policy;
        self
    }

    /// Set the `.xz` decompressor program.
    pub fn with_decompressor(mut self, program: impl Into<String>) -> Self {
        self.decompressor = program.into();
        self
    }
}

/// Process outcome categories, with their sysexits codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCategory {
    /// Run completed.
    Success,
    /// Bad arguments or glob pattern.
    Usage,
    /// Malformed input record.
    DataError,
    /// Input file could not be opened.
    NoInput,
    /// A required resource (process, memory) was unavailable.
    Unavailable,
    /// Output could not be created.
    CantCreate,
}

impl ExitCategory {
    /// Numeric process exit code.
    pub fn code(self) -> u8 {
        match self {
            ExitCategory::Success => 0,
            ExitCategory::Usage => 64,
            ExitCategory::DataError => 65,
            ExitCategory::NoInput => 66,
            ExitCategory::Unavailable => 69,
            ExitCategory::CantCreate => 73,
        }
    }
}

/// Errors that end a run.
#[derive(Error, Debug)]
pub enum DepthsError {
    /// Glob template or sample id problem.
    #[error(transparent)]
    Sample(#[from] SampleError),

    /// Event catalog could not be loaded.
    #[error(transparent)]
    Events(#[from] EventError),

    /// Variant source could not be opened or read.
    #[error(transparent)]
    Cursor(#[from] CursorError),

    /// Depth token malformed or out of range.
    #[error(transparent)]
    Depth(#[from] depth::DepthError),

    /// Depth file could not be written.
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// Failed source could not be moved aside.
    #[error("cannot quarantine {path}: {source}")]
    Quarantine {
        /// Source that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
}

impl From<MergeError> for DepthsError {
    fn from(err: MergeError) -> Self {
        match err {
            MergeError::Source(err) => DepthsError::Cursor(err),
            MergeError::Depth(err) => DepthsError::Depth(err),
            MergeError::Sink(err) => DepthsError::Sink(err),
        }
    }
}

fn sample_category(err: &SampleError) -> ExitCategory {
    match err {
        SampleError::Glob(_) => ExitCategory::NoInput,
        _ => ExitCategory::Usage,
    }
}

impl DepthsError {
    /// Outcome category this error maps to.
    pub fn category(&self) -> ExitCategory {
        match self {
            DepthsError::Sample(err) => sample_category(err),
            DepthsError::Events(err) => match err {
                EventError::Open { .. } => ExitCategory::NoInput,
                EventError::Sample(err) => sample_category(err),
                _ => ExitCategory::DataError,
            },
            DepthsError::Cursor(err) => match err {
                CursorError::Open { .. } => ExitCategory::NoInput,
                CursorError::Spawn { .. } => ExitCategory::Unavailable,
                _ => ExitCategory::DataError,
            },
            DepthsError::Depth(_) => ExitCategory::DataError,
            DepthsError::Sink(_) | DepthsError::Quarantine { .. } => ExitCategory::CantCreate,
        }
    }
}

/// Install the stderr log subscriber.
///
/// `RUST_LOG` takes precedence; otherwise logs at `info`, or `debug` when
/// `verbose` is set.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_documented_layout() {
        let config = RunConfig::default();
        assert_eq!(config.output_dir, PathBuf::from("Depths"));
        assert_eq!(config.read_failure, ReadFailurePolicy::Abort);
        assert_eq!(config.depth_policy, DepthPolicy::Reject);
        assert_eq!(config.decompressor, "xzcat");
    }

    #[test]
    fn errors_map_to_exit_categories() {
        let usage = DepthsError::from(SampleError::NoWildcard("x".to_string()));
        assert_eq!(usage.category(), ExitCategory::Usage);
        assert_eq!(usage.category().code(), 64);

        let data = DepthsError::from(MergeError::Depth(depth::DepthError::InvalidDepth(
            "0/1:x".to_string(),
        )));
        assert_eq!(data.category(), ExitCategory::DataError);

        let no_input = DepthsError::from(CursorError::Open {
            path: PathBuf::from("a.vcf"),
            source: io::Error::from(io::ErrorKind::NotFound),
        });
        assert_eq!(no_input.category().code(), 66);

        let spawn = DepthsError::from(CursorError::Spawn {
            command: "xzcat a.vcf.xz".to_string(),
            source: io::Error::from(io::ErrorKind::NotFound),
        });
        assert_eq!(spawn.category(), ExitCategory::Unavailable);

        let sink = DepthsError::from(SinkError::Create {
            path: PathBuf::from("Depths/x.txt"),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        });
        assert_eq!(sink.category().code(), 73);
    }
}
