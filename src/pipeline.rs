//! Top-level run: load the catalog, then stream every variant source through
//! the merge join into the depth sink.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::calls::VariantCallCursor;
use crate::depth::DepthSink;
use crate::events::{EventCatalog, EventSource};
use crate::merge::{MergeError, MergeJoinEngine};
use crate::sample::SampleTemplate;
use crate::{DepthsError, ReadFailurePolicy, RunConfig};

/// Totals for a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Events in the catalog.
    pub events: usize,
    /// Variant sources fully processed.
    pub sources: usize,
    /// Sources moved aside after a read failure.
    pub quarantined: Vec<PathBuf>,
    /// Calls read across all sources, quarantined ones included.
    pub calls: u64,
    /// Depth files written.
    pub files: usize,
    /// Depth values recorded.
    pub values: u64,
}

/// Attribute the depths of every source matching `vcf_pattern` to the events
/// named by `events`.
///
/// The VCF template is validated before any file is touched.
pub fn run(
    config: &RunConfig,
    events: &EventSource,
    vcf_pattern: &str,
) -> Result<RunSummary, DepthsError> {
    let vcf_template = SampleTemplate::parse(vcf_pattern)?;

    let catalog = EventCatalog::load(events)?;
    let sources = vcf_template.expand()?;
    info!(sources = sources.len(), "variant sources matched");

    let mut sink = DepthSink::new(&config.output_dir);
    let stale = sink.clear_previous(catalog.events())?;
    if stale > 0 {
        info!(files = stale, dir = %config.output_dir.display(), "removed previous depth files");
    }
    let mut engine = MergeJoinEngine::new(&catalog, config.depth_policy);
    let mut summary = RunSummary {
        events: catalog.len(),
        ..RunSummary::default()
    };

    for (idx, path) in sources.iter().enumerate() {
        let sample_id = vcf_template.extract(path)?;
        let mut cursor = VariantCallCursor::open(path, &config.decompressor)?;
        info!(
            source = idx + 1,
            path = %path.display(),
            sample = %sample_id,
            "processing variant source"
        );

        let outcome = engine.process_source(&sample_id, &mut cursor, &mut sink);
        // Reap any decompressor before the file can be moved.
        drop(cursor);

        match outcome {
            Ok(stats) => {
                info!(
                    path = %path.display(),
                    calls = stats.calls,
                    matched = stats.matched_calls,
                    values = stats.values,
                    "variant source done"
                );
                summary.sources += 1;
                summary.calls += stats.calls;
            }
            Err(MergeError::Source(err)) if err.is_read_failure() => match &config.read_failure {
                ReadFailurePolicy::Abort => return Err(err.into()),
                ReadFailurePolicy::Quarantine { dir } => {
                    // Values read before the failure stay recorded.
                    summary.calls += engine.last_stats().calls;
                    let moved = quarantine(path, dir)?;
                    warn!(
                        error = %err,
                        path = %path.display(),
                        moved_to = %moved.display(),
                        "quarantined unreadable variant source"
                    );
                    summary.quarantined.push(moved);
                }
            },
            Err(err) => return Err(err.into()),
        }
    }

    let report = sink.close()?;
    summary.files = report.files;
    summary.values = report.values;
    info!(
        sources = summary.sources,
        quarantined = summary.quarantined.len(),
        files = summary.files,
        values = summary.values,
        "run complete"
    );
    Ok(summary)
}

/// Move `path` into `dir`, creating `dir` if needed.
fn quarantine(path: &Path, dir: &Path) -> Result<PathBuf, DepthsError> {
    let fail = |source| DepthsError::Quarantine {
        path: path.to_path_buf(),
        source,
    };
    fs::create_dir_all(dir).map_err(fail)?;
    let target = match path.file_name() {
        Some(name) => dir.join(name),
        None => dir.join(path),
    };
    fs::rename(path, &target).map_err(fail)?;
    Ok(target)
}
