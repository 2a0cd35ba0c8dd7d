//! Median depth per event, computed from the recorded depth files.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::depth::{sink_path, Classification};
use crate::events::{Event, EventCatalog};

const HEADER: &str =
    "sample\tchromosome\tbegin\tend\tsame_count\tsame_median\tothers_count\tothers_median\n";

/// Errors raised while reading depth files back.
#[derive(Debug, Error)]
pub enum SummaryError {
    /// Depth file exists but could not be read.
    #[error("error reading {path}: {source}")]
    Read {
        /// Depth file.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Line is not a decimal depth.
    #[error("{path}:{line}: invalid depth '{value}'")]
    Malformed {
        /// Depth file.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        /// Offending text.
        value: String,
    },
}

/// Count and median of one depth file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthSummary {
    /// Number of recorded depths.
    pub count: usize,
    /// Median depth, `None` when nothing was recorded.
    pub median: Option<f64>,
}

impl DepthSummary {
    /// Summarise `values` (reordered in place).
    pub fn from_values(values: &mut [u64]) -> Self {
        Self {
            count: values.len(),
            median: median(values),
        }
    }
}

/// Median of `values`; the mean of the two middle values for even counts.
pub fn median(values: &mut [u64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable();
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid] as f64)
    } else {
        Some((values[mid - 1] as f64 + values[mid] as f64) / 2.0)
    }
}

/// Read one depth file; a missing file means no depths were recorded.
pub fn read_depths(path: &Path) -> Result<Vec<u64>, SummaryError> {
    let read_err = |source| SummaryError::Read {
        path: path.to_path_buf(),
        source,
    };
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(read_err(err)),
    };
    let mut values = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(read_err)?;
        let value = line.parse().map_err(|_| SummaryError::Malformed {
            path: path.to_path_buf(),
            line: idx + 1,
            value: line.clone(),
        })?;
        values.push(value);
    }
    Ok(values)
}

/// Same-sample and other-sample summaries of one event.
#[derive(Debug, Clone, PartialEq)]
pub struct EventSummary {
    /// Summarised event.
    pub event: Event,
    /// Depths from the event's own sample.
    pub same: DepthSummary,
    /// Depths from every other sample.
    pub others: DepthSummary,
}

/// Summarise every event of `catalog` from the files under `depths_dir`.
pub fn summarize(
    catalog: &EventCatalog,
    depths_dir: &Path,
) -> Result<Vec<EventSummary>, SummaryError> {
    catalog
        .iter()
        .map(|event| {
            let mut same = read_depths(&sink_path(depths_dir, event, Classification::Same))?;
            let mut others = read_depths(&sink_path(depths_dir, event, Classification::Others))?;
            Ok(EventSummary {
                event: event.clone(),
                same: DepthSummary::from_values(&mut same),
                others: DepthSummary::from_values(&mut others),
            })
        })
        .collect()
}

fn format_median(median: Option<f64>) -> String {
    match median {
        Some(value) => format!("{:.1}", value),
        None => "NA".to_string(),
    }
}

/// Write summaries as a tab-separated table with a header row.
pub fn write_table<W: Write>(writer: &mut W, summaries: &[EventSummary]) -> io::Result<()> {
    writer.write_all(HEADER.as_bytes())?;
    for summary in summaries {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            summary.event.sample_id,
            summary.event.chrom,
            summary.event.begin,
            summary.event.end,
            summary.same.count,
            format_median(summary.same.median),
            summary.others.count,
            format_median(summary.others.median),
        )?;
    }
    writer.flush()
}

/// Render summaries into a string (useful for tests and snapshots).
pub fn render_table(summaries: &[EventSummary]) -> String {
    let mut buffer = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = write_table(&mut buffer, summaries);
    String::from_utf8_lossy(&buffer).into_owned()
}
