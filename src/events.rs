//! Event intervals and the sorted event catalog.
//!
//! Event files are tab-separated with one interval per row:
//!
//! ```text
//! CHROM   BEGIN   END     ...
//! chr1    1000    2000    ...
//! ```
//!
//! An initial header row (second field `BEGIN`) is skipped. Columns after END
//! are ignored. Every malformed row aborts the load.

use std::cmp::Ordering;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::chrom::compare_chromosomes;
use crate::sample::{SampleError, SampleTemplate};

const HEADER_TOKEN: &str = "BEGIN";

/// Genomic interval of interest owned by one sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Chromosome/contig name.
    pub chrom: Arc<str>,
    /// First covered position (inclusive).
    pub begin: u64,
    /// Last covered position (inclusive).
    pub end: u64,
    /// Sample the interval was defined for.
    pub sample_id: Arc<str>,
}

impl Event {
    /// Construct a new event.
    pub fn new(
        chrom: impl Into<Arc<str>>,
        begin: u64,
        end: u64,
        sample_id: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            chrom: chrom.into(),
            begin,
            end,
            sample_id: sample_id.into(),
        }
    }

    /// Whether `position` on `chrom` lies within `begin..=end`.
    pub fn contains(&self, chrom: &str, position: u64) -> bool {
        &*self.chrom == chrom && self.begin <= position && position <= self.end
    }
}

/// Catalog order: karyotype chromosome order, then begin, then end.
pub fn compare_events(a: &Event, b: &Event) -> Ordering {
    compare_chromosomes(&a.chrom, &b.chrom)
        .then(a.begin.cmp(&b.begin))
        .then(a.end.cmp(&b.end))
}

/// Where events come from.
#[derive(Debug, Clone)]
pub enum EventSource {
    /// One file whose events all belong to `sample_id`.
    File {
        /// Owning sample of every event in the file.
        sample_id: String,
        /// Event file.
        path: PathBuf,
    },
    /// Every file matching the template; each file's sample id comes from its name.
    Glob(SampleTemplate),
}

/// Errors raised while loading events.
#[derive(Debug, Error)]
pub enum EventError {
    /// Event file could not be opened.
    #[error("cannot open {path}: {source}")]
    Open {
        /// Event file.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Reading failed part way through the file.
    #[error("error reading {path}: {source}")]
    Read {
        /// Event file.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Row does not have the expected tab-separated layout.
    #[error("{path}:{line}: {reason}")]
    Malformed {
        /// Event file.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        /// What was wrong with the row.
        reason: String,
    },

    /// BEGIN or END is not an unsigned integer.
    #[error("{path}:{line}: invalid {field}: '{value}'")]
    InvalidNumber {
        /// Event file.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        /// Column name (BEGIN or END).
        field: &'static str,
        /// Offending text.
        value: String,
    },

    /// BEGIN lies after END.
    #[error("{path}:{line}: BEGIN {begin} is greater than END {end}")]
    Inverted {
        /// Event file.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        /// Parsed BEGIN.
        begin: u64,
        /// Parsed END.
        end: u64,
    },

    /// Sample id could not be derived from a file name.
    #[error(transparent)]
    Sample(#[from] SampleError),
}

enum Row<'a> {
    Header,
    Interval { chrom: &'a str, begin: u64, end: u64 },
}

/// Complete, sorted collection of events for a run.
#[derive(Debug, Clone, Default)]
pub struct EventCatalog {
    events: Vec<Event>,
}

impl EventCatalog {
    /// Build a catalog from already-parsed events, sorting them.
    pub fn from_events(mut events: Vec<Event>) -> Self {
        // `sort_by` is stable: equal keys keep their load order.
        events.sort_by(compare_events);
        Self { events }
    }

    /// Load and sort every event named by `source`.
    pub fn load(source: &EventSource) -> Result<Self, EventError> {
        let mut events = Vec::new();
        match source {
            EventSource::File { sample_id, path } => {
                let sample: Arc<str> = Arc::from(sample_id.as_str());
                events.extend(read_event_file(path, &sample)?);
            }
            EventSource::Glob(template) => {
                for path in template.expand()? {
                    let sample: Arc<str> = Arc::from(template.extract(&path)?);
                    events.extend(read_event_file(&path, &sample)?);
                }
            }
        }
        let catalog = Self::from_events(events);
        for event in catalog.iter() {
            debug!(
                sample = %event.sample_id,
                chrom = %event.chrom,
                begin = event.begin,
                end = event.end,
                "loaded event"
            );
        }
        info!(events = catalog.len(), "event catalog loaded");
        Ok(catalog)
    }

    /// Sorted events.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Iterate events in catalog order.
    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.events.iter()
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the catalog holds no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

fn read_event_file(path: &Path, sample_id: &Arc<str>) -> Result<Vec<Event>, EventError> {
    let file = File::open(path).map_err(|source| EventError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    read_events(BufReader::new(file), path, sample_id)
}

/// Parse every event row from `reader`, tagging each with `sample_id`.
///
/// `path` is only used in error messages.
pub fn read_events<R: BufRead>(
    reader: R,
    path: &Path,
    sample_id: &Arc<str>,
) -> Result<Vec<Event>, EventError> {
    let mut events = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| EventError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        match parse_row(&line, idx == 0, path, idx + 1)? {
            Row::Header => continue,
            Row::Interval { chrom, begin, end } => {
                events.push(Event::new(chrom, begin, end, Arc::clone(sample_id)));
            }
        }
    }
    Ok(events)
}

fn parse_row<'a>(
    line: &'a str,
    first: bool,
    path: &Path,
    line_no: usize,
) -> Result<Row<'a>, EventError> {
    let malformed = |reason: &str| EventError::Malformed {
        path: path.to_path_buf(),
        line: line_no,
        reason: reason.to_string(),
    };

    let mut fields = line.split('\t');
    let chrom = fields.next().unwrap_or_default();
    if chrom.is_empty() {
        return Err(malformed("empty chromosome field"));
    }
    let begin = fields
        .next()
        .ok_or_else(|| malformed("did not find tab after chromosome"))?;
    if first && begin == HEADER_TOKEN {
        return Ok(Row::Header);
    }
    let end = fields
        .next()
        .ok_or_else(|| malformed("did not find tab after BEGIN"))?;

    let begin = parse_position(begin, "BEGIN", path, line_no)?;
    let end = parse_position(end, "END", path, line_no)?;
    if begin > end {
        return Err(EventError::Inverted {
            path: path.to_path_buf(),
            line: line_no,
            begin,
            end,
        });
    }
    Ok(Row::Interval { chrom, begin, end })
}

fn parse_position(
    text: &str,
    field: &'static str,
    path: &Path,
    line_no: usize,
) -> Result<u64, EventError> {
    let invalid = || EventError::InvalidNumber {
        path: path.to_path_buf(),
        line: line_no,
        field,
        value: text.to_string(),
    };
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    text.parse().map_err(|_| invalid())
}
