//! Depth values and the per-event depth sinks.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::events::Event;

/// Largest depth representable in the 16-bit depth type.
pub const DEPTH_MAX: u64 = u16::MAX as u64;

/// Errors raised while extracting or bounding a depth value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DepthError {
    /// Sample column has no `:` before the depth.
    #[error("':' expected in sample data, got '{0}'")]
    MissingSeparator(String),

    /// Text after the last `:` is not a decimal integer.
    #[error("expected sample to end in :depth, got '{0}'")]
    InvalidDepth(String),

    /// Depth exceeds the 16-bit range under the reject policy.
    #[error("depth {value} exceeds maximum {max}")]
    Overflow {
        /// Parsed depth.
        value: u64,
        /// Largest accepted depth.
        max: u64,
    },
}

/// Extract the depth token: the integer after the last `:` of the sample column.
pub fn parse_depth_token(sample: &str) -> Result<u64, DepthError> {
    let (_, token) = sample
        .rsplit_once(':')
        .ok_or_else(|| DepthError::MissingSeparator(sample.to_string()))?;
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DepthError::InvalidDepth(sample.to_string()));
    }
    token
        .parse()
        .map_err(|_| DepthError::InvalidDepth(sample.to_string()))
}

/// What to do with depths above [`DEPTH_MAX`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DepthPolicy {
    /// Fail the run with a data error.
    #[default]
    Reject,
    /// Clamp to [`DEPTH_MAX`].
    Saturate,
    /// Record the full value.
    Widen,
}

impl DepthPolicy {
    /// Bound `raw` according to the policy.
    pub fn apply(self, raw: u64) -> Result<u64, DepthError> {
        match self {
            DepthPolicy::Widen => Ok(raw),
            DepthPolicy::Saturate => Ok(raw.min(DEPTH_MAX)),
            DepthPolicy::Reject if raw > DEPTH_MAX => Err(DepthError::Overflow {
                value: raw,
                max: DEPTH_MAX,
            }),
            DepthPolicy::Reject => Ok(raw),
        }
    }
}

/// Whether a depth came from the event's own sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    /// Call sample equals the event's owning sample.
    Same,
    /// Call came from any other sample.
    Others,
}

impl Classification {
    /// Classify a call from `call_sample` against an event owned by `event_sample`.
    pub fn of(call_sample: &str, event_sample: &str) -> Self {
        if call_sample == event_sample {
            Classification::Same
        } else {
            Classification::Others
        }
    }

    /// File name label.
    pub fn label(self) -> &'static str {
        match self {
            Classification::Same => "same",
            Classification::Others => "others",
        }
    }
}

/// Path of the sink file for `event` and `class` under `dir`.
pub fn sink_path(dir: &Path, event: &Event, class: Classification) -> PathBuf {
    dir.join(format!(
        "depths-{}-{}-{}-{}-{}.txt",
        event.sample_id,
        event.chrom,
        event.begin,
        event.end,
        class.label()
    ))
}

/// Errors raised while writing depth files.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Output directory could not be created.
    #[error("cannot create directory {path}: {source}")]
    CreateDir {
        /// Directory path.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Depth file could not be created.
    #[error("could not open {path}: {source}")]
    Create {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Depth file left by an earlier run could not be removed.
    #[error("cannot remove stale {path}: {source}")]
    Remove {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Writing or flushing a depth file failed.
    #[error("error writing {path}: {source}")]
    Write {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
}

/// Destination for classified depth values.
pub trait DepthRecorder {
    /// Record one depth for `event` in its `class` sink.
    ///
    /// `slot` is the event's index in the catalog and identifies it for the
    /// whole run.
    fn record(
        &mut self,
        slot: usize,
        event: &Event,
        class: Classification,
        depth: u64,
    ) -> Result<(), SinkError>;
}

/// Totals reported when a sink is closed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkReport {
    /// Depth files written.
    pub files: usize,
    /// Depth values recorded across all files.
    pub values: u64,
}

/// Writes one depth per line into per-event, per-classification files.
///
/// Files are created on the first value for their `(event, class)` pair and
/// stay open until [`DepthSink::close`]. Events with identical keys share a
/// file instead of truncating each other.
#[derive(Debug)]
pub struct DepthSink {
    dir: PathBuf,
    dir_ready: bool,
    slots: HashMap<(usize, Classification), usize>,
    by_path: HashMap<PathBuf, usize>,
    files: Vec<(PathBuf, BufWriter<File>)>,
    values: u64,
}

impl DepthSink {
    /// Sink writing under `dir`. Nothing is created until the first value.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            dir_ready: false,
            slots: HashMap::new(),
            by_path: HashMap::new(),
            files: Vec::new(),
            values: 0,
        }
    }

    /// Output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Remove depth files of `events` left in the directory by an earlier
    /// run, so pairs that receive no value this run read back as empty.
    ///
    /// Call before the first value is recorded. Returns the number of files
    /// removed.
    pub fn clear_previous(&self, events: &[Event]) -> Result<usize, SinkError> {
        let mut removed = 0;
        for event in events {
            for class in [Classification::Same, Classification::Others] {
                let path = sink_path(&self.dir, event, class);
                match fs::remove_file(&path) {
                    Ok(()) => removed += 1,
                    Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                    Err(source) => return Err(SinkError::Remove { path, source }),
                }
            }
        }
        if removed > 0 {
            debug!(dir = %self.dir.display(), removed, "removed stale depth files");
        }
        Ok(removed)
    }

    fn ensure_dir(&mut self) -> Result<(), SinkError> {
        if !self.dir_ready {
            fs::create_dir_all(&self.dir).map_err(|source| SinkError::CreateDir {
                path: self.dir.clone(),
                source,
            })?;
            self.dir_ready = true;
        }
        Ok(())
    }

    fn open(&mut self, event: &Event, class: Classification) -> Result<usize, SinkError> {
        let path = sink_path(&self.dir, event, class);
        if let Some(&idx) = self.by_path.get(&path) {
            return Ok(idx);
        }
        self.ensure_dir()?;
        let file = File::create(&path).map_err(|source| SinkError::Create {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), "opened depth file");
        let idx = self.files.len();
        self.by_path.insert(path.clone(), idx);
        self.files.push((path, BufWriter::new(file)));
        Ok(idx)
    }

    /// Flush and close every open file.
    pub fn close(self) -> Result<SinkReport, SinkError> {
        let files = self.files.len();
        for (path, mut writer) in self.files {
            writer
                .flush()
                .map_err(|source| SinkError::Write { path, source })?;
        }
        Ok(SinkReport {
            files,
            values: self.values,
        })
    }
}

impl DepthRecorder for DepthSink {
    fn record(
        &mut self,
        slot: usize,
        event: &Event,
        class: Classification,
        depth: u64,
    ) -> Result<(), SinkError> {
        let idx = match self.slots.get(&(slot, class)) {
            Some(&idx) => idx,
            None => {
                let idx = self.open(event, class)?;
                self.slots.insert((slot, class), idx);
                idx
            }
        };
        let (path, writer) = &mut self.files[idx];
        writeln!(writer, "{}", depth).map_err(|source| SinkError::Write {
            path: path.clone(),
            source,
        })?;
        self.values += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_is_text_after_last_colon() {
        assert_eq!(parse_depth_token("0/1:12,9:21"), Ok(21));
        assert_eq!(parse_depth_token(":0"), Ok(0));
    }

    #[test]
    fn malformed_depth_tokens_are_rejected() {
        assert_eq!(
            parse_depth_token("0/1"),
            Err(DepthError::MissingSeparator("0/1".to_string()))
        );
        for sample in ["0/1:", "0/1:.", "0/1:12x", "0/1:-3", "0/1:+3"] {
            assert!(
                matches!(parse_depth_token(sample), Err(DepthError::InvalidDepth(_))),
                "{:?} accepted",
                sample
            );
        }
    }

    #[test]
    fn overflow_policies() {
        assert_eq!(DepthPolicy::Reject.apply(65_535), Ok(65_535));
        assert_eq!(
            DepthPolicy::Reject.apply(65_536),
            Err(DepthError::Overflow { value: 65_536, max: DEPTH_MAX })
        );
        assert_eq!(DepthPolicy::Saturate.apply(70_000), Ok(65_535));
        assert_eq!(DepthPolicy::Widen.apply(70_000), Ok(70_000));
    }

    #[test]
    fn classification_is_exact_match() {
        assert_eq!(Classification::of("S1", "S1"), Classification::Same);
        assert_eq!(Classification::of("S1", "s1"), Classification::Others);
        assert_eq!(Classification::of("S10", "S1"), Classification::Others);
    }

    #[test]
    fn sink_names_files_deterministically() {
        let event = Event::new("chr1", 1000, 2000, "S1");
        assert_eq!(
            sink_path(Path::new("Depths"), &event, Classification::Others),
            PathBuf::from("Depths/depths-S1-chr1-1000-2000-others.txt")
        );
    }

    #[test]
    fn sink_opens_lazily_and_appends_in_order() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("Depths");
        let event = Event::new("chr1", 1, 10, "S1");

        let mut sink = DepthSink::new(&dir);
        assert!(!dir.exists());
        sink.record(0, &event, Classification::Same, 7).unwrap();
        sink.record(0, &event, Classification::Same, 3).unwrap();
        sink.record(0, &event, Classification::Same, 7).unwrap();
        let report = sink.close().unwrap();

        assert_eq!(report, SinkReport { files: 1, values: 3 });
        let same = fs::read_to_string(sink_path(&dir, &event, Classification::Same)).unwrap();
        assert_eq!(same, "7\n3\n7\n");
        assert!(!sink_path(&dir, &event, Classification::Others).exists());
    }

    #[test]
    fn unwritable_directory_is_reported() {
        let root = tempfile::tempdir().unwrap();
        let blocker = root.path().join("file");
        fs::write(&blocker, "").unwrap();

        let mut sink = DepthSink::new(blocker.join("Depths"));
        let err = sink
            .record(0, &Event::new("chr1", 1, 2, "S1"), Classification::Same, 1)
            .unwrap_err();
        assert!(matches!(err, SinkError::CreateDir { .. }));
    }

    #[test]
    fn duplicate_events_share_one_file() {
        let root = tempfile::tempdir().unwrap();
        let event = Event::new("chr1", 1, 10, "S1");

        let mut sink = DepthSink::new(root.path());
        sink.record(0, &event, Classification::Others, 4).unwrap();
        sink.record(1, &event.clone(), Classification::Others, 5).unwrap();
        sink.record(0, &event, Classification::Others, 6).unwrap();
        let report = sink.close().unwrap();

        assert_eq!(report, SinkReport { files: 1, values: 3 });
        let others =
            fs::read_to_string(sink_path(root.path(), &event, Classification::Others)).unwrap();
        assert_eq!(others, "4\n5\n6\n");
    }

    #[test]
    fn clear_previous_removes_only_catalog_files() {
        let root = tempfile::tempdir().unwrap();
        let kept = Event::new("chr2", 5, 6, "S9");
        let event = Event::new("chr1", 1, 10, "S1");
        let stale = sink_path(root.path(), &event, Classification::Same);
        let other = sink_path(root.path(), &kept, Classification::Same);
        fs::write(&stale, "42\n").unwrap();
        fs::write(&other, "1\n").unwrap();

        let sink = DepthSink::new(root.path());
        assert_eq!(sink.clear_previous(std::slice::from_ref(&event)).unwrap(), 1);
        assert!(!stale.exists());
        assert!(other.exists());
        assert_eq!(sink.clear_previous(&[event]).unwrap(), 0);
    }

    #[test]
    fn clear_previous_tolerates_missing_directory() {
        let root = tempfile::tempdir().unwrap();
        let sink = DepthSink::new(root.path().join("absent"));
        assert_eq!(sink.clear_previous(&[Event::new("chr1", 1, 2, "S1")]).unwrap(), 0);
    }
}
