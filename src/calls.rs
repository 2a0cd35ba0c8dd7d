//! Sequential readers over single-sample VCF files.
//!
//! The cursor yields one [`VariantCall`] at a time and never buffers more
//! than the current line. Transport is chosen from the file suffix:
//! `.xz` files are piped through an external decompressor, `.gz` files are
//! decoded in-process, anything else is read directly.

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};

use flate2::read::MultiGzDecoder;
use thiserror::Error;
use tracing::debug;

/// Columns in a single-sample VCF data line.
const VCF_COLUMNS: usize = 10;
/// Index of the sample column.
const SAMPLE_COLUMN: usize = 9;

/// One VCF data line reduced to what depth attribution needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantCall {
    /// Chromosome/contig name.
    pub chrom: String,
    /// 1-based position.
    pub position: u64,
    /// Raw sample column, e.g. `0/1:12,9:21`.
    pub sample: String,
}

impl VariantCall {
    /// Construct a new call.
    pub fn new(chrom: impl Into<String>, position: u64, sample: impl Into<String>) -> Self {
        Self {
            chrom: chrom.into(),
            position,
            sample: sample.into(),
        }
    }
}

/// Errors raised while opening or reading a variant source.
#[derive(Debug, Error)]
pub enum CursorError {
    /// Source file could not be opened.
    #[error("cannot open {path}: {source}")]
    Open {
        /// Source file.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Decompressor process could not be started.
    #[error("cannot start '{command}': {source}")]
    Spawn {
        /// Command line that failed.
        command: String,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Reading the stream failed before end of input.
    #[error("error reading {path}: {source}")]
    Read {
        /// Source file.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Data line is not a well-formed single-sample call.
    #[error("{path}:{line}: {reason}")]
    Malformed {
        /// Source file.
        path: PathBuf,
        /// 1-based line number in the decompressed stream.
        line: usize,
        /// What was wrong with the line.
        #[source]
        reason: CallParseError,
    },

    /// Decompressor exited unsuccessfully.
    #[error("'{command}' exited with {status}")]
    Decompressor {
        /// Command line of the decompressor.
        command: String,
        /// Exit status it reported.
        status: ExitStatus,
    },
}

impl CursorError {
    /// Whether this is a failure while reading an opened source, as opposed to
    /// failing to open it at all.
    pub fn is_read_failure(&self) -> bool {
        matches!(
            self,
            CursorError::Read { .. }
                | CursorError::Malformed { .. }
                | CursorError::Decompressor { .. }
        )
    }
}

/// Why a VCF data line was rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CallParseError {
    /// Line does not have exactly ten tab-separated columns.
    #[error("expected {expected} tab-separated columns, found {found}")]
    ColumnCount {
        /// Required column count.
        expected: usize,
        /// Columns present.
        found: usize,
    },

    /// CHROM column is empty.
    #[error("empty CHROM")]
    EmptyChrom,

    /// POS is not a positive decimal integer.
    #[error("invalid POS '{0}'")]
    InvalidPosition(String),
}

/// Forward-only supplier of variant calls.
pub trait CallSource {
    /// Next call, or `Ok(None)` at a clean end of input.
    fn next_call(&mut self) -> Result<Option<VariantCall>, CursorError>;
}

impl CallSource for std::vec::IntoIter<VariantCall> {
    fn next_call(&mut self) -> Result<Option<VariantCall>, CursorError> {
        Ok(self.next())
    }
}

/// How bytes are pulled from a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// Read the file directly.
    Plain,
    /// Decode gzip/bgzip in-process.
    Gzip,
    /// Pipe the file through an external decompressor.
    Filter,
}

impl Transport {
    /// Select a transport from the file suffix.
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("xz") => Transport::Filter,
            Some("gz") => Transport::Gzip,
            _ => Transport::Plain,
        }
    }
}

struct FilterProcess {
    child: Child,
    command: String,
    finished: bool,
}

/// Streaming reader over one VCF source.
///
/// A decompressor child is reaped when the stream ends and killed if the
/// cursor is dropped first, so no exit path leaks the process.
pub struct VariantCallCursor {
    path: PathBuf,
    transport: Transport,
    reader: Box<dyn BufRead>,
    process: Option<FilterProcess>,
    line: String,
    line_no: usize,
}

impl fmt::Debug for VariantCallCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariantCallCursor")
            .field("path", &self.path)
            .field("transport", &self.transport)
            .field("line_no", &self.line_no)
            .finish()
    }
}

impl VariantCallCursor {
    /// Open `path`, using `decompressor` for `.xz` files.
    pub fn open(path: &Path, decompressor: &str) -> Result<Self, CursorError> {
        let open_err = |source| CursorError::Open {
            path: path.to_path_buf(),
            source,
        };
        let transport = Transport::for_path(path);
        let (reader, process): (Box<dyn BufRead>, _) = match transport {
            Transport::Plain => {
                let file = File::open(path).map_err(open_err)?;
                (Box::new(BufReader::new(file)), None)
            }
            Transport::Gzip => {
                let file = File::open(path).map_err(open_err)?;
                (Box::new(BufReader::new(MultiGzDecoder::new(file))), None)
            }
            Transport::Filter => {
                // Surface a missing file as an open failure rather than a
                // decompressor exit status.
                File::open(path).map_err(open_err)?;
                let command = format!("{} {}", decompressor, path.display());
                let mut child = Command::new(decompressor)
                    .arg(path)
                    .stdin(Stdio::null())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::inherit())
                    .spawn()
                    .map_err(|source| CursorError::Spawn {
                        command: command.clone(),
                        source,
                    })?;
                let stdout = match child.stdout.take() {
                    Some(stdout) => stdout,
                    None => {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(CursorError::Spawn {
                            command,
                            source: io::Error::new(io::ErrorKind::Other, "stdout not captured"),
                        });
                    }
                };
                debug!(command = %command, "started decompressor");
                let process = FilterProcess {
                    child,
                    command,
                    finished: false,
                };
                (Box::new(BufReader::new(stdout)), Some(process))
            }
        };

        Ok(Self {
            path: path.to_path_buf(),
            transport,
            reader,
            process,
            line: String::with_capacity(256),
            line_no: 0,
        })
    }

    /// Source path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Transport in use.
    pub fn transport(&self) -> Transport {
        self.transport
    }

    /// Process id of the decompressor, if one was started.
    pub fn process_id(&self) -> Option<u32> {
        self.process.as_ref().map(|process| process.child.id())
    }

    fn ensure_process_completed(&mut self) -> Result<(), CursorError> {
        let Some(process) = self.process.as_mut() else {
            return Ok(());
        };
        if process.finished {
            return Ok(());
        }
        let status = process.child.wait().map_err(|source| CursorError::Read {
            path: self.path.clone(),
            source,
        })?;
        process.finished = true;
        debug!(command = %process.command, code = ?status.code(), "decompressor finished");
        if !status.success() {
            return Err(CursorError::Decompressor {
                command: process.command.clone(),
                status,
            });
        }
        Ok(())
    }
}

impl CallSource for VariantCallCursor {
    fn next_call(&mut self) -> Result<Option<VariantCall>, CursorError> {
        loop {
            self.line.clear();
            let read = self
                .reader
                .read_line(&mut self.line)
                .map_err(|source| CursorError::Read {
                    path: self.path.clone(),
                    source,
                })?;
            if read == 0 {
                self.ensure_process_completed()?;
                return Ok(None);
            }
            self.line_no += 1;
            let line = self.line.trim_end_matches(['\n', '\r']);
            if line.starts_with('#') {
                continue;
            }
            return parse_call(line)
                .map(Some)
                .map_err(|reason| CursorError::Malformed {
                    path: self.path.clone(),
                    line: self.line_no,
                    reason,
                });
        }
    }
}

impl Drop for VariantCallCursor {
    fn drop(&mut self) {
        let Some(process) = self.process.as_mut() else {
            return;
        };
        if process.finished {
            return;
        }
        match process.child.try_wait() {
            Ok(Some(_)) => {}
            Ok(None) | Err(_) => {
                let _ = process.child.kill();
                let _ = process.child.wait();
            }
        }
        process.finished = true;
    }
}

/// Parse one tab-separated single-sample VCF data line.
pub fn parse_call(line: &str) -> Result<VariantCall, CallParseError> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != VCF_COLUMNS {
        return Err(CallParseError::ColumnCount {
            expected: VCF_COLUMNS,
            found: fields.len(),
        });
    }
    let chrom = fields[0];
    if chrom.is_empty() {
        return Err(CallParseError::EmptyChrom);
    }
    let pos = fields[1];
    let position = match pos.parse::<u64>() {
        Ok(position) if position > 0 && pos.bytes().all(|b| b.is_ascii_digit()) => position,
        _ => return Err(CallParseError::InvalidPosition(pos.to_string())),
    };
    Ok(VariantCall::new(chrom, position, fields[SAMPLE_COLUMN]))
}
