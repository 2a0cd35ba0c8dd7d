//! Sample identifiers recovered from file names.
//!
//! Event and VCF files carry the sample id in their name, e.g.
//! `combined-NWD294426-ad.vcf.xz`. A template such as
//! `combined-*-ad.vcf.xz` both enumerates the files (as a glob) and recovers
//! the sample id from each match (the text bound to `*`).
//!
//! `.` path segments are ignored on both sides when matching, since the glob
//! crate reports `./calls/*.vcf` matches as `calls/S1.vcf`.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;

/// Wildcard marker that binds the sample id.
pub const WILDCARD: char = '*';

/// Errors raised while validating a template or extracting a sample id.
#[derive(Debug, Error)]
pub enum SampleError {
    /// Template has no `*` to bind the sample id.
    #[error("expected '*' in glob pattern '{0}'")]
    NoWildcard(String),

    /// Template has more than one `*`.
    #[error("glob pattern '{0}' must contain exactly one '*'")]
    MultipleWildcards(String),

    /// Path does not have the template's literal prefix and suffix.
    #[error("path '{path}' does not match template '{template}'")]
    Mismatch {
        /// Template the path was matched against.
        template: String,
        /// Offending path.
        path: String,
    },

    /// Path is not valid UTF-8.
    #[error("path '{0}' is not valid UTF-8")]
    NonUtf8Path(String),

    /// Template is not a valid glob pattern.
    #[error("invalid glob pattern '{pattern}': {source}")]
    Pattern {
        /// Template text.
        pattern: String,
        /// Underlying glob error.
        source: glob::PatternError,
    },

    /// A glob match could not be inspected.
    #[error("cannot access glob match: {0}")]
    Glob(#[from] glob::GlobError),
}

/// A one-wildcard glob template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleTemplate {
    pattern: String,
    star: usize,
}

impl SampleTemplate {
    /// Validate `pattern`. No file I/O happens here.
    pub fn parse(pattern: impl Into<String>) -> Result<Self, SampleError> {
        let pattern = pattern.into();
        let mut stars = pattern.match_indices(WILDCARD).map(|(idx, _)| idx);
        let star = match stars.next() {
            Some(idx) => idx,
            None => return Err(SampleError::NoWildcard(pattern)),
        };
        if stars.next().is_some() {
            return Err(SampleError::MultipleWildcards(pattern));
        }
        Ok(Self { pattern, star })
    }

    /// Full glob pattern.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Literal text before the wildcard.
    pub fn prefix(&self) -> &str {
        &self.pattern[..self.star]
    }

    /// Literal text after the wildcard.
    pub fn suffix(&self) -> &str {
        &self.pattern[self.star + WILDCARD.len_utf8()..]
    }

    /// Paths matching the template, in the glob crate's sorted order.
    pub fn expand(&self) -> Result<Vec<PathBuf>, SampleError> {
        let paths = glob::glob(&self.pattern).map_err(|source| SampleError::Pattern {
            pattern: self.pattern.clone(),
            source,
        })?;
        let paths = paths.collect::<Result<Vec<_>, _>>()?;
        if paths.is_empty() {
            warn!(pattern = %self.pattern, "glob pattern matched no files");
        }
        Ok(paths)
    }

    /// Recover the sample id bound to the wildcard in `path`.
    ///
    /// The captured text is cut at the *first* occurrence of the suffix, so a
    /// sample id that itself contains the suffix text is truncated
    /// (`s-*-x.vcf` on `s-a-x-b-x.vcf` yields `a`).
    pub fn extract(&self, path: &Path) -> Result<String, SampleError> {
        let text = path
            .to_str()
            .ok_or_else(|| SampleError::NonUtf8Path(path.display().to_string()))?;
        self.extract_str(text)
    }

    /// String form of [`SampleTemplate::extract`].
    pub fn extract_str(&self, path: &str) -> Result<String, SampleError> {
        let mismatch = || SampleError::Mismatch {
            template: self.pattern.clone(),
            path: path.to_string(),
        };
        // The segment around `*` is literal text, not a path component.
        let prefix = drop_cur_dir(self.prefix(), false, true);
        let suffix = drop_cur_dir(self.suffix(), true, false);
        let normalized = drop_cur_dir(path, false, false);

        let rest = normalized.strip_prefix(&prefix).ok_or_else(mismatch)?;
        if suffix.is_empty() {
            return Ok(rest.to_string());
        }
        let end = rest.find(&suffix).ok_or_else(mismatch)?;
        Ok(rest[..end].to_string())
    }
}

/// Remove `.` segments from a `/`-separated path fragment. The first and last
/// segments are kept when they belong to a partial file name.
fn drop_cur_dir(text: &str, keep_first: bool, keep_last: bool) -> String {
    let segments: Vec<&str> = text.split('/').collect();
    let last = segments.len() - 1;
    segments
        .iter()
        .enumerate()
        .filter(|&(idx, segment)| {
            *segment != "." || (keep_first && idx == 0) || (keep_last && idx == last)
        })
        .map(|(_, segment)| *segment)
        .collect::<Vec<_>>()
        .join("/")
}
