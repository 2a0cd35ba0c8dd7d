//! Streaming interval join of variant calls against the sorted catalog.
//!
//! Calls arrive in (chromosome, position) order within one source, and the
//! catalog is sorted by (chromosome, begin, end). A single forward-only
//! [`EventCursor`] marks the leftmost event that could still contain a
//! later call. For each call the cursor first skips events that are
//! finished (earlier chromosome, or ending before the call), then every
//! event from the cursor onward with a begin at or before the call is
//! tested for containment. That scan does not move the cursor, so stacked
//! intervals covering one position all receive the call.
//!
//! Work per source is O(events + calls + matches).

use std::cmp::Ordering;

use thiserror::Error;

use crate::calls::{CallSource, CursorError};
use crate::chrom::compare_chromosomes;
use crate::depth::{
    parse_depth_token, Classification, DepthError, DepthPolicy, DepthRecorder, SinkError,
};
use crate::events::{Event, EventCatalog};

/// Errors that stop processing of a source.
#[derive(Debug, Error)]
pub enum MergeError {
    /// Variant source failed.
    #[error(transparent)]
    Source(#[from] CursorError),
    /// Depth token was malformed or out of range.
    #[error(transparent)]
    Depth(#[from] DepthError),
    /// Depth could not be recorded.
    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Forward-only position in the sorted event slice.
///
/// Valid for one source only; reset before the next one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventCursor {
    index: usize,
}

impl EventCursor {
    /// Cursor at the start of the catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the leftmost event that can still match.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Rewind to the start of the catalog.
    pub fn reset(&mut self) {
        self.index = 0;
    }

    /// Skip every event that no call at or after `(chrom, position)` can hit.
    pub fn advance(&mut self, events: &[Event], chrom: &str, position: u64) {
        while let Some(event) = events.get(self.index) {
            let finished = match compare_chromosomes(&event.chrom, chrom) {
                Ordering::Less => true,
                Ordering::Equal => event.end < position,
                Ordering::Greater => false,
            };
            if !finished {
                break;
            }
            self.index += 1;
        }
    }
}

/// Events from `start` onward that contain `(chrom, position)`, with their
/// catalog indices.
pub fn containing<'e, 'c>(
    events: &'e [Event],
    start: usize,
    chrom: &'c str,
    position: u64,
) -> impl Iterator<Item = (usize, &'e Event)> + 'c
where
    'e: 'c,
{
    events
        .get(start..)
        .unwrap_or_default()
        .iter()
        .enumerate()
        .map(move |(offset, event)| (start + offset, event))
        .take_while(move |(_, event)| &*event.chrom == chrom && event.begin <= position)
        .filter(move |(_, event)| position <= event.end)
}

/// Counters for one processed source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceStats {
    /// Calls read from the source.
    pub calls: u64,
    /// Calls contained in at least one event.
    pub matched_calls: u64,
    /// Depth values dispatched (one per containing event).
    pub values: u64,
}

/// Drives the catalog and one variant source in lockstep.
#[derive(Debug)]
pub struct MergeJoinEngine<'a> {
    events: &'a [Event],
    cursor: EventCursor,
    policy: DepthPolicy,
    last: SourceStats,
}

impl<'a> MergeJoinEngine<'a> {
    /// Engine over `catalog` applying `policy` to every dispatched depth.
    pub fn new(catalog: &'a EventCatalog, policy: DepthPolicy) -> Self {
        Self {
            events: catalog.events(),
            cursor: EventCursor::new(),
            policy,
            last: SourceStats::default(),
        }
    }

    /// Current cursor.
    pub fn cursor(&self) -> EventCursor {
        self.cursor
    }

    /// Counters of the most recent source, including one that failed part
    /// way through.
    pub fn last_stats(&self) -> SourceStats {
        self.last
    }

    /// Rewind the cursor for a new source.
    pub fn reset(&mut self) {
        self.cursor.reset();
    }

    /// Advance past finished events and return those containing the call.
    pub fn stab<'c>(
        &mut self,
        chrom: &'c str,
        position: u64,
    ) -> impl Iterator<Item = (usize, &'a Event)> + 'c
    where
        'a: 'c,
    {
        self.cursor.advance(self.events, chrom, position);
        containing(self.events, self.cursor.index(), chrom, position)
    }

    /// Stream every call of `source` (sample `sample_id`) into `recorder`.
    ///
    /// The cursor is reset first: sources are only sorted individually.
    pub fn process_source<S, R>(
        &mut self,
        sample_id: &str,
        source: &mut S,
        recorder: &mut R,
    ) -> Result<SourceStats, MergeError>
    where
        S: CallSource + ?Sized,
        R: DepthRecorder + ?Sized,
    {
        self.reset();
        let mut stats = SourceStats::default();
        let outcome = self.stream(sample_id, source, recorder, &mut stats);
        self.last = stats;
        outcome.map(|()| stats)
    }

    fn stream<S, R>(
        &mut self,
        sample_id: &str,
        source: &mut S,
        recorder: &mut R,
        stats: &mut SourceStats,
    ) -> Result<(), MergeError>
    where
        S: CallSource + ?Sized,
        R: DepthRecorder + ?Sized,
    {
        let policy = self.policy;
        while let Some(call) = source.next_call()? {
            stats.calls += 1;
            let raw = parse_depth_token(&call.sample)?;
            let mut matched = false;
            for (slot, event) in self.stab(&call.chrom, call.position) {
                let depth = policy.apply(raw)?;
                let class = Classification::of(sample_id, &event.sample_id);
                recorder.record(slot, event, class, depth)?;
                stats.values += 1;
                matched = true;
            }
            if matched {
                stats.matched_calls += 1;
            }
        }
        Ok(())
    }
}
