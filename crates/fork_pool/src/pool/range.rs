//! src/pool/range.rs
//!
//! The unit of work handed to one participant for one round.

use std::ops::Range;

/// Participant id of the thread that called `run`/`reduce`.
pub const CALLER: usize = 0;

/// A contiguous slice `[offset, offset + count)` of the index space,
/// assigned to a single participant.
///
/// Participant `0` is the calling thread; participant `i + 1` is worker `i`.
/// A range with `count == 0` means the participant sits the round out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WorkRange {
    pub offset: usize,
    pub count: usize,
    pub participant: usize,
}

impl WorkRange {
    pub const fn new(offset: usize, count: usize, participant: usize) -> Self {
        Self {
            offset,
            count,
            participant,
        }
    }

    /// An empty range owned by `participant`.
    pub const fn idle(participant: usize) -> Self {
        Self::new(0, 0, participant)
    }

    pub const fn is_idle(&self) -> bool {
        self.count == 0
    }

    /// One past the last index covered.
    pub const fn end(&self) -> usize {
        self.offset + self.count
    }

    pub const fn is_caller(&self) -> bool {
        self.participant == CALLER
    }

    /// The covered indices as a standard range, for slicing and iteration.
    pub fn indices(&self) -> Range<usize> {
        self.offset..self.end()
    }
}

impl From<WorkRange> for Range<usize> {
    fn from(range: WorkRange) -> Self {
        range.indices()
    }
}
