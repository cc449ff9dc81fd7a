//! src/pool/view.rs
//!
//! Checked splitting of a mutable buffer into per-participant chunks.
//!
//! `PartitionedView::split` refuses any set of ranges that overlaps, leaves a
//! gap, or runs past the end of the buffer. Each participant can then `take`
//! its own chunk exactly once from a shared reference, which is what a `Sync`
//! pool callback has to work with.
//!
//! ```ignore
//! let partition = pool.partition(data.len());
//! let view = PartitionedView::split(&mut data, partition.participants())?;
//! pool.run(|range| {
//!     let chunk = view.take(range).expect("one take per participant");
//!     chunk.iter_mut().for_each(|x| *x *= 2.0);
//! }, partition.total());
//! ```

use anyhow::{anyhow, bail, Result};
use std::collections::HashSet;
use std::sync::Mutex;

use super::common::lock;
use super::range::WorkRange;

struct Chunk<'a, T> {
    range: WorkRange,
    slice: Mutex<Option<&'a mut [T]>>,
}

/// A buffer split into disjoint chunks, one per participant.
pub struct PartitionedView<'a, T> {
    chunks: Vec<Chunk<'a, T>>,
    len: usize,
}

impl<'a, T> PartitionedView<'a, T> {
    /// Splits `data` along `ranges`.
    ///
    /// Non-empty ranges must tile `[0, data.len())` exactly; empty ranges get
    /// an empty chunk. Every participant id may appear once.
    pub fn split<I>(data: &'a mut [T], ranges: I) -> Result<Self>
    where
        I: IntoIterator<Item = WorkRange>,
    {
        let len = data.len();
        let mut ordered: Vec<WorkRange> = ranges.into_iter().collect();

        let mut participants = HashSet::with_capacity(ordered.len());
        for range in &ordered {
            if !participants.insert(range.participant) {
                bail!("participant {} is assigned more than one range", range.participant);
            }
        }

        ordered.sort_by_key(|range| (range.offset, range.count));

        let mut rest = data;
        let mut cursor = 0;
        let mut chunks = Vec::with_capacity(ordered.len());
        for range in ordered {
            if range.is_idle() {
                chunks.push(Chunk {
                    range,
                    slice: Mutex::new(Some(Default::default())),
                });
                continue;
            }
            if range.offset < cursor {
                bail!("range {:?} overlaps the previous range ending at {}", range, cursor);
            }
            if range.offset > cursor {
                bail!("gap [{}, {}) before range {:?}", cursor, range.offset, range);
            }
            if range.count > rest.len() {
                bail!("range {:?} runs past the end of a buffer of {} elements", range, len);
            }

            let (slice, tail) = std::mem::take(&mut rest).split_at_mut(range.count);
            rest = tail;
            cursor = range.end();
            chunks.push(Chunk {
                range,
                slice: Mutex::new(Some(slice)),
            });
        }

        if cursor != len {
            bail!("ranges cover [0, {}) of a buffer of {} elements", cursor, len);
        }

        Ok(Self { chunks, len })
    }

    /// Hands out the chunk for `range`. The range must be the one it was
    /// split with, and each chunk can be taken once.
    pub fn take(&self, range: WorkRange) -> Result<&'a mut [T]> {
        let chunk = self
            .chunks
            .iter()
            .find(|chunk| chunk.range.participant == range.participant)
            .ok_or_else(|| anyhow!("participant {} has no chunk", range.participant))?;

        if chunk.range != range {
            bail!(
                "participant {} asked for {:?} but was split {:?}",
                range.participant,
                range,
                chunk.range
            );
        }

        lock(&chunk.slice)
            .take()
            .ok_or_else(|| anyhow!("chunk for participant {} was already taken", range.participant))
    }

    /// Length of the underlying buffer.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn num_chunks(&self) -> usize {
        self.chunks.len()
    }
}
