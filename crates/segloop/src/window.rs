// Retained window: the bounded, index-ordered queue of segments currently on disk.

use std::collections::VecDeque;

use crate::segment::Segment;

/// Bounded FIFO of retained segments, oldest first.
///
/// Indices are strictly increasing front to back. Pushing past capacity evicts from
/// the front, so the window is always a suffix of the successfully fetched segments.
#[derive(Debug, Clone)]
pub struct RetainedWindow {
    capacity: usize,
    segments: VecDeque<Segment>,
}

impl RetainedWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            segments: VecDeque::with_capacity(capacity + 1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.segments.len() >= self.capacity
    }

    /// Media sequence of the playlist: the oldest retained index.
    pub fn first_sequence(&self) -> Option<u64> {
        self.segments.front().map(|s| s.index)
    }

    pub fn last_index(&self) -> Option<u64> {
        self.segments.back().map(|s| s.index)
    }

    pub fn indices(&self) -> Vec<u64> {
        self.segments.iter().map(|s| s.index).collect()
    }

    /// Copy of the current contents in index order, handed to the manifest writer.
    pub fn snapshot(&self) -> Vec<Segment> {
        self.segments.iter().cloned().collect()
    }

    /// Append a newly written segment and return whatever overflowed, oldest first.
    ///
    /// The returned segments are no longer part of the window; their files are the
    /// caller's to delete.
    pub fn push(&mut self, segment: Segment) -> Vec<Segment> {
        debug_assert!(
            self.last_index().is_none_or(|last| segment.index > last),
            "segment {} pushed after {:?}",
            segment.index,
            self.last_index()
        );
        self.segments.push_back(segment);

        let mut evicted = Vec::new();
        while self.segments.len() > self.capacity {
            if let Some(oldest) = self.segments.pop_front() {
                evicted.push(oldest);
            }
        }
        evicted
    }
}
