//! Windowed reorder buffer for approximately-sorted call streams.
//!
//! Assembly relocates calls by at most the physical evidence span W, so a
//! stream that was sorted before assembly is still W-disordered afterwards:
//! any two out-of-order items differ by at most W under the sort key. This
//! module restores strict sortedness with O(W) memory instead of buffering
//! the whole stream.
//!
//! Items are buffered in a min-heap keyed by (sort key, insertion sequence).
//! The minimum is released only once the upstream frontier is known to have
//! advanced beyond (minimum key + W), or the upstream is exhausted; earlier
//! release could still be undercut by an in-window straggler. An incoming
//! item whose key is below the last released key proves the disorder
//! assumption was violated, which is a fatal ordering-violation error,
//! never a silent mis-ordering.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use anyhow::Result;

use crate::errors::SvasmError;
use crate::keys::GenomicKey;

/// A buffered item awaiting release.
struct Pending<T> {
    key: GenomicKey,
    /// Insertion sequence; keeps equal keys in arrival order.
    seq: u64,
    item: T,
}

impl<T> PartialEq for Pending<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.seq == other.seq
    }
}

impl<T> Eq for Pending<T> {}

impl<T> PartialOrd for Pending<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Pending<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key).then_with(|| self.seq.cmp(&other.seq))
    }
}

/// Iterator adapter that converts a W-disordered stream into a sorted one.
pub struct WindowedSortingIterator<T, I, F>
where
    I: Iterator<Item = Result<T>>,
    F: Fn(&T) -> GenomicKey,
{
    upstream: I,
    key_of: F,
    window: i64,
    heap: BinaryHeap<Reverse<Pending<T>>>,
    next_seq: u64,
    /// Maximum key drawn from upstream so far.
    frontier: Option<GenomicKey>,
    /// Key of the most recently released item.
    last_released: Option<GenomicKey>,
    upstream_done: bool,
    poisoned: bool,
}

impl<T, I, F> WindowedSortingIterator<T, I, F>
where
    I: Iterator<Item = Result<T>>,
    F: Fn(&T) -> GenomicKey,
{
    /// Wrap `upstream`, sorting by `key_of` under disorder bound `window`.
    pub fn new(upstream: I, window: i64, key_of: F) -> Self {
        Self {
            upstream,
            key_of,
            window,
            heap: BinaryHeap::new(),
            next_seq: 0,
            frontier: None,
            last_released: None,
            upstream_done: false,
            poisoned: false,
        }
    }

    /// True if the buffered minimum can be released without risking a
    /// smaller in-window arrival.
    fn can_release(&self, min_key: &GenomicKey) -> bool {
        self.upstream_done
            || self
                .frontier
                .is_some_and(|frontier| frontier.is_beyond_window(min_key, self.window))
    }

    fn release_min(&mut self) -> T {
        let Reverse(pending) = self.heap.pop().expect("release_min on empty heap");
        self.last_released = Some(pending.key);
        pending.item
    }
}

impl<T, I, F> Iterator for WindowedSortingIterator<T, I, F>
where
    I: Iterator<Item = Result<T>>,
    F: Fn(&T) -> GenomicKey,
{
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.poisoned {
            return None;
        }
        loop {
            let min_key = self.heap.peek().map(|Reverse(pending)| pending.key);
            match min_key {
                Some(key) if self.can_release(&key) => {
                    return Some(Ok(self.release_min()));
                }
                None if self.upstream_done => return None,
                _ => {}
            }

            match self.upstream.next() {
                None => self.upstream_done = true,
                Some(Err(e)) => {
                    self.poisoned = true;
                    return Some(Err(e));
                }
                Some(Ok(item)) => {
                    let key = (self.key_of)(&item);
                    if let Some(released) = self.last_released {
                        if key < released {
                            self.poisoned = true;
                            return Some(Err(SvasmError::OrderingViolation {
                                tid: key.tid,
                                position: key.pos,
                                released_tid: released.tid,
                                released_position: released.pos,
                                window: self.window,
                            }
                            .into()));
                        }
                    }
                    self.frontier =
                        Some(self.frontier.map_or(key, |frontier| frontier.max(key)));
                    self.heap.push(Reverse(Pending { key, seq: self.next_seq, item }));
                    self.next_seq += 1;
                }
            }
        }
    }
}
