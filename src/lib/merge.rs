//! Deterministic k-way merge of sorted call streams.
//!
//! Selects the minimum head among all non-empty inputs at every step. Ties
//! are broken by input-list order (the earlier-listed input wins), so the
//! merged order is reproducible regardless of how the inputs were produced
//! or timed.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use anyhow::Result;

use crate::keys::GenomicKey;

/// Boxed sorted input stream.
pub type SortedInput<T> = Box<dyn Iterator<Item = Result<T>>>;

/// Head-of-input entry in the merge heap.
struct MergeEntry<T> {
    key: GenomicKey,
    input: usize,
    item: T,
}

impl<T> PartialEq for MergeEntry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.input == other.input
    }
}

impl<T> Eq for MergeEntry<T> {}

impl<T> PartialOrd for MergeEntry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for MergeEntry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Earlier-listed input wins ties for reproducible output.
        self.key.cmp(&other.key).then_with(|| self.input.cmp(&other.input))
    }
}

/// Merges N sorted streams into one sorted stream.
pub struct MergeSortedIterator<T, F>
where
    F: Fn(&T) -> GenomicKey,
{
    inputs: Vec<SortedInput<T>>,
    key_of: F,
    heap: BinaryHeap<Reverse<MergeEntry<T>>>,
    initialized: bool,
    /// Refill failure held back so the item popped alongside it is not lost.
    pending_err: Option<anyhow::Error>,
    poisoned: bool,
}

impl<T, F> MergeSortedIterator<T, F>
where
    F: Fn(&T) -> GenomicKey,
{
    /// Merge `inputs` (each individually sorted by `key_of`).
    pub fn new(inputs: Vec<SortedInput<T>>, key_of: F) -> Self {
        Self {
            inputs,
            key_of,
            heap: BinaryHeap::new(),
            initialized: false,
            pending_err: None,
            poisoned: false,
        }
    }

    /// Pull the next item from `input` into the heap, if any.
    fn refill(&mut self, input: usize) -> Result<()> {
        if let Some(result) = self.inputs[input].next() {
            let item = result?;
            let key = (self.key_of)(&item);
            self.heap.push(Reverse(MergeEntry { key, input, item }));
        }
        Ok(())
    }
}

impl<T, F> Iterator for MergeSortedIterator<T, F>
where
    F: Fn(&T) -> GenomicKey,
{
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.poisoned {
            return None;
        }
        if let Some(e) = self.pending_err.take() {
            self.poisoned = true;
            return Some(Err(e));
        }
        if !self.initialized {
            self.initialized = true;
            for input in 0..self.inputs.len() {
                if let Err(e) = self.refill(input) {
                    self.poisoned = true;
                    return Some(Err(e));
                }
            }
        }

        let Reverse(entry) = self.heap.pop()?;
        if let Err(e) = self.refill(entry.input) {
            self.pending_err = Some(e);
        }
        Some(Ok(entry.item))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(items: Vec<(u32, i64, &'static str)>) -> SortedInput<(u32, i64, &'static str)> {
        Box::new(items.into_iter().map(Ok))
    }

    fn key_of(item: &(u32, i64, &'static str)) -> GenomicKey {
        GenomicKey::new(item.0, item.1)
    }

    fn merge_all(
        inputs: Vec<SortedInput<(u32, i64, &'static str)>>,
    ) -> Vec<(u32, i64, &'static str)> {
        MergeSortedIterator::new(inputs, key_of).map(Result::unwrap).collect()
    }

    #[test]
    fn test_merge_two_streams() {
        let out = merge_all(vec![
            input(vec![(0, 1, "a"), (0, 5, "a"), (1, 2, "a")]),
            input(vec![(0, 2, "b"), (0, 9, "b"), (1, 1, "b")]),
        ]);
        let keys: Vec<(u32, i64)> = out.iter().map(|i| (i.0, i.1)).collect();
        assert_eq!(keys, vec![(0, 1), (0, 2), (0, 5), (0, 9), (1, 1), (1, 2)]);
    }

    #[test]
    fn test_ties_go_to_earlier_input() {
        let out = merge_all(vec![
            input(vec![(0, 5, "first"), (0, 7, "first")]),
            input(vec![(0, 5, "second"), (0, 7, "second")]),
        ]);
        let labels: Vec<&str> = out.iter().map(|i| i.2).collect();
        assert_eq!(labels, vec!["first", "second", "first", "second"]);
    }

    #[test]
    fn test_deterministic_across_runs() {
        let make = || {
            vec![
                input(vec![(0, 1, "a"), (0, 3, "a"), (0, 3, "a2")]),
                input(vec![(0, 1, "b"), (0, 3, "b")]),
                input(vec![(0, 2, "c")]),
            ]
        };
        let first = merge_all(make());
        let second = merge_all(make());
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_and_exhausted_inputs() {
        let out = merge_all(vec![input(vec![]), input(vec![(0, 1, "b")]), input(vec![])]);
        assert_eq!(out, vec![(0, 1, "b")]);
        assert!(merge_all(vec![]).is_empty());
    }

    #[test]
    fn test_error_propagates_and_poisons() {
        let failing: SortedInput<(u32, i64, &'static str)> = Box::new(
            vec![Ok((0, 1, "a")), Err(anyhow::anyhow!("read failed"))].into_iter(),
        );
        let mut iter = MergeSortedIterator::new(vec![failing], key_of);
        assert_eq!(iter.next().unwrap().unwrap(), (0, 1, "a"));
        assert!(iter.next().unwrap().is_err());
        assert!(iter.next().is_none());
    }
}
