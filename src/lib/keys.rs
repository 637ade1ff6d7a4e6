//! Sort key types for call-stream ordering.
//!
//! All ordering in the transform pipeline is over [`GenomicKey`]: contig
//! index first, then position. Contig comparisons always use the
//! dictionary-resolved integer index, never raw names, so two keys from the
//! same dictionary are totally ordered.
//!
//! A key is only meaningful within the pipeline stage that produced it: the
//! evidence-start key of a breakend call and its nominal-position key must
//! never be compared against each other without an explicit re-sort in
//! between.

use std::cmp::Ordering;

/// Genomic coordinate sort key.
///
/// Sort order: contig index, then position. Tie-breaking between equal keys
/// is the responsibility of the consuming stage (insertion order in the
/// windowed sorter, input-list order in the merge).
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub struct GenomicKey {
    /// Dictionary-resolved contig index.
    pub tid: u32,
    /// 1-based position on the contig.
    pub pos: i64,
}

impl GenomicKey {
    /// Create a new key.
    #[must_use]
    pub fn new(tid: u32, pos: i64) -> Self {
        Self { tid, pos }
    }

    /// True if this key lies strictly beyond `other` by more than `window`.
    ///
    /// Used by the windowed sorter to decide whether the upstream frontier
    /// has advanced far enough that `other` can never be undercut again: a
    /// key on a later contig is beyond any window, a key on the same contig
    /// must exceed `other.pos + window`.
    #[must_use]
    pub fn is_beyond_window(&self, other: &GenomicKey, window: i64) -> bool {
        self.tid > other.tid || (self.tid == other.tid && self.pos > other.pos + window)
    }
}

impl Ord for GenomicKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.tid.cmp(&other.tid).then_with(|| self.pos.cmp(&other.pos))
    }
}

impl PartialOrd for GenomicKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_by_tid_then_pos() {
        assert!(GenomicKey::new(0, 100) < GenomicKey::new(0, 200));
        assert!(GenomicKey::new(0, 1_000_000) < GenomicKey::new(1, 1));
        assert_eq!(GenomicKey::new(2, 5), GenomicKey::new(2, 5));
    }

    #[test]
    fn test_is_beyond_window_same_contig() {
        let anchor = GenomicKey::new(0, 100);
        assert!(!GenomicKey::new(0, 150).is_beyond_window(&anchor, 50));
        assert!(GenomicKey::new(0, 151).is_beyond_window(&anchor, 50));
    }

    #[test]
    fn test_is_beyond_window_contig_change() {
        let anchor = GenomicKey::new(0, 1_000_000);
        // Any key on a later contig is beyond the window.
        assert!(GenomicKey::new(1, 1).is_beyond_window(&anchor, 1_000_000));
        // An earlier contig never is.
        assert!(!GenomicKey::new(0, 1).is_beyond_window(&GenomicKey::new(1, 1), 0));
    }
}
