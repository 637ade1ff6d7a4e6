//! Variant call model: the two-case breakend/other tagged variant.
//!
//! Call-kind dispatch happens once at ingestion: rows tagged `breakend` are
//! fully parsed into [`BreakendCall`] and may be rewritten by the transform
//! pipeline; every other row is an [`OtherCall`] whose original text is
//! carried through verbatim, with only enough parsed (contig, position) to
//! give it a sort key.

use bstr::BString;

use crate::breakend::BreakendSummary;
use crate::keys::GenomicKey;

/// A breakend call: nominal position plus summary plus optional assembly.
///
/// The assembly fields (`anchor_seq`, `breakpoint_seq`, `breakpoint_qual`,
/// `evidence_id`) are empty on calls read from a file and populated by the
/// annotate transform. Invariant: `breakpoint_qual.len() ==
/// breakpoint_seq.len()`.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakendCall {
    /// Nominal call position (the record's own coordinate).
    pub pos: i64,
    /// Breakend summary (interval, direction, evidence attributes).
    pub summary: BreakendSummary,
    /// Deterministic evidence-id, if assembled.
    pub evidence_id: Option<String>,
    /// Aligned, reference-consistent portion of the assembled contig.
    pub anchor_seq: Vec<u8>,
    /// Novel sequence assembled across the junction.
    pub breakpoint_seq: Vec<u8>,
    /// Per-base quality of the breakpoint sequence.
    pub breakpoint_qual: Vec<u8>,
}

impl BreakendCall {
    /// Create an unannotated breakend call.
    #[must_use]
    pub fn new(pos: i64, summary: BreakendSummary) -> Self {
        Self {
            pos,
            summary,
            evidence_id: None,
            anchor_seq: Vec::new(),
            breakpoint_seq: Vec::new(),
            breakpoint_qual: Vec::new(),
        }
    }

    /// Key by nominal position; valid only within a nominally-sorted stage.
    #[must_use]
    pub fn nominal_key(&self) -> GenomicKey {
        GenomicKey::new(self.summary.tid, self.pos)
    }

    /// Key by evidence start; valid only within an evidence-sorted stage.
    #[must_use]
    pub fn evidence_key(&self) -> GenomicKey {
        self.summary.start_key()
    }

    /// Breakpoint sequence as a displayable string.
    #[must_use]
    pub fn breakpoint_string(&self) -> BString {
        BString::from(self.breakpoint_seq.clone())
    }
}

/// A non-breakend call: opaque passthrough with a parsed sort key.
#[derive(Debug, Clone, PartialEq)]
pub struct OtherCall {
    /// Dictionary-resolved contig index.
    pub tid: u32,
    /// Nominal call position.
    pub pos: i64,
    /// The original record text, re-emitted untouched.
    pub line: String,
}

/// A call record flowing through the transform pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum VariantCall {
    /// Breakend call, subject to annotation.
    Breakend(BreakendCall),
    /// Anything else, passed through untouched.
    Other(OtherCall),
}

impl VariantCall {
    /// Key by nominal position.
    #[must_use]
    pub fn nominal_key(&self) -> GenomicKey {
        match self {
            Self::Breakend(call) => call.nominal_key(),
            Self::Other(call) => GenomicKey::new(call.tid, call.pos),
        }
    }

    /// True for breakend calls.
    #[must_use]
    pub fn is_breakend(&self) -> bool {
        matches!(self, Self::Breakend(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breakend::BreakendDirection;

    fn summary(tid: u32, start: i64, end: i64) -> BreakendSummary {
        BreakendSummary::new(tid, start, end, BreakendDirection::Forward).unwrap()
    }

    #[test]
    fn test_keys_differ_between_stages() {
        // Nominal position and evidence start are independent coordinates.
        let call = BreakendCall::new(500, summary(1, 120, 130));
        assert_eq!(call.nominal_key(), GenomicKey::new(1, 500));
        assert_eq!(call.evidence_key(), GenomicKey::new(1, 120));
    }

    #[test]
    fn test_variant_call_dispatch() {
        let be = VariantCall::Breakend(BreakendCall::new(10, summary(0, 10, 10)));
        let other = VariantCall::Other(OtherCall {
            tid: 0,
            pos: 7,
            line: "other\tchr1\t7".to_string(),
        });
        assert!(be.is_breakend());
        assert!(!other.is_breakend());
        assert!(other.nominal_key() < be.nominal_key());
    }
}
