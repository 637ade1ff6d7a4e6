//! Breakend model: direction, evidence attributes, and breakend summaries.
//!
//! A breakend is one side of a structural-variant junction. Its direction
//! says which side of the genomic position is retained: `Forward` breakends
//! keep the reference bases before the position (the novel sequence extends
//! to the right), `Backward` breakends keep the bases after it.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::errors::SvasmError;
use crate::keys::GenomicKey;

/// Which side of the breakend position is retained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BreakendDirection {
    /// Novel sequence extends rightward from the anchored bases.
    Forward,
    /// Novel sequence extends leftward from the anchored bases.
    Backward,
}

impl BreakendDirection {
    /// Single-character code used in file formats and evidence-ids.
    #[must_use]
    pub fn code(&self) -> char {
        match self {
            Self::Forward => 'f',
            Self::Backward => 'b',
        }
    }
}

impl fmt::Display for BreakendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for BreakendDirection {
    type Err = SvasmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "f" | "F" => Ok(Self::Forward),
            "b" | "B" => Ok(Self::Backward),
            other => Err(SvasmError::InvalidParameter {
                parameter: "direction".to_string(),
                reason: format!("expected 'f' or 'b', got '{other}'"),
            }),
        }
    }
}

/// Named numeric evidence attributes carried on a breakend summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EvidenceAttribute {
    /// Distinct evidence records supporting the assembled breakpoint.
    AssemblyReads,
    /// Length of the assembled breakpoint sequence.
    AssemblyBases,
    /// Maximum per-base quality in the assembled breakpoint.
    AssemblyMaxQual,
    /// Soft-clipped reads contributing to the locus.
    SoftClipReads,
    /// Discordant read pairs contributing to the locus.
    ReadPairReads,
}

impl EvidenceAttribute {
    /// Stable string code used in file formats.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::AssemblyReads => "ASSEMBLY_READS",
            Self::AssemblyBases => "ASSEMBLY_BASES",
            Self::AssemblyMaxQual => "ASSEMBLY_MAX_QUAL",
            Self::SoftClipReads => "SOFT_CLIP_READS",
            Self::ReadPairReads => "READ_PAIR_READS",
        }
    }
}

impl fmt::Display for EvidenceAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for EvidenceAttribute {
    type Err = SvasmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ASSEMBLY_READS" => Ok(Self::AssemblyReads),
            "ASSEMBLY_BASES" => Ok(Self::AssemblyBases),
            "ASSEMBLY_MAX_QUAL" => Ok(Self::AssemblyMaxQual),
            "SOFT_CLIP_READS" => Ok(Self::SoftClipReads),
            "READ_PAIR_READS" => Ok(Self::ReadPairReads),
            other => Err(SvasmError::InvalidParameter {
                parameter: "attribute".to_string(),
                reason: format!("unknown evidence attribute '{other}'"),
            }),
        }
    }
}

/// Ordered attribute map; `BTreeMap` keeps serialization deterministic.
pub type EvidenceAttributes = BTreeMap<EvidenceAttribute, f64>;

/// Summary of one breakend: location interval, direction, and evidence.
///
/// `start == end` when all contributing evidence anchors at the same
/// coordinate; the interval widens to the min/max observed anchor otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakendSummary {
    /// Dictionary-resolved contig index.
    pub tid: u32,
    /// 1-based interval start (inclusive). Invariant: `start <= end`.
    pub start: i64,
    /// 1-based interval end (inclusive).
    pub end: i64,
    /// Which side of the position is retained.
    pub direction: BreakendDirection,
    /// Named numeric evidence attributes.
    pub attributes: EvidenceAttributes,
}

impl BreakendSummary {
    /// Create a summary, enforcing `start <= end`.
    pub fn new(
        tid: u32,
        start: i64,
        end: i64,
        direction: BreakendDirection,
    ) -> Result<Self, SvasmError> {
        if start > end {
            return Err(SvasmError::MalformedRecord {
                line: 0,
                reason: format!("breakend interval start {start} > end {end}"),
            });
        }
        Ok(Self { tid, start, end, direction, attributes: EvidenceAttributes::new() })
    }

    /// Sort key over the interval start.
    #[must_use]
    pub fn start_key(&self) -> GenomicKey {
        GenomicKey::new(self.tid, self.start)
    }
}
