//! Evidence records: soft-clipped reads and discordant read pairs.
//!
//! Evidence is loosely localized: the anchor coordinate says where the
//! aligned portion of the read (or the mapped mate of a pair) sits, and the
//! assembled call may land anywhere within the physical span of the
//! evidence. That span bounds the disorder the downstream reorder stages
//! have to absorb, so the evidence source also reports the maximum span
//! across everything it loaded.

use std::io::BufRead;
use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use fgoxide::io::Io;
use log::info;

use crate::breakend::BreakendDirection;
use crate::errors::SvasmError;

/// How an evidence record supports a breakend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvidenceKind {
    /// Soft-clipped read: `anchor_len` bases are aligned, the rest novel.
    SoftClip {
        /// Number of aligned bases (at the read start for Forward, at the
        /// read end for Backward).
        anchor_len: usize,
    },
    /// Read whose pair places it near the breakend but which is itself
    /// unaligned; the whole sequence is novel.
    UnanchoredPair,
}

impl EvidenceKind {
    /// Number of aligned bases contributed by this record.
    #[must_use]
    pub fn anchor_len(&self) -> usize {
        match self {
            Self::SoftClip { anchor_len } => *anchor_len,
            Self::UnanchoredPair => 0,
        }
    }
}

/// One evidence record, consumed exactly once by an assembler.
#[derive(Debug, Clone, PartialEq)]
pub struct EvidenceRecord {
    /// Dictionary-resolved contig index of the anchor.
    pub tid: u32,
    /// 1-based approximate anchor coordinate.
    pub pos: i64,
    /// Which side of the anchor the novel sequence extends.
    pub direction: BreakendDirection,
    /// Soft clip or unanchored pair.
    pub kind: EvidenceKind,
    /// Read bases.
    pub seq: Vec<u8>,
    /// Per-base quality. Invariant: same length as `seq`.
    pub quals: Vec<u8>,
}

impl EvidenceRecord {
    /// Create a record, enforcing the sequence/quality length invariant.
    pub fn new(
        tid: u32,
        pos: i64,
        direction: BreakendDirection,
        kind: EvidenceKind,
        seq: Vec<u8>,
        quals: Vec<u8>,
    ) -> Result<Self, SvasmError> {
        if seq.len() != quals.len() {
            return Err(SvasmError::MalformedRecord {
                line: 0,
                reason: format!(
                    "sequence length {} != quality length {}",
                    seq.len(),
                    quals.len()
                ),
            });
        }
        if kind.anchor_len() > seq.len() {
            return Err(SvasmError::MalformedRecord {
                line: 0,
                reason: format!(
                    "anchored prefix {} longer than read ({} bp)",
                    kind.anchor_len(),
                    seq.len()
                ),
            });
        }
        Ok(Self { tid, pos, direction, kind, seq, quals })
    }
}

/// Supplies evidence records plus the span bound used to size the reorder
/// window: no assembly can relocate a call further from its source reads
/// than the maximum physical evidence span.
pub trait EvidenceSource {
    /// All evidence records, in file order.
    fn records(&self) -> &[EvidenceRecord];

    /// Maximum physical evidence span: read length + fragment size +
    /// assembly extension.
    fn max_evidence_span(&self) -> i64;
}

/// Evidence loaded from a tab-delimited file.
///
/// Columns: contig, position, direction (`f`/`b`), kind (`softclip`/`pair`),
/// anchored-prefix length, sequence, comma-separated qualities. Lines
/// starting with `#` are skipped. Malformed rows are fatal.
pub struct TsvEvidenceSource {
    records: Vec<EvidenceRecord>,
    max_span: i64,
}

impl TsvEvidenceSource {
    /// Load evidence from `path`, resolving contig names through `dict`.
    ///
    /// `max_fragment_size` is the library's maximum expected fragment
    /// (insert) size; it widens the span bound so discordant-pair evidence
    /// anchored at a mate position is still covered.
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        dict: &crate::dictionary::ContigDictionary,
        max_fragment_size: i64,
    ) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let reader = Io::default()
            .new_reader(path)
            .with_context(|| format!("Failed to open evidence file: {}", path.display()))?;

        let mut records = Vec::new();
        let mut max_read_len = 0usize;
        for (idx, line) in reader.lines().enumerate() {
            let line_no = idx as u64 + 1;
            let line = line.with_context(|| {
                format!("Failed to read evidence file: {}", path.display())
            })?;
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let record = parse_evidence_line(&line, line_no, dict)?;
            max_read_len = max_read_len.max(record.seq.len());
            records.push(record);
        }

        // Read length on each side of the fragment plus the fragment gap
        // itself bounds how far an assembled call can move from its reads.
        let max_span = 2 * max_read_len as i64 + max_fragment_size;
        info!(
            "Loaded {} evidence records (max span {} bp) from {}",
            records.len(),
            max_span,
            path.display()
        );
        Ok(Self { records, max_span })
    }

    /// Build a source from in-memory records (for tests and library use).
    #[must_use]
    pub fn from_records(records: Vec<EvidenceRecord>, max_fragment_size: i64) -> Self {
        let max_read_len = records.iter().map(|r| r.seq.len()).max().unwrap_or(0);
        let max_span = 2 * max_read_len as i64 + max_fragment_size;
        Self { records, max_span }
    }
}

impl EvidenceSource for TsvEvidenceSource {
    fn records(&self) -> &[EvidenceRecord] {
        &self.records
    }

    fn max_evidence_span(&self) -> i64 {
        self.max_span
    }
}

fn parse_evidence_line(
    line: &str,
    line_no: u64,
    dict: &crate::dictionary::ContigDictionary,
) -> Result<EvidenceRecord, SvasmError> {
    let malformed = |reason: String| SvasmError::MalformedRecord { line: line_no, reason };

    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != 7 {
        return Err(malformed(format!("expected 7 columns, got {}", fields.len())));
    }

    let tid = dict.tid(fields[0])?;
    let pos: i64 =
        fields[1].parse().map_err(|_| malformed(format!("bad position '{}'", fields[1])))?;
    let direction = BreakendDirection::from_str(fields[2])
        .map_err(|_| malformed(format!("bad direction '{}'", fields[2])))?;
    let anchor_len: usize = fields[4]
        .parse()
        .map_err(|_| malformed(format!("bad anchor length '{}'", fields[4])))?;
    let kind = match fields[3] {
        "softclip" => EvidenceKind::SoftClip { anchor_len },
        "pair" if anchor_len == 0 => EvidenceKind::UnanchoredPair,
        "pair" => return Err(malformed("pair evidence must have anchor length 0".to_string())),
        other => return Err(malformed(format!("unknown evidence kind '{other}'"))),
    };
    let seq = fields[5].as_bytes().to_vec();
    let quals = fields[6]
        .split(',')
        .map(|q| q.parse::<u8>().map_err(|_| malformed(format!("bad quality '{q}'"))))
        .collect::<Result<Vec<u8>, _>>()?;

    EvidenceRecord::new(tid, pos, direction, kind, seq, quals).map_err(|e| match e {
        SvasmError::MalformedRecord { reason, .. } => malformed(reason),
        other => other,
    })
}
