//! De Bruijn graph assembly of breakpoint sequences from local evidence.
//!
//! One assembler instance covers one locus and one breakend direction. The
//! caller feeds it every evidence record for the locus, then signals
//! end-of-evidence explicitly; the assembler cannot infer exhaustion on its
//! own. Flushing selects the best-supported path through the k-mer graph,
//! collapses it into anchor + breakpoint sequences, and tears the graph
//! down.
//!
//! Backward-direction evidence is normalized by reversing the read on
//! ingest, so path construction always sees `[anchor][novel]`; the emitted
//! sequences and qualities are reversed back on the way out. Assembly is on
//! the positive strand in both directions (no complementing).

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::breakend::{BreakendDirection, BreakendSummary, EvidenceAttribute};
use crate::dictionary::ContigDictionary;
use crate::errors::{Result, SvasmError};
use crate::evidence::EvidenceRecord;

use super::graph::{KmerGraph, NodeId};

/// Name prefix baked into every evidence-id this assembler emits.
pub const ASSEMBLER_NAME: &str = "debruijn";

/// A consensus breakpoint assembled from local evidence.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakpointCall {
    /// Deterministic id: `<assembler>-<contig>:<position>-<f|b>`.
    pub evidence_id: String,
    /// Aligned, reference-consistent portion of the assembled contig.
    pub anchor_seq: Vec<u8>,
    /// Novel sequence across the junction.
    pub breakpoint_seq: Vec<u8>,
    /// Per-base breakpoint quality, additive over contributing reads.
    pub breakpoint_qual: Vec<u8>,
    /// Breakend summary with evidence attributes.
    pub summary: BreakendSummary,
}

/// Lifecycle of an assembler: accepting evidence or already flushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AssemblerState {
    Accepting,
    Flushed,
}

/// Anchor metadata retained per evidence record.
#[derive(Debug, Clone, Copy)]
struct EvidenceAnchor {
    tid: u32,
    pos: i64,
    anchored: bool,
}

/// Per-locus de Bruijn assembler.
pub struct DeBruijnAssembler {
    k: usize,
    direction: BreakendDirection,
    dict: Arc<ContigDictionary>,
    graph: KmerGraph,
    anchors: Vec<EvidenceAnchor>,
    state: AssemblerState,
}

impl DeBruijnAssembler {
    /// Create an assembler for k-mers of length `k` and one direction.
    pub fn new(k: usize, direction: BreakendDirection, dict: Arc<ContigDictionary>) -> Result<Self> {
        if k < 2 {
            return Err(SvasmError::InvalidParameter {
                parameter: "kmer".to_string(),
                reason: format!("k-mer length must be >= 2, got {k}"),
            });
        }
        Ok(Self {
            k,
            direction,
            dict,
            graph: KmerGraph::new(k),
            anchors: Vec::new(),
            state: AssemblerState::Accepting,
        })
    }

    /// Configured direction.
    #[must_use]
    pub fn direction(&self) -> BreakendDirection {
        self.direction
    }

    /// Add one evidence record to the locus graph.
    ///
    /// Fails if the assembler has been flushed or the record's direction
    /// does not match the assembler's; evidence is never silently dropped.
    pub fn add_evidence(&mut self, record: &EvidenceRecord) -> Result<()> {
        if self.state == AssemblerState::Flushed {
            return Err(SvasmError::InvalidParameter {
                parameter: "assembler".to_string(),
                reason: "evidence added after end-of-evidence".to_string(),
            });
        }
        if record.direction != self.direction {
            return Err(SvasmError::InvalidParameter {
                parameter: "assembler".to_string(),
                reason: format!(
                    "evidence direction {} does not match assembler direction {}",
                    record.direction, self.direction
                ),
            });
        }

        let ordinal = self.anchors.len() as u32;
        self.anchors.push(EvidenceAnchor {
            tid: record.tid,
            pos: record.pos,
            anchored: record.kind.anchor_len() > 0,
        });

        // Normalize to [anchor][novel]: Backward reads carry the anchor at
        // the read end, so reversing puts it first.
        let (seq, quals): (Vec<u8>, Vec<u8>) = match self.direction {
            BreakendDirection::Forward => (record.seq.clone(), record.quals.clone()),
            BreakendDirection::Backward => (
                record.seq.iter().rev().copied().collect(),
                record.quals.iter().rev().copied().collect(),
            ),
        };
        let anchor_len = record.kind.anchor_len();

        if seq.len() < self.k {
            // Too short to seed a single k-mer; contributes nothing.
            return Ok(());
        }

        let mut prev: Option<NodeId> = None;
        for i in 0..=(seq.len() - self.k) {
            let kmer = &seq[i..i + self.k];
            let anchored_prefix = anchor_len.saturating_sub(i).min(self.k);
            let id = self.graph.get_or_insert(kmer);
            self.graph.observe(id, &quals[i..i + self.k], anchored_prefix, ordinal);
            if let Some(prev_id) = prev {
                self.graph.add_edge(prev_id, id);
            }
            prev = Some(id);
        }
        Ok(())
    }

    /// Signal end of evidence for the locus: select the winning path, emit
    /// zero or more calls, and tear down the graph.
    pub fn end_of_evidence(&mut self) -> Result<Vec<BreakpointCall>> {
        if self.state == AssemblerState::Flushed {
            return Err(SvasmError::InvalidParameter {
                parameter: "assembler".to_string(),
                reason: "assembler flushed twice".to_string(),
            });
        }
        self.state = AssemblerState::Flushed;

        let call = self.call_winning_path();
        self.graph = KmerGraph::new(self.k);
        Ok(call.into_iter().collect())
    }

    /// Select and collapse the highest-weight path, if it yields a call.
    fn call_winning_path(&self) -> Option<BreakpointCall> {
        let seed = self.select_seed()?;
        let path = self.greedy_path(seed);

        // Collapse: first k-mer, then the last base of each extension.
        let k = self.k;
        let mut collapsed: Vec<u8> = self.graph.node(path[0]).kmer.clone();
        for &id in &path[1..] {
            collapsed.push(*self.graph.node(id).kmer.last().expect("k >= 2"));
        }

        // Anchor boundary: each anchored path node at index j claims bases
        // [j, j + anchored); the boundary is the furthest claim.
        let anchor_len = path
            .iter()
            .enumerate()
            .filter(|(_, &id)| self.graph.node(id).anchored > 0)
            .map(|(j, &id)| j + self.graph.node(id).anchored)
            .max()
            .unwrap_or(0);
        if anchor_len == 0 || anchor_len >= collapsed.len() {
            // Unanchored path or purely-anchor path: no call.
            return None;
        }

        // Distinct evidence supporting the breakpoint portion of the path.
        let mut breakpoint_support: BTreeSet<u32> = BTreeSet::new();
        for (j, &id) in path.iter().enumerate() {
            if j + k > anchor_len {
                breakpoint_support.extend(self.graph.node(id).support.iter().copied());
            }
        }
        if breakpoint_support.len() < 2 {
            // A single corroborating read is not an assembly.
            return None;
        }

        // Per-base breakpoint quality: position p is contributed once by
        // the node whose collapse appended it (offset p of the first node,
        // last offset of node p - k + 1 afterwards).
        let mut breakpoint_qual: Vec<u8> = Vec::with_capacity(collapsed.len() - anchor_len);
        for p in anchor_len..collapsed.len() {
            let q = if p < k {
                self.graph.node(path[0]).qual[p]
            } else {
                self.graph.node(path[p - k + 1]).last_qual()
            };
            breakpoint_qual.push(q.min(u32::from(u8::MAX)) as u8);
        }

        let mut anchor_seq = collapsed[..anchor_len].to_vec();
        let mut breakpoint_seq = collapsed[anchor_len..].to_vec();
        if self.direction == BreakendDirection::Backward {
            anchor_seq.reverse();
            breakpoint_seq.reverse();
            breakpoint_qual.reverse();
        }

        self.build_call(&path, breakpoint_support, anchor_seq, breakpoint_seq, breakpoint_qual)
    }

    /// Best anchored starting node: max weight, then longest anchored
    /// prefix, then lexicographically smallest k-mer.
    fn select_seed(&self) -> Option<NodeId> {
        self.graph
            .node_ids()
            .filter(|&id| self.graph.node(id).anchored > 0)
            .max_by(|&a, &b| {
                let (na, nb) = (self.graph.node(a), self.graph.node(b));
                na.weight
                    .cmp(&nb.weight)
                    .then_with(|| na.anchored.cmp(&nb.anchored))
                    .then_with(|| nb.kmer.cmp(&na.kmer))
            })
    }

    /// Greedy walk along highest-weight out-edges; equal-weight alternatives
    /// resolve to the lexicographically smallest target so repeated runs on
    /// identical input take identical paths.
    fn greedy_path(&self, seed: NodeId) -> Vec<NodeId> {
        let mut visited = vec![false; self.graph.len()];
        let mut path = vec![seed];
        visited[seed] = true;
        let mut current = seed;
        loop {
            let next = self
                .graph
                .node(current)
                .edges
                .iter()
                .filter(|e| !visited[e.to])
                .max_by(|a, b| {
                    a.weight.cmp(&b.weight).then_with(|| {
                        self.graph.node(b.to).kmer.cmp(&self.graph.node(a.to).kmer)
                    })
                })
                .map(|e| e.to);
            match next {
                Some(id) => {
                    visited[id] = true;
                    path.push(id);
                    current = id;
                }
                None => break,
            }
        }
        path
    }

    fn build_call(
        &self,
        path: &[NodeId],
        breakpoint_support: BTreeSet<u32>,
        anchor_seq: Vec<u8>,
        breakpoint_seq: Vec<u8>,
        breakpoint_qual: Vec<u8>,
    ) -> Option<BreakpointCall> {
        // All evidence contributing anywhere on the winning path.
        let mut path_support: BTreeSet<u32> = BTreeSet::new();
        for &id in path {
            path_support.extend(self.graph.node(id).support.iter().copied());
        }

        // Breakend interval: min/max observed anchor coordinate over the
        // anchored contributors (a single point when they all agree).
        let anchored: Vec<&EvidenceAnchor> = path_support
            .iter()
            .map(|&ord| &self.anchors[ord as usize])
            .filter(|a| a.anchored)
            .collect();
        let (tid, start, end) = match (anchored.first(), anchored.last()) {
            (Some(first), Some(_)) => (
                first.tid,
                anchored.iter().map(|a| a.pos).min().expect("non-empty"),
                anchored.iter().map(|a| a.pos).max().expect("non-empty"),
            ),
            _ => return None,
        };

        let mut summary = BreakendSummary::new(tid, start, end, self.direction).ok()?;
        summary
            .attributes
            .insert(EvidenceAttribute::AssemblyReads, breakpoint_support.len() as f64);
        summary
            .attributes
            .insert(EvidenceAttribute::AssemblyBases, breakpoint_seq.len() as f64);
        summary.attributes.insert(
            EvidenceAttribute::AssemblyMaxQual,
            f64::from(breakpoint_qual.iter().copied().max().unwrap_or(0)),
        );
        let softclips =
            path_support.iter().filter(|&&ord| self.anchors[ord as usize].anchored).count();
        summary.attributes.insert(EvidenceAttribute::SoftClipReads, softclips as f64);
        summary.attributes.insert(
            EvidenceAttribute::ReadPairReads,
            (path_support.len() - softclips) as f64,
        );

        let contig = self
            .dict
            .name(tid)
            .map_or_else(|| tid.to_string(), ToString::to_string);
        let evidence_id =
            format!("{ASSEMBLER_NAME}-{contig}:{start}-{}", self.direction.code());

        Some(BreakpointCall {
            evidence_id,
            anchor_seq,
            breakpoint_seq,
            breakpoint_qual,
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::EvidenceKind;

    fn dict() -> Arc<ContigDictionary> {
        Arc::new(ContigDictionary::from_names(&["polyA", "chr1"]).unwrap())
    }

    fn softclip(
        direction: BreakendDirection,
        pos: i64,
        anchor_len: usize,
        seq: &[u8],
        quals: &[u8],
    ) -> EvidenceRecord {
        EvidenceRecord::new(
            0,
            pos,
            direction,
            EvidenceKind::SoftClip { anchor_len },
            seq.to_vec(),
            quals.to_vec(),
        )
        .unwrap()
    }

    fn pair(direction: BreakendDirection, pos: i64, seq: &[u8]) -> EvidenceRecord {
        EvidenceRecord::new(
            0,
            pos,
            direction,
            EvidenceKind::UnanchoredPair,
            seq.to_vec(),
            vec![9; seq.len()],
        )
        .unwrap()
    }

    fn assemble(
        k: usize,
        direction: BreakendDirection,
        evidence: &[EvidenceRecord],
    ) -> Vec<BreakpointCall> {
        let mut assembler = DeBruijnAssembler::new(k, direction, dict()).unwrap();
        for record in evidence {
            assembler.add_evidence(record).unwrap();
        }
        assembler.end_of_evidence().unwrap()
    }

    #[test]
    fn no_call_without_evidence() {
        assert!(assemble(3, BreakendDirection::Forward, &[]).is_empty());
    }

    #[test]
    fn no_call_for_single_soft_clip() {
        let calls = assemble(
            3,
            BreakendDirection::Forward,
            &[softclip(BreakendDirection::Forward, 1, 1, b"AACGTG", &[5; 6])],
        );
        assert!(calls.is_empty());
    }

    #[test]
    fn no_call_when_only_anchor_assembles() {
        // Poly-A reads collapse to a single all-anchor k-mer.
        let calls = assemble(
            3,
            BreakendDirection::Backward,
            &[
                softclip(BreakendDirection::Backward, 1, 5, b"AAAAAAA", &[5; 7]),
                softclip(BreakendDirection::Backward, 1, 5, b"AAAAAAAA", &[5; 8]),
            ],
        );
        assert!(calls.is_empty());
    }

    #[test]
    fn no_call_for_unanchored_evidence() {
        let calls = assemble(
            3,
            BreakendDirection::Forward,
            &[
                pair(BreakendDirection::Forward, 1, b"CATG"),
                pair(BreakendDirection::Forward, 1, b"CATGAT"),
            ],
        );
        assert!(calls.is_empty());
    }

    #[test]
    fn no_call_without_consistent_breakpoint_extension() {
        // Shared low-complexity anchor, divergent single-read extensions.
        let calls = assemble(
            3,
            BreakendDirection::Forward,
            &[
                softclip(BreakendDirection::Forward, 1, 3, b"AAAC", &[5; 4]),
                softclip(BreakendDirection::Forward, 1, 3, b"AAAG", &[5; 4]),
            ],
        );
        assert!(calls.is_empty());
    }

    #[test]
    fn calls_multiple_soft_clips() {
        let calls = assemble(
            3,
            BreakendDirection::Forward,
            &[
                softclip(BreakendDirection::Forward, 1, 1, b"AACGTG", &[5; 6]),
                softclip(BreakendDirection::Forward, 1, 1, b"AACGTGA", &[5; 7]),
            ],
        );
        assert_eq!(calls.len(), 1);
        let call = &calls[0];
        assert_eq!(call.breakpoint_seq, b"ACGTGA");
        assert_eq!(call.anchor_seq, b"A");
        assert_eq!(
            call.summary.attributes[&EvidenceAttribute::AssemblyReads], 2.0
        );
        assert_eq!(call.summary.direction, BreakendDirection::Forward);
        assert_eq!(call.summary.tid, 0);
        assert_eq!(call.summary.start, 1);
        assert_eq!(call.summary.end, 1);
    }

    #[test]
    fn breakpoint_quality_is_additive() {
        let calls = assemble(
            3,
            BreakendDirection::Forward,
            &[
                softclip(BreakendDirection::Forward, 1, 1, b"AACGTG", &[5; 6]),
                softclip(BreakendDirection::Forward, 1, 1, b"AACGTGA", &[5; 7]),
            ],
        );
        assert_eq!(calls[0].breakpoint_qual, vec![10, 10, 10, 10, 10, 5]);
    }

    #[test]
    fn id_contains_assembler_name_position_direction() {
        let calls = assemble(
            3,
            BreakendDirection::Forward,
            &[
                softclip(BreakendDirection::Forward, 1, 1, b"AACGTG", &[5; 6]),
                softclip(BreakendDirection::Forward, 1, 1, b"AACGTGA", &[5; 7]),
            ],
        );
        assert_eq!(calls[0].evidence_id, "debruijn-polyA:1-f");
    }

    #[test]
    fn backward_breakpoint_is_prefix() {
        // Mirror image of the forward scenario: the novel bases sit before
        // the single anchored base at the read end.
        let calls = assemble(
            3,
            BreakendDirection::Backward,
            &[
                softclip(BreakendDirection::Backward, 1, 1, b"GTGCAA", &[5; 6]),
                softclip(BreakendDirection::Backward, 1, 1, b"AGTGCAA", &[5; 7]),
            ],
        );
        assert_eq!(calls.len(), 1);
        let call = &calls[0];
        assert_eq!(call.anchor_seq, b"A");
        assert_eq!(call.breakpoint_seq, b"AGTGCA");
        assert_eq!(call.breakpoint_qual, vec![5, 10, 10, 10, 10, 10]);
        assert_eq!(call.evidence_id, "debruijn-polyA:1-b");
    }

    #[test]
    fn interval_widens_to_observed_anchors() {
        let calls = assemble(
            3,
            BreakendDirection::Forward,
            &[
                softclip(BreakendDirection::Forward, 10, 1, b"AACGTG", &[5; 6]),
                softclip(BreakendDirection::Forward, 14, 1, b"AACGTGA", &[5; 7]),
            ],
        );
        assert_eq!(calls[0].summary.start, 10);
        assert_eq!(calls[0].summary.end, 14);
        assert_eq!(calls[0].evidence_id, "debruijn-polyA:10-f");
    }

    #[test]
    fn pair_evidence_extends_a_soft_clip_assembly() {
        let calls = assemble(
            3,
            BreakendDirection::Forward,
            &[
                softclip(BreakendDirection::Forward, 1, 1, b"AACGTG", &[5; 6]),
                softclip(BreakendDirection::Forward, 1, 1, b"AACGTG", &[5; 6]),
                pair(BreakendDirection::Forward, 1, b"CGTGAT"),
            ],
        );
        assert_eq!(calls.len(), 1);
        let call = &calls[0];
        // The pair extends the clip consensus beyond the read ends.
        assert_eq!(call.breakpoint_seq, b"ACGTGAT");
        assert_eq!(call.summary.attributes[&EvidenceAttribute::SoftClipReads], 2.0);
        assert_eq!(call.summary.attributes[&EvidenceAttribute::ReadPairReads], 1.0);
        // Interval stays at the anchored reads' coordinate.
        assert_eq!((call.summary.start, call.summary.end), (1, 1));
    }

    #[test]
    fn equal_weight_paths_resolve_deterministically() {
        // Two equally supported extensions; the lexicographically smaller
        // branch must win on every run.
        let evidence = [
            softclip(BreakendDirection::Forward, 1, 3, b"AAACT", &[5; 5]),
            softclip(BreakendDirection::Forward, 1, 3, b"AAACT", &[5; 5]),
            softclip(BreakendDirection::Forward, 1, 3, b"AAACG", &[5; 5]),
            softclip(BreakendDirection::Forward, 1, 3, b"AAACG", &[5; 5]),
        ];
        let first = assemble(3, BreakendDirection::Forward, &evidence);
        let second = assemble(3, BreakendDirection::Forward, &evidence);
        assert_eq!(first, second);
        assert_eq!(first[0].breakpoint_seq, b"CG");
    }

    #[test]
    fn rejects_evidence_after_flush() {
        let mut assembler =
            DeBruijnAssembler::new(3, BreakendDirection::Forward, dict()).unwrap();
        assembler.end_of_evidence().unwrap();
        let record = softclip(BreakendDirection::Forward, 1, 1, b"AACGTG", &[5; 6]);
        assert!(assembler.add_evidence(&record).is_err());
        assert!(assembler.end_of_evidence().is_err());
    }

    #[test]
    fn rejects_direction_mismatch() {
        let mut assembler =
            DeBruijnAssembler::new(3, BreakendDirection::Forward, dict()).unwrap();
        let record = softclip(BreakendDirection::Backward, 1, 1, b"AACGTG", &[5; 6]);
        assert!(assembler.add_evidence(&record).is_err());
    }

    #[test]
    fn rejects_tiny_k() {
        assert!(DeBruijnAssembler::new(1, BreakendDirection::Forward, dict()).is_err());
    }
}
