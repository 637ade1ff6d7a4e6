//! Index-based arena for the per-locus de Bruijn graph.
//!
//! The graph is inherently cyclic, so nodes live in a flat arena and refer
//! to each other by integer id: a content-keyed map resolves each distinct
//! k-mer to its node, and edges are adjacency lists of ids. The whole arena
//! is scoped to one assembly locus and discarded on flush.

use ahash::AHashMap;

/// Arena index of a k-mer node.
pub type NodeId = usize;

/// Directed edge between consecutive k-mers of at least one read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KmerEdge {
    /// Target node id.
    pub to: NodeId,
    /// Number of read traversals supporting this edge.
    pub weight: u64,
}

/// One distinct k-mer and everything observed about it.
#[derive(Debug, Clone)]
pub struct KmerNode {
    /// The k bases identifying this node.
    pub kmer: Vec<u8>,
    /// Number of read k-mer instances collapsed into this node.
    pub weight: u64,
    /// Accumulated quality per k-mer offset, summed over all instances.
    pub qual: Vec<u32>,
    /// Longest anchored (aligned) prefix observed across instances; 0 means
    /// the k-mer was only ever seen in novel sequence.
    pub anchored: usize,
    /// Distinct evidence ordinals that contributed an instance.
    pub support: Vec<u32>,
    /// Outgoing edges.
    pub edges: Vec<KmerEdge>,
}

impl KmerNode {
    fn new(kmer: &[u8]) -> Self {
        Self {
            kmer: kmer.to_vec(),
            weight: 0,
            qual: vec![0; kmer.len()],
            anchored: 0,
            support: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Quality accumulated at the last offset (the base this node appends
    /// when a path is collapsed).
    #[must_use]
    pub fn last_qual(&self) -> u32 {
        *self.qual.last().unwrap_or(&0)
    }
}

/// De Bruijn graph over the evidence of a single locus.
#[derive(Debug)]
pub struct KmerGraph {
    k: usize,
    nodes: Vec<KmerNode>,
    index: AHashMap<Vec<u8>, NodeId>,
}

impl KmerGraph {
    /// Create an empty graph for k-mers of length `k`.
    #[must_use]
    pub fn new(k: usize) -> Self {
        Self { k, nodes: Vec::new(), index: AHashMap::new() }
    }

    /// K-mer length.
    #[must_use]
    pub fn k(&self) -> usize {
        self.k
    }

    /// Number of distinct k-mers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if no k-mers have been inserted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node by id.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &KmerNode {
        &self.nodes[id]
    }

    /// Resolve a k-mer to its node id, inserting a fresh node if absent.
    pub fn get_or_insert(&mut self, kmer: &[u8]) -> NodeId {
        debug_assert_eq!(kmer.len(), self.k);
        if let Some(&id) = self.index.get(kmer) {
            return id;
        }
        let id = self.nodes.len();
        self.nodes.push(KmerNode::new(kmer));
        self.index.insert(kmer.to_vec(), id);
        id
    }

    /// Record one instance of a k-mer: support weight, per-offset quality,
    /// anchored-prefix length, and the contributing evidence ordinal.
    pub fn observe(
        &mut self,
        id: NodeId,
        quals: &[u8],
        anchored_prefix: usize,
        evidence_ordinal: u32,
    ) {
        debug_assert_eq!(quals.len(), self.k);
        let node = &mut self.nodes[id];
        node.weight += 1;
        for (acc, &q) in node.qual.iter_mut().zip(quals) {
            *acc += u32::from(q);
        }
        node.anchored = node.anchored.max(anchored_prefix);
        // Ordinals arrive in non-decreasing order, one record at a time, so
        // a last-element check is enough to keep the list deduplicated.
        if node.support.last() != Some(&evidence_ordinal) {
            node.support.push(evidence_ordinal);
        }
    }

    /// Record a read traversal from `from` to `to`, creating the edge on
    /// first use.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId) {
        let edges = &mut self.nodes[from].edges;
        if let Some(edge) = edges.iter_mut().find(|e| e.to == to) {
            edge.weight += 1;
        } else {
            edges.push(KmerEdge { to, weight: 1 });
        }
    }

    /// Iterate over all node ids.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        0..self.nodes.len()
    }
}
