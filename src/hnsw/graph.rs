//! HNSW graph structure and configuration.
//!
//! [`HnswConfig`] carries the tuning parameters (M, ef_construction, ef_search,
//! distance metric). [`HnswGraph`] owns the per-node neighbor lists, layer
//! assignments, soft-delete flags, and the entry point. Vector data and
//! distance computation live in the [`VectorStore`](crate::store::VectorStore);
//! the graph references nodes purely by id.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config;
use crate::hnsw::distance::DistanceMetric;

/// Configuration parameters for an HNSW graph.
///
/// Controls the trade-off between build speed, search speed, recall, and
/// memory usage. Fixed for the lifetime of a graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HnswConfig {
    /// Number of bidirectional links per node per layer.
    pub m: usize,
    /// Candidate list size during index construction.
    pub ef_construction: usize,
    /// Candidate list size during search (higher = better recall, slower).
    pub ef_search: usize,
    /// Distance function for similarity computation.
    pub metric: DistanceMetric,
}

impl Default for HnswConfig {
    fn default() -> Self {
        Self {
            m: config::DEFAULT_M,
            ef_construction: config::DEFAULT_EF_CONSTRUCTION,
            ef_search: config::DEFAULT_EF_SEARCH,
            metric: DistanceMetric::L2,
        }
    }
}

/// Multi-layer navigable small-world graph over dense node ids.
///
/// Node `i` in the graph corresponds to row `i` of the vector store. Records
/// are created by insert, mutated only by neighbor repair and soft-delete
/// marking, and removed only by building a fresh graph.
#[derive(Debug)]
pub struct HnswGraph {
    /// Tuning parameters, fixed at construction.
    pub config: HnswConfig,
    /// Neighbor lists: `[node][layer][neighbor ids]`.
    pub(crate) neighbors: Vec<Vec<Vec<u32>>>,
    /// Top layer per node.
    pub(crate) layers: Vec<usize>,
    /// Soft-delete flags, parallel to `layers`.
    pub(crate) deleted: Vec<bool>,
    /// Node every search descent starts from; `None` when the graph is
    /// logically empty.
    pub(crate) entry_point: Option<u32>,
    /// Level normalization constant `1 / ln(M)`.
    level_mult: f64,
    rng: StdRng,
}

impl HnswGraph {
    /// Creates a new empty graph with the given configuration.
    pub fn new(config: HnswConfig) -> Self {
        let level_mult = 1.0 / (config.m as f64).ln();
        Self {
            config,
            neighbors: Vec::new(),
            layers: Vec::new(),
            deleted: Vec::new(),
            entry_point: None,
            level_mult,
            rng: StdRng::from_entropy(),
        }
    }

    /// Reconstructs a graph from snapshot arenas. The entry point is
    /// recomputed by the caller via [`recompute_entry_point`](Self::recompute_entry_point).
    pub(crate) fn from_parts(
        config: HnswConfig,
        neighbors: Vec<Vec<Vec<u32>>>,
        layers: Vec<usize>,
        deleted: Vec<bool>,
    ) -> Self {
        debug_assert_eq!(neighbors.len(), layers.len());
        debug_assert_eq!(neighbors.len(), deleted.len());
        let level_mult = 1.0 / (config.m as f64).ln();
        Self {
            config,
            neighbors,
            layers,
            deleted,
            entry_point: None,
            level_mult,
            rng: StdRng::from_entropy(),
        }
    }

    /// Returns the number of node records, soft-deleted included.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Returns `true` if the graph holds no node records at all.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Returns the number of soft-deleted nodes.
    pub fn deleted_count(&self) -> usize {
        self.deleted.iter().filter(|&&d| d).count()
    }

    /// Returns `true` if the node has been soft-deleted. Absent ids read as
    /// not deleted.
    #[inline]
    pub fn is_deleted(&self, id: u32) -> bool {
        self.deleted.get(id as usize).copied().unwrap_or(false)
    }

    /// Returns the top layer of the given node.
    #[inline]
    pub fn top_layer(&self, id: u32) -> usize {
        self.layers[id as usize]
    }

    /// The node every search descent starts from, if any.
    pub fn entry_point(&self) -> Option<u32> {
        self.entry_point
    }

    /// Samples the layer for a new node: `floor(-ln(U) * m_L)` with `U` drawn
    /// uniformly from `(0, 1]`.
    pub(crate) fn random_level(&mut self) -> usize {
        let u: f64 = 1.0 - self.rng.gen::<f64>();
        (-u.ln() * self.level_mult).floor() as usize
    }

    /// Appends an empty node record with the given top layer.
    pub(crate) fn push_node(&mut self, level: usize) {
        self.neighbors.push(vec![Vec::new(); level + 1]);
        self.layers.push(level);
        self.deleted.push(false);
    }

    /// Marks a node as soft-deleted.
    ///
    /// Absent or already-deleted ids are silently tolerated. When the entry
    /// point itself is deleted, it is reassigned to a non-deleted node with
    /// maximal top layer; if none remains the graph becomes logically empty
    /// while its records stay in place.
    pub fn mark_deleted(&mut self, id: u32) {
        let idx = id as usize;
        if idx >= self.deleted.len() {
            return;
        }
        self.deleted[idx] = true;
        if self.entry_point == Some(id) {
            self.recompute_entry_point();
        }
    }

    /// Points the entry point at a non-deleted node whose top layer is maximal
    /// (first such node wins ties), or clears it when every node is deleted.
    pub(crate) fn recompute_entry_point(&mut self) {
        let mut best: Option<(usize, u32)> = None;
        for (i, &layer) in self.layers.iter().enumerate() {
            if self.deleted[i] {
                continue;
            }
            match best {
                Some((top, _)) if top >= layer => {}
                _ => best = Some((layer, i as u32)),
            }
        }
        self.entry_point = best.map(|(_, id)| id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_with_layers(layers: &[usize]) -> HnswGraph {
        let mut graph = HnswGraph::new(HnswConfig::default());
        for &layer in layers {
            graph.push_node(layer);
        }
        graph.recompute_entry_point();
        graph
    }

    #[test]
    fn test_new_empty_graph() {
        let graph = HnswGraph::new(HnswConfig::default());
        assert!(graph.is_empty());
        assert_eq!(graph.len(), 0);
        assert_eq!(graph.deleted_count(), 0);
        assert!(graph.entry_point().is_none());
    }

    #[test]
    fn test_push_node_allocates_layers() {
        let mut graph = HnswGraph::new(HnswConfig::default());
        graph.push_node(3);
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.top_layer(0), 3);
        assert_eq!(graph.neighbors[0].len(), 4); // layers 0..=3
    }

    #[test]
    fn test_random_level_distribution() {
        let mut graph = HnswGraph::new(HnswConfig::default());
        let mut ground = 0usize;
        for _ in 0..1000 {
            let level = graph.random_level();
            if level == 0 {
                ground += 1;
            }
            assert!(level < 32, "implausibly deep level {level}");
        }
        // With M=16, ~93.75% of nodes land on layer 0
        assert!(ground > 800, "only {ground}/1000 nodes on layer 0");
    }

    #[test]
    fn test_mark_deleted_is_idempotent() {
        let mut graph = graph_with_layers(&[0, 0]);
        graph.mark_deleted(1);
        graph.mark_deleted(1);
        assert_eq!(graph.deleted_count(), 1);
        // Out-of-range ids must not corrupt state
        graph.mark_deleted(99);
        assert_eq!(graph.deleted_count(), 1);
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn test_is_deleted_out_of_range() {
        let graph = graph_with_layers(&[0]);
        assert!(!graph.is_deleted(7));
    }

    #[test]
    fn test_delete_entry_point_reassigns_to_max_layer() {
        let mut graph = graph_with_layers(&[0, 2, 1]);
        assert_eq!(graph.entry_point(), Some(1));
        graph.mark_deleted(1);
        // Node 2 has the highest remaining top layer
        assert_eq!(graph.entry_point(), Some(2));
    }

    #[test]
    fn test_delete_non_entry_keeps_entry_point() {
        let mut graph = graph_with_layers(&[0, 2, 1]);
        graph.mark_deleted(0);
        assert_eq!(graph.entry_point(), Some(1));
    }

    #[test]
    fn test_deleting_all_nodes_empties_entry_point() {
        let mut graph = graph_with_layers(&[1, 0]);
        graph.mark_deleted(0);
        graph.mark_deleted(1);
        assert!(graph.entry_point().is_none());
        // Records remain
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn test_entry_point_tie_breaks_to_first() {
        let mut graph = graph_with_layers(&[1, 1, 1]);
        assert_eq!(graph.entry_point(), Some(0));
        graph.mark_deleted(0);
        assert_eq!(graph.entry_point(), Some(1));
    }
}
