//! HNSW insertion.
//!
//! New nodes greedily descend from the entry point to their sampled level,
//! then link into each layer from `min(level, entry_top)` down to 0. Links are
//! bidirectional; a neighbor pushed over capacity evicts the connection
//! farthest from itself, measured through the same node-side distance used
//! during search (quantized when a trained quantizer is attached).

use crate::hnsw::graph::HnswGraph;
use crate::hnsw::visited::VisitedSet;
use crate::store::VectorStore;

impl HnswGraph {
    /// Inserts the node `new_id` into the graph.
    ///
    /// The node's vector and metadata must already be present in `store`;
    /// `new_id` must equal the current node count so ids stay dense.
    pub fn insert(&mut self, new_id: u32, store: &VectorStore) {
        debug_assert_eq!(new_id as usize, self.neighbors.len());
        debug_assert_eq!(store.len(), self.neighbors.len() + 1);

        let level = self.random_level();
        self.push_node(level);

        // First (or first-after-total-deletion) node: becomes the entry point,
        // no links are drawn.
        let Some(entry) = self.entry_point else {
            self.entry_point = Some(new_id);
            return;
        };

        let vector = store.vector(new_id);
        let entry_top = self.top_layer(entry);
        let mut visited = VisitedSet::new(self.neighbors.len());
        let mut current = entry;

        // Descent phase: greedy 1-best walk from the entry's top layer down to
        // one above the new node's level.
        for layer in (level + 1..=entry_top).rev() {
            let found = self.search_layer(store, vector, current, 1, layer, &mut visited, None);
            let Some(&(_, nearest)) = found.first() else {
                break;
            };
            current = nearest;
        }

        // Linking phase: connect to the nearest ef_construction candidates on
        // each layer the new node participates in.
        for layer in (0..=level.min(entry_top)).rev() {
            let candidates = self.search_layer(
                store,
                vector,
                current,
                self.config.ef_construction,
                layer,
                &mut visited,
                None,
            );
            if candidates.is_empty() {
                continue;
            }

            let selected: Vec<u32> = candidates
                .iter()
                .take(self.config.m)
                .map(|&(_, id)| id)
                .collect();
            self.neighbors[new_id as usize][layer] = selected.clone();

            for &neighbor in &selected {
                self.neighbors[neighbor as usize][layer].push(new_id);
                if self.neighbors[neighbor as usize][layer].len() > self.config.m {
                    self.evict_farthest(store, neighbor, layer);
                }
            }

            current = candidates[0].1;
        }

        // Promote the new node when it tops out above the old entry point.
        if level > entry_top {
            self.entry_point = Some(new_id);
        }
    }

    /// Drops the single connection of `node` at `layer` that is farthest from
    /// `node` itself; the earliest list index wins distance ties.
    fn evict_farthest(&mut self, store: &VectorStore, node: u32, layer: usize) {
        let base = store.vector(node);
        let mut worst_idx = 0usize;
        let mut worst_dist = f32::NEG_INFINITY;
        for (i, &connected) in self.neighbors[node as usize][layer].iter().enumerate() {
            let dist = store.distance(self.config.metric, base, connected);
            if dist > worst_dist {
                worst_dist = dist;
                worst_idx = i;
            }
        }
        self.neighbors[node as usize][layer].remove(worst_idx);
    }
}

#[cfg(test)]
mod tests {
    use crate::hnsw::graph::{HnswConfig, HnswGraph};
    use crate::hnsw::DistanceMetric;
    use crate::store::VectorStore;

    fn build(config: HnswConfig, vectors: &[[f32; 2]]) -> (HnswGraph, VectorStore) {
        let mut store = VectorStore::new(2, None);
        let mut graph = HnswGraph::new(config);
        for v in vectors {
            let id = store.add_vector(v, Default::default()).unwrap();
            graph.insert(id, &store);
        }
        (graph, store)
    }

    fn small_config(m: usize) -> HnswConfig {
        HnswConfig {
            m,
            ef_construction: 5,
            ef_search: 5,
            metric: DistanceMetric::L2,
        }
    }

    #[test]
    fn test_first_insert_becomes_entry_point() {
        let (graph, _) = build(small_config(2), &[[0.0, 0.0]]);
        assert_eq!(graph.entry_point(), Some(0));
        assert_eq!(graph.len(), 1);
        // No links drawn for the first node
        assert!(graph.neighbors[0].iter().all(|layer| layer.is_empty()));
    }

    #[test]
    fn test_store_and_graph_stay_in_sync() {
        let (graph, store) = build(
            small_config(2),
            &[[0.0, 0.0], [1.0, 1.0], [2.0, 2.0], [3.0, 3.0]],
        );
        assert_eq!(graph.len(), store.len());
    }

    #[test]
    fn test_neighbor_bound_respected() {
        let vectors: Vec<[f32; 2]> = (0..40)
            .map(|i| [(i % 7) as f32, (i / 7) as f32])
            .collect();
        let (graph, _) = build(small_config(2), &vectors);
        for node in 0..graph.len() {
            for (layer, list) in graph.neighbors[node].iter().enumerate() {
                assert!(
                    list.len() <= 2,
                    "node {node} layer {layer} has {} neighbors (M=2)",
                    list.len()
                );
            }
        }
    }

    #[test]
    fn test_no_self_loops_or_duplicates() {
        let vectors: Vec<[f32; 2]> = (0..30).map(|i| [i as f32, (i * i % 13) as f32]).collect();
        let (graph, _) = build(small_config(3), &vectors);
        for node in 0..graph.len() {
            for list in &graph.neighbors[node] {
                assert!(!list.contains(&(node as u32)), "self-loop at node {node}");
                let mut seen = list.clone();
                seen.sort_unstable();
                seen.dedup();
                assert_eq!(seen.len(), list.len(), "duplicate link at node {node}");
            }
        }
    }

    #[test]
    fn test_entry_point_has_maximal_layer() {
        let vectors: Vec<[f32; 2]> = (0..60).map(|i| [i as f32, -(i as f32)]).collect();
        let (graph, _) = build(small_config(2), &vectors);
        let entry = graph.entry_point().unwrap();
        let entry_top = graph.top_layer(entry);
        for node in 0..graph.len() as u32 {
            if !graph.is_deleted(node) {
                assert!(
                    graph.top_layer(node) <= entry_top,
                    "node {node} tops out above the entry point"
                );
            }
        }
    }

    #[test]
    fn test_links_are_bidirectional_for_small_graph() {
        // With 3 nodes and M=2 nothing is ever evicted, so every link must
        // appear in both directions.
        let (graph, _) = build(small_config(2), &[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]);
        for node in 0..graph.len() {
            for (layer, list) in graph.neighbors[node].iter().enumerate() {
                for &other in list {
                    assert!(
                        graph.neighbors[other as usize][layer].contains(&(node as u32)),
                        "link {node} -> {other} at layer {layer} is one-way"
                    );
                }
            }
        }
    }

    #[test]
    fn test_insert_after_all_deleted_restarts_graph() {
        let mut store = VectorStore::new(2, None);
        let mut graph = HnswGraph::new(small_config(2));
        for v in [[0.0f32, 0.0], [1.0, 1.0]] {
            let id = store.add_vector(&v, Default::default()).unwrap();
            graph.insert(id, &store);
        }
        graph.mark_deleted(0);
        graph.mark_deleted(1);
        assert!(graph.entry_point().is_none());

        let id = store.add_vector(&[2.0, 2.0], Default::default()).unwrap();
        graph.insert(id, &store);
        assert_eq!(graph.entry_point(), Some(2));
    }
}
