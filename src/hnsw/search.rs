//! HNSW search: single-layer search, multi-layer k-NN, and result projection.
//!
//! An optional metadata predicate is applied during traversal: nodes that fail
//! it are still used for navigation but excluded from results, which preserves
//! graph navigability under selective filters. Soft-deleted nodes are excluded
//! from both.

use std::collections::BinaryHeap;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::hnsw::graph::HnswGraph;
use crate::hnsw::visited::VisitedSet;
use crate::store::{Metadata, VectorStore};

/// A metadata predicate supplied by the caller. Must be total: it is invoked
/// on every candidate's metadata during traversal.
pub type Predicate<'a> = dyn Fn(&Metadata) -> bool + 'a;

/// Selects which fields of a [`QueryResult`] are populated.
///
/// Unrequested fields are left zero/empty. Defaults to id only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Include {
    /// Populate [`QueryResult::id`].
    pub id: bool,
    /// Populate [`QueryResult::distance`], recomputed from the stored float
    /// vector with the configured metric (never from the quantized code).
    pub distance: bool,
    /// Populate [`QueryResult::metadata`] with a copy of the node's metadata.
    pub metadata: bool,
    /// Populate [`QueryResult::vector`] with a copy of the stored vector.
    pub vector: bool,
}

impl Include {
    /// Id only — the default projection.
    pub const ID: Include = Include {
        id: true,
        distance: false,
        metadata: false,
        vector: false,
    };

    /// Every field.
    pub const ALL: Include = Include {
        id: true,
        distance: true,
        metadata: true,
        vector: true,
    };
}

impl Default for Include {
    fn default() -> Self {
        Self::ID
    }
}

/// A single k-NN search hit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Node id; 0 when not requested.
    pub id: u32,
    /// Exact distance from the query to the stored vector; 0.0 when not requested.
    pub distance: f32,
    /// Metadata copy; empty when not requested.
    pub metadata: Metadata,
    /// Vector copy; empty when not requested.
    pub vector: Vec<f32>,
}

/// A traversal candidate: (negated distance, id).
/// `BinaryHeap` is a max-heap; negating the distance yields min-heap behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Candidate {
    neg_distance: OrderedFloat<f32>,
    id: u32,
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.neg_distance.cmp(&other.neg_distance)
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// A retained result: (distance, id). Max-heap by distance so the worst entry
/// is always on top for eviction.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ResultEntry {
    distance: OrderedFloat<f32>,
    id: u32,
}

impl Ord for ResultEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.distance.cmp(&other.distance)
    }
}

impl PartialOrd for ResultEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl HnswGraph {
    /// Searches a single layer, returning up to `ef` result ids with their
    /// distances in ascending order.
    ///
    /// The entry node always seeds the frontier so traversal can proceed, but
    /// joins the results only when it is live and predicate-accepted. `visited`
    /// is reused across calls and cleared here.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn search_layer(
        &self,
        store: &VectorStore,
        query: &[f32],
        entry: u32,
        ef: usize,
        layer: usize,
        visited: &mut VisitedSet,
        predicate: Option<&Predicate<'_>>,
    ) -> Vec<(f32, u32)> {
        visited.clear();
        let mut frontier: BinaryHeap<Candidate> = BinaryHeap::with_capacity(ef * 2);
        let mut results: BinaryHeap<ResultEntry> = BinaryHeap::with_capacity(ef + 1);

        let accepts =
            |id: u32| predicate.map_or(true, |filter| filter(store.metadata(id)));

        let entry_dist = store.distance(self.config.metric, query, entry);
        frontier.push(Candidate {
            neg_distance: OrderedFloat(-entry_dist),
            id: entry,
        });
        visited.insert(entry);
        if !self.is_deleted(entry) && accepts(entry) {
            results.push(ResultEntry {
                distance: OrderedFloat(entry_dist),
                id: entry,
            });
        }

        while let Some(candidate) = frontier.pop() {
            let c_dist = -candidate.neg_distance.0;

            // No unexplored point can improve a full result set.
            if results.len() >= ef
                && c_dist > results.peek().map_or(f32::INFINITY, |r| r.distance.0)
            {
                break;
            }

            let node = candidate.id as usize;
            if layer >= self.neighbors[node].len() {
                continue;
            }

            for &neighbor in &self.neighbors[node][layer] {
                if !visited.insert(neighbor) {
                    continue;
                }
                if self.deleted[neighbor as usize] {
                    continue;
                }

                let dist = store.distance(self.config.metric, query, neighbor);
                let worst = results.peek().map_or(f32::INFINITY, |r| r.distance.0);
                if results.len() < ef || dist < worst {
                    frontier.push(Candidate {
                        neg_distance: OrderedFloat(-dist),
                        id: neighbor,
                    });
                    if accepts(neighbor) {
                        results.push(ResultEntry {
                            distance: OrderedFloat(dist),
                            id: neighbor,
                        });
                        while results.len() > ef {
                            results.pop();
                        }
                    }
                }
            }
        }

        results
            .into_sorted_vec()
            .into_iter()
            .map(|r| (r.distance.0, r.id))
            .collect()
    }

    /// Multi-layer k-nearest-neighbor search.
    ///
    /// Greedily descends from the entry point to layer 1, then widens to
    /// `ef = max(k, ef_search)` at layer 0. Results are projected according to
    /// `include`.
    pub fn k_nearest(
        &self,
        store: &VectorStore,
        query: &[f32],
        k: usize,
        predicate: Option<&Predicate<'_>>,
        include: Include,
    ) -> Vec<QueryResult> {
        let Some(entry) = self.entry_point else {
            return Vec::new();
        };

        let mut visited = VisitedSet::new(self.len());
        let mut current = entry;
        for layer in (1..=self.top_layer(entry)).rev() {
            let found = self.search_layer(store, query, current, 1, layer, &mut visited, predicate);
            if let Some(&(_, nearest)) = found.first() {
                current = nearest;
            }
        }

        let ef = self.config.ef_search.max(k);
        let candidates = self.search_layer(store, query, current, ef, 0, &mut visited, predicate);

        let mut out = Vec::with_capacity(k.min(candidates.len()));
        for (_, id) in candidates {
            if self.is_deleted(id) {
                continue;
            }
            if out.len() >= k {
                break;
            }
            let mut result = QueryResult::default();
            if include.id {
                result.id = id;
            }
            if include.distance {
                result.distance = self.config.metric.distance(query, store.vector(id));
            }
            if include.metadata {
                result.metadata = store.metadata(id).clone();
            }
            if include.vector {
                result.vector = store.vector(id).to_vec();
            }
            out.push(result);
        }
        out
    }
}
