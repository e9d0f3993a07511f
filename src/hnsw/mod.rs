//! Hierarchical Navigable Small World (HNSW) approximate nearest neighbor index.
//!
//! The graph references nodes by dense id and delegates all vector access and
//! distance computation to the [`VectorStore`](crate::store::VectorStore) — so
//! when a trained scalar quantizer is attached, construction and search both
//! run on asymmetric f32-query-vs-u8-code distances without the graph knowing.
//!
//! Deletions are soft: marked nodes stay in the graph for navigation and are
//! filtered out of results at query time. Compaction happens only through
//! [`Database::rebuild_index`](crate::database::Database::rebuild_index).

/// Distance metrics: squared L2, cosine, and negated inner product.
pub mod distance;
/// HNSW graph arena, configuration, and soft-delete bookkeeping.
pub mod graph;
/// HNSW insertion with bidirectional links and farthest-neighbor eviction.
pub mod insert;
/// HNSW search: single-layer search, multi-layer k-NN, and result projection.
pub mod search;
/// Generation-based visited set for efficient graph traversal.
pub mod visited;

pub use distance::DistanceMetric;
pub use graph::{HnswConfig, HnswGraph};
pub use search::{Include, Predicate, QueryResult};
