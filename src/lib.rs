//! # litevec
//!
//! A lightweight in-memory vector database with HNSW approximate nearest
//! neighbor search, optional 8-bit scalar quantization, and single-file
//! snapshots.
//!
//! ## Features
//!
//! - **HNSW vector search** over squared-L2, cosine, or inner-product distance
//! - **Scalar quantization** (f32 → u8) with asymmetric query-to-code distances
//!   for 4× memory reduction on the stored side
//! - **Metadata filtering** via caller-supplied predicates applied during graph
//!   traversal (filtered nodes still navigate, they just never surface)
//! - **Soft deletes** with offline rebuild/compaction
//! - **Single-file snapshots** in a fixed little-endian binary layout
//!
//! ## Architecture
//!
//! ```text
//! Database (facade, read-only gate, snapshot I/O)
//!   ├── HnswGraph   — multi-layer neighbor lists, entry point, soft deletes
//!   ├── VectorStore — float arena + metadata + u8 code arena
//!   └── ScalarQuantizer (optional, shared by store and rebuild)
//! ```
//!
//! The core is single-threaded: callers requiring parallel writers must
//! serialize all mutating operations externally.
//!
//! ## Example
//!
//! ```
//! use litevec::{Database, DatabaseConfig, Include};
//!
//! # fn main() -> litevec::Result<()> {
//! let dir = std::env::temp_dir().join("litevec-doc-example");
//! # let _ = std::fs::remove_file(&dir);
//! let mut db = Database::open(&dir, DatabaseConfig::new(2))?;
//! db.insert(&[0.0, 0.0], Default::default())?;
//! db.insert(&[1.0, 0.0], Default::default())?;
//! let hits = db.query(&[0.1, 0.1], 1, None, Include::ID)?;
//! assert_eq!(hits[0].id, 0);
//! # Ok(())
//! # }
//! ```

/// Global configuration constants: HNSW defaults and quantization levels.
pub mod config;
/// Database facade: open/insert/update/delete/query/rebuild/save/load.
pub mod database;
/// Typed error enum and crate-wide `Result` alias.
pub mod error;
/// HNSW approximate nearest neighbor index: graph, search, insertion, metrics.
pub mod hnsw;
/// Scalar quantization: f32 → u8 with per-dimension min/max calibration.
pub mod quantization;
/// Single-file binary snapshot reader and writer.
pub mod snapshot;
/// Vector store: float arena, metadata, and encoded companions.
pub mod store;

pub use database::{Database, DatabaseConfig};
pub use error::{Error, Result};
pub use hnsw::{DistanceMetric, HnswConfig, Include, Predicate, QueryResult};
pub use snapshot::SyncMode;
pub use store::Metadata;
