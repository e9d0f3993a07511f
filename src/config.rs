//! Global configuration constants for litevec.
//!
//! Compile-time defaults; per-database tuning is done through
//! [`DatabaseConfig`](crate::database::DatabaseConfig).

/// Default number of bidirectional links per HNSW node.
///
/// Higher values improve recall but increase memory and build time.
/// Typical range: 8–64. Default: 16.
pub const DEFAULT_M: usize = 16;

/// Default ef parameter during HNSW index construction.
///
/// Controls the size of the dynamic candidate list during insertion.
/// Higher values produce a better graph but slow down build time.
pub const DEFAULT_EF_CONSTRUCTION: usize = 200;

/// Default ef parameter during HNSW search.
///
/// Controls the size of the dynamic candidate list during query.
/// Higher values improve recall at the cost of latency.
pub const DEFAULT_EF_SEARCH: usize = 50;

/// Number of representable quantization levels above zero (u8 codes span 0..=255).
pub const QUANT_LEVELS: f32 = 255.0;
