//! Scalar quantization: f32 → u8 compression with per-dimension min/max calibration.
//!
//! The quantizer learns a global per-dimension range from a training pass over the
//! stored vectors and encodes each component to 8 bits. Distances against encoded
//! vectors are asymmetric: the float query is compared to the lazily decoded code,
//! so the query side never loses precision.

/// Per-dimension uniform scalar quantizer.
pub mod scalar;

pub use scalar::ScalarQuantizer;
