//! Scalar quantizer implementation.
//!
//! Each dimension is mapped to `[0, 255]` by the min/max range observed during
//! training. A zero-width range collapses to byte 0 and decodes back to the
//! dimension's minimum. Out-of-range inputs are clamped on encode so vectors
//! inserted after training stay representable.

use crate::config::QUANT_LEVELS;
use crate::error::{Error, Result};

/// Per-dimension uniform 8-bit scalar quantizer.
///
/// Untrained until [`train`](ScalarQuantizer::train) observes at least one
/// vector; encode and decode fail with
/// [`Error::UntrainedQuantizer`] before that.
#[derive(Debug, Clone)]
pub struct ScalarQuantizer {
    dim: usize,
    mins: Vec<f32>,
    maxs: Vec<f32>,
}

impl ScalarQuantizer {
    /// Creates an untrained quantizer for vectors of the given dimension.
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            mins: Vec::new(),
            maxs: Vec::new(),
        }
    }

    /// Reconstructs a trained quantizer from snapshot state.
    pub(crate) fn from_parts(mins: Vec<f32>, maxs: Vec<f32>) -> Self {
        debug_assert_eq!(mins.len(), maxs.len());
        Self {
            dim: mins.len(),
            mins,
            maxs,
        }
    }

    /// The dimension this quantizer was built for.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Returns `true` once a training pass has populated the ranges.
    pub fn is_trained(&self) -> bool {
        !self.mins.is_empty()
    }

    /// Per-dimension minima learned by the last training pass.
    pub(crate) fn mins(&self) -> &[f32] {
        &self.mins
    }

    /// Per-dimension maxima learned by the last training pass.
    pub(crate) fn maxs(&self) -> &[f32] {
        &self.maxs
    }

    /// Learns per-dimension min/max over the training vectors.
    ///
    /// An empty training set is a no-op and leaves the previous state (trained
    /// or not) untouched. A non-empty set overwrites any earlier ranges.
    pub fn train<'a, I>(&mut self, vectors: I)
    where
        I: IntoIterator<Item = &'a [f32]>,
    {
        let mut iter = vectors.into_iter();
        let Some(first) = iter.next() else {
            return;
        };
        debug_assert_eq!(first.len(), self.dim);

        let mut mins = first.to_vec();
        let mut maxs = first.to_vec();
        for vec in iter {
            debug_assert_eq!(vec.len(), self.dim);
            for (i, &v) in vec.iter().enumerate() {
                if v < mins[i] {
                    mins[i] = v;
                }
                if v > maxs[i] {
                    maxs[i] = v;
                }
            }
        }
        self.mins = mins;
        self.maxs = maxs;
    }

    /// Encodes a float vector to one byte per dimension.
    ///
    /// Components outside the trained range are clamped to the range edges.
    pub fn encode(&self, vector: &[f32]) -> Result<Vec<u8>> {
        if !self.is_trained() {
            return Err(Error::UntrainedQuantizer);
        }
        debug_assert_eq!(vector.len(), self.dim);

        let mut encoded = Vec::with_capacity(self.dim);
        for i in 0..self.dim {
            let range = self.maxs[i] - self.mins[i];
            if range == 0.0 {
                encoded.push(0u8);
            } else {
                let scaled = (vector[i] - self.mins[i]) / range;
                encoded.push((scaled * QUANT_LEVELS).round().clamp(0.0, QUANT_LEVELS) as u8);
            }
        }
        Ok(encoded)
    }

    /// Decodes a code back to float space. Lossy.
    pub fn decode(&self, code: &[u8]) -> Result<Vec<f32>> {
        if !self.is_trained() {
            return Err(Error::UntrainedQuantizer);
        }
        debug_assert_eq!(code.len(), self.dim);

        let mut decoded = Vec::with_capacity(self.dim);
        for i in 0..self.dim {
            let range = self.maxs[i] - self.mins[i];
            if range == 0.0 {
                decoded.push(self.mins[i]);
            } else {
                decoded.push(self.mins[i] + (code[i] as f32 / QUANT_LEVELS) * range);
            }
        }
        Ok(decoded)
    }

    /// Asymmetric squared-L2 distance between a float query and an encoded vector.
    ///
    /// The code is decoded dimension-by-dimension on the fly; the query keeps
    /// full f32 precision. Callers must only reach this through a trained
    /// quantizer.
    pub fn distance_to_code(&self, query: &[f32], code: &[u8]) -> f32 {
        debug_assert!(self.is_trained());
        debug_assert_eq!(query.len(), self.dim);
        debug_assert_eq!(code.len(), self.dim);

        let mut sum = 0.0f32;
        for i in 0..self.dim {
            let range = self.maxs[i] - self.mins[i];
            let decoded = if range == 0.0 {
                self.mins[i]
            } else {
                self.mins[i] + (code[i] as f32 / QUANT_LEVELS) * range
            };
            let diff = query[i] - decoded;
            sum += diff * diff;
        }
        sum
    }
}
