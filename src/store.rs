//! Vector store: the authoritative float vectors and their metadata.
//!
//! Vectors live in a flat arena (one contiguous `Vec<f32>` with a fixed
//! dimension stride) so row access is an O(1) slice. When a trained scalar
//! quantizer is attached, a parallel u8 code arena is maintained and node-side
//! distances are computed asymmetrically against it.
//!
//! Rows are append-only: nothing is ever removed from the store. Soft deletion
//! is tracked by the graph, and compaction rebuilds a fresh store.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::hnsw::DistanceMetric;
use crate::quantization::ScalarQuantizer;

/// String-keyed metadata attached to a stored vector. No schema; empty is valid.
pub type Metadata = HashMap<String, String>;

/// Owns float vectors, metadata, and (optionally) their quantized companions.
#[derive(Debug)]
pub struct VectorStore {
    dimension: usize,
    /// Flat arena: row `i` occupies `[i * dimension, (i + 1) * dimension)`.
    vectors: Vec<f32>,
    metadata: Vec<Metadata>,
    /// Flat code arena, same stride; populated only while the attached
    /// quantizer is trained.
    encoded: Vec<u8>,
    quantizer: Option<Arc<RwLock<ScalarQuantizer>>>,
}

impl VectorStore {
    /// Creates an empty store for vectors of the given dimension.
    pub fn new(dimension: usize, quantizer: Option<Arc<RwLock<ScalarQuantizer>>>) -> Self {
        Self {
            dimension,
            vectors: Vec::new(),
            metadata: Vec::new(),
            encoded: Vec::new(),
            quantizer,
        }
    }

    /// The fixed dimension every stored vector must have.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of stored rows (soft-deleted rows included).
    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    /// Returns `true` if no rows are stored.
    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    /// Appends a vector with its metadata and returns the new node id.
    ///
    /// Fails with [`Error::DimensionMismatch`] when the vector's length is not
    /// the store dimension; the store is left untouched in that case. When a
    /// trained quantizer is attached the vector's code is appended too.
    pub fn add_vector(&mut self, vector: &[f32], metadata: Metadata) -> Result<u32> {
        if vector.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        if let Some(quantizer) = &self.quantizer {
            let quantizer = quantizer.read();
            if quantizer.is_trained() {
                let code = quantizer.encode(vector)?;
                self.encoded.extend_from_slice(&code);
            }
        }
        self.vectors.extend_from_slice(vector);
        self.metadata.push(metadata);
        Ok((self.metadata.len() - 1) as u32)
    }

    /// The stored float vector for a node. O(1) slice into the arena.
    #[inline]
    pub fn vector(&self, id: u32) -> &[f32] {
        let start = id as usize * self.dimension;
        &self.vectors[start..start + self.dimension]
    }

    /// The metadata for a node.
    #[inline]
    pub fn metadata(&self, id: u32) -> &Metadata {
        &self.metadata[id as usize]
    }

    /// The encoded vector for a node.
    ///
    /// Fails when no quantizer is attached ([`Error::NoQuantizer`]) or the
    /// attached quantizer is untrained ([`Error::UntrainedQuantizer`]).
    pub fn encoded(&self, id: u32) -> Result<&[u8]> {
        let quantizer = self.quantizer.as_ref().ok_or(Error::NoQuantizer)?;
        if !quantizer.read().is_trained() {
            return Err(Error::UntrainedQuantizer);
        }
        let start = id as usize * self.dimension;
        Ok(&self.encoded[start..start + self.dimension])
    }

    /// Re-encodes every stored vector against the quantizer's current ranges.
    ///
    /// Called after (re)training so the code arena is consistent. A no-op when
    /// no quantizer is attached or it is still untrained.
    pub fn encode_all(&mut self) {
        let Some(quantizer) = &self.quantizer else {
            return;
        };
        let quantizer = quantizer.read();
        if !quantizer.is_trained() {
            return;
        }
        let mut encoded = Vec::with_capacity(self.vectors.len());
        for row in self.vectors.chunks_exact(self.dimension) {
            // Trained-ness checked above; encode cannot fail here.
            let code = quantizer
                .encode(row)
                .expect("quantizer is trained after guard");
            encoded.extend_from_slice(&code);
        }
        self.encoded = encoded;
    }

    /// Iterates the stored float vectors in id order, soft-deleted rows
    /// included (quantizer training wants the full empirical range).
    pub fn iter_vectors(&self) -> impl Iterator<Item = &[f32]> {
        self.vectors.chunks_exact(self.dimension)
    }

    /// Node-side distance from a float query to the stored node `id`.
    ///
    /// With a trained quantizer attached this is the asymmetric
    /// query-to-code distance (squared L2); otherwise the configured metric
    /// over the stored float vector. The query side always stays in float
    /// space.
    #[inline]
    pub(crate) fn distance(&self, metric: DistanceMetric, query: &[f32], id: u32) -> f32 {
        if let Some(quantizer) = &self.quantizer {
            let quantizer = quantizer.read();
            if quantizer.is_trained() {
                let start = id as usize * self.dimension;
                return quantizer
                    .distance_to_code(query, &self.encoded[start..start + self.dimension]);
            }
        }
        metric.distance(query, self.vector(id))
    }

    /// Returns `true` when a trained quantizer currently backs distances.
    pub fn has_trained_quantizer(&self) -> bool {
        self.quantizer
            .as_ref()
            .is_some_and(|quantizer| quantizer.read().is_trained())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(pairs: &[(&str, &str)]) -> Metadata {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    fn quantizer(dim: usize) -> Arc<RwLock<ScalarQuantizer>> {
        Arc::new(RwLock::new(ScalarQuantizer::new(dim)))
    }

    #[test]
    fn test_add_and_get() {
        let mut store = VectorStore::new(2, None);
        let id0 = store.add_vector(&[1.0, 2.0], meta(&[("key", "value1")])).unwrap();
        let id1 = store.add_vector(&[3.0, 4.0], meta(&[("key", "value2")])).unwrap();
        assert_eq!((id0, id1), (0, 1));
        assert_eq!(store.len(), 2);
        assert_eq!(store.vector(0), &[1.0, 2.0]);
        assert_eq!(store.vector(1), &[3.0, 4.0]);
        assert_eq!(store.metadata(0), &meta(&[("key", "value1")]));
        assert_eq!(store.metadata(1), &meta(&[("key", "value2")]));
    }

    #[test]
    fn test_dimension_mismatch_leaves_store_unchanged() {
        let mut store = VectorStore::new(2, None);
        store.add_vector(&[1.0, 2.0], Metadata::new()).unwrap();
        let err = store.add_vector(&[1.0, 2.0, 3.0], Metadata::new());
        assert!(matches!(
            err,
            Err(Error::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_encoded_requires_quantizer() {
        let mut store = VectorStore::new(2, None);
        store.add_vector(&[1.0, 2.0], Metadata::new()).unwrap();
        assert!(matches!(store.encoded(0), Err(Error::NoQuantizer)));
    }

    #[test]
    fn test_encoded_requires_training() {
        let mut store = VectorStore::new(2, Some(quantizer(2)));
        store.add_vector(&[1.0, 2.0], Metadata::new()).unwrap();
        assert!(matches!(store.encoded(0), Err(Error::UntrainedQuantizer)));
    }

    #[test]
    fn test_encode_all_after_training() {
        let sq = quantizer(2);
        let mut store = VectorStore::new(2, Some(Arc::clone(&sq)));
        store.add_vector(&[0.0, 0.0], Metadata::new()).unwrap();
        store.add_vector(&[1.0, 10.0], Metadata::new()).unwrap();

        sq.write().train(store.iter_vectors());
        store.encode_all();

        assert_eq!(store.encoded(0).unwrap(), &[0, 0]);
        assert_eq!(store.encoded(1).unwrap(), &[255, 255]);
    }

    #[test]
    fn test_add_vector_encodes_once_trained() {
        let sq = quantizer(1);
        let mut store = VectorStore::new(1, Some(Arc::clone(&sq)));
        store.add_vector(&[0.0], Metadata::new()).unwrap();
        store.add_vector(&[10.0], Metadata::new()).unwrap();
        sq.write().train(store.iter_vectors());
        store.encode_all();

        // Appended after training: encoded immediately, clamped into range
        let id = store.add_vector(&[5.0], Metadata::new()).unwrap();
        assert_eq!(store.encoded(id).unwrap(), &[128]);
        let id = store.add_vector(&[42.0], Metadata::new()).unwrap();
        assert_eq!(store.encoded(id).unwrap(), &[255]);
    }

    #[test]
    fn test_distance_without_quantizer_uses_metric() {
        let mut store = VectorStore::new(2, None);
        store.add_vector(&[3.0, 4.0], Metadata::new()).unwrap();
        let d = store.distance(DistanceMetric::L2, &[0.0, 0.0], 0);
        assert!((d - 25.0).abs() < 1e-6);
    }

    #[test]
    fn test_distance_with_trained_quantizer_is_asymmetric() {
        let sq = quantizer(2);
        let mut store = VectorStore::new(2, Some(Arc::clone(&sq)));
        store.add_vector(&[0.0, 0.0], Metadata::new()).unwrap();
        store.add_vector(&[8.0, 8.0], Metadata::new()).unwrap();
        sq.write().train(store.iter_vectors());
        store.encode_all();
        assert!(store.has_trained_quantizer());

        let exact = DistanceMetric::L2.distance(&[1.0, 1.0], &[8.0, 8.0]);
        let asym = store.distance(DistanceMetric::L2, &[1.0, 1.0], 1);
        // Quantization error on an 8-wide range is tiny
        assert!((exact - asym).abs() < 0.5, "exact={exact}, asym={asym}");
    }

    #[test]
    fn test_iter_vectors_order() {
        let mut store = VectorStore::new(2, None);
        store.add_vector(&[1.0, 2.0], Metadata::new()).unwrap();
        store.add_vector(&[3.0, 4.0], Metadata::new()).unwrap();
        let rows: Vec<&[f32]> = store.iter_vectors().collect();
        assert_eq!(rows, vec![&[1.0f32, 2.0][..], &[3.0, 4.0]]);
    }
}
