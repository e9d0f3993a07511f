//! Database facade: binds the HNSW graph, the vector store, and the optional
//! scalar quantizer to a file path.
//!
//! The facade assumes exclusive access during mutation — callers provide
//! serialization. `update` is delete + insert and therefore **changes the id**;
//! callers must treat the returned id as authoritative.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config;
use crate::error::{Error, Result};
use crate::hnsw::{DistanceMetric, HnswConfig, HnswGraph, Include, Predicate, QueryResult};
use crate::quantization::ScalarQuantizer;
use crate::snapshot::{self, SyncMode};
use crate::store::{Metadata, VectorStore};

/// Construction parameters for [`Database::open`].
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Fixed dimension of every stored vector.
    pub dimension: usize,
    /// Bidirectional links per HNSW node per layer.
    pub m: usize,
    /// Candidate list size during index construction.
    pub ef_construction: usize,
    /// Candidate list size during search.
    pub ef_search: usize,
    /// Distance metric, fixed for the database lifetime.
    pub metric: DistanceMetric,
    /// Open read-only: load the snapshot immediately and reject all mutation.
    pub read_only: bool,
    /// Attach an 8-bit scalar quantizer. Only valid with [`DistanceMetric::L2`].
    pub quantization: bool,
}

impl DatabaseConfig {
    /// Defaults for the given dimension: M = 16, efConstruction = 200,
    /// efSearch = 50, L2, writable, no quantization.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            m: config::DEFAULT_M,
            ef_construction: config::DEFAULT_EF_CONSTRUCTION,
            ef_search: config::DEFAULT_EF_SEARCH,
            metric: DistanceMetric::L2,
            read_only: false,
            quantization: false,
        }
    }
}

/// An in-memory vector database persisted through single-file snapshots.
#[derive(Debug)]
pub struct Database {
    path: PathBuf,
    read_only: bool,
    quantizer: Option<Arc<RwLock<ScalarQuantizer>>>,
    store: VectorStore,
    graph: HnswGraph,
}

impl Database {
    /// Opens a database bound to `path`.
    ///
    /// Enabling quantization together with a non-L2 metric is rejected with
    /// [`Error::QuantizerMetric`] — the quantizer only preserves squared-L2
    /// semantics. In read-only mode the snapshot is loaded immediately; a
    /// missing file yields an empty database.
    pub fn open(path: impl Into<PathBuf>, config: DatabaseConfig) -> Result<Self> {
        if config.quantization && config.metric != DistanceMetric::L2 {
            return Err(Error::QuantizerMetric(config.metric));
        }

        let quantizer = config
            .quantization
            .then(|| Arc::new(RwLock::new(ScalarQuantizer::new(config.dimension))));
        let store = VectorStore::new(config.dimension, quantizer.clone());
        let graph = HnswGraph::new(HnswConfig {
            m: config.m,
            ef_construction: config.ef_construction,
            ef_search: config.ef_search,
            metric: config.metric,
        });

        let mut db = Self {
            path: path.into(),
            read_only: config.read_only,
            quantizer,
            store,
            graph,
        };
        if db.read_only {
            db.load()?;
        }
        Ok(db)
    }

    /// Inserts a vector with its metadata and returns the new node id.
    ///
    /// Ids are dense: two successive inserts return n and n + 1.
    pub fn insert(&mut self, vector: &[f32], metadata: Metadata) -> Result<u32> {
        if self.read_only {
            return Err(Error::ReadOnly);
        }
        let id = self.store.add_vector(vector, metadata)?;
        self.graph.insert(id, &self.store);
        Ok(id)
    }

    /// Replaces a record: soft-deletes `id`, inserts the new vector, and
    /// returns the **new** id. Absent ids are tolerated (the delete is a
    /// no-op; the insert still happens).
    pub fn update(&mut self, id: u32, vector: &[f32], metadata: Metadata) -> Result<u32> {
        if self.read_only {
            return Err(Error::ReadOnly);
        }
        self.delete(id)?;
        self.insert(vector, metadata)
    }

    /// Soft-deletes a record. Deleting an absent or already-deleted id is
    /// silently idempotent.
    pub fn delete(&mut self, id: u32) -> Result<()> {
        if self.read_only {
            return Err(Error::ReadOnly);
        }
        self.graph.mark_deleted(id);
        Ok(())
    }

    /// k-nearest-neighbor search with an optional metadata predicate.
    ///
    /// The predicate filters which nodes may appear in the result but never
    /// what is traversed. Requested fields are populated per `include`;
    /// distance, when requested, is recomputed from the stored float vector.
    pub fn query(
        &self,
        query: &[f32],
        k: usize,
        predicate: Option<&Predicate<'_>>,
        include: Include,
    ) -> Result<Vec<QueryResult>> {
        if query.len() != self.store.dimension() {
            return Err(Error::DimensionMismatch {
                expected: self.store.dimension(),
                actual: query.len(),
            });
        }
        Ok(self.graph.k_nearest(&self.store, query, k, predicate, include))
    }

    /// Trains the scalar quantizer on every stored vector (soft-deleted rows
    /// included — the quantizer learns the full empirical range), then
    /// re-encodes the store. A no-op when no quantizer is attached or the
    /// store is empty.
    pub fn train_quantizer(&mut self) {
        let Some(quantizer) = &self.quantizer else {
            return;
        };
        quantizer.write().train(self.store.iter_vectors());
        tracing::debug!(
            vectors = self.store.len(),
            trained = quantizer.read().is_trained(),
            "trained scalar quantizer"
        );
        self.store.encode_all();
    }

    /// Rebuilds the index from the live records, compacting away soft deletes.
    ///
    /// Trains the quantizer first, then re-inserts every non-deleted record in
    /// ascending id order into a fresh graph and store sharing the same
    /// quantizer handle, and finally swaps both in. Ids are renumbered densely
    /// from 0 and the soft-delete set comes back empty. Peak memory is about
    /// twice the database size while old and new coexist.
    pub fn rebuild_index(&mut self) -> Result<()> {
        if self.read_only {
            return Err(Error::ReadOnly);
        }
        self.train_quantizer();

        let mut store = VectorStore::new(self.store.dimension(), self.quantizer.clone());
        let mut graph = HnswGraph::new(self.graph.config.clone());
        for id in 0..self.store.len() as u32 {
            if self.graph.is_deleted(id) {
                continue;
            }
            let new_id = store.add_vector(self.store.vector(id), self.store.metadata(id).clone())?;
            graph.insert(new_id, &store);
        }

        tracing::info!(
            live = store.len(),
            dropped = self.store.len() - store.len(),
            "rebuilt index"
        );
        self.store = store;
        self.graph = graph;
        Ok(())
    }

    /// Writes the snapshot file. [`SyncMode::Full`] additionally fsyncs before
    /// returning; the other modes leave flushing to the OS.
    pub fn save(&self, mode: SyncMode) -> Result<()> {
        if self.read_only {
            return Err(Error::ReadOnly);
        }
        let quantizer = self.quantizer.as_ref().map(|q| q.read());
        snapshot::write_snapshot(
            &self.path,
            &self.graph,
            &self.store,
            quantizer.as_deref(),
            mode,
        )
    }

    /// Loads the snapshot file bound at construction.
    ///
    /// A missing file is a no-op (the database stays empty). The file's
    /// dimension and graph parameters must match the open configuration;
    /// any disagreement fails with [`Error::SnapshotMismatch`].
    pub fn load(&mut self) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        let snap = snapshot::read_snapshot(&self.path)?;

        let configured = &self.graph.config;
        if snap.dimension != self.store.dimension() {
            return Err(Error::SnapshotMismatch(format!(
                "dimension {} in file, database opened with {}",
                snap.dimension,
                self.store.dimension()
            )));
        }
        if snap.m != configured.m
            || snap.ef_construction != configured.ef_construction
            || snap.ef_search != configured.ef_search
        {
            return Err(Error::SnapshotMismatch(format!(
                "graph parameters (M={}, efC={}, efS={}) in file, database opened with (M={}, efC={}, efS={})",
                snap.m,
                snap.ef_construction,
                snap.ef_search,
                configured.m,
                configured.ef_construction,
                configured.ef_search
            )));
        }
        if snap.metric != configured.metric {
            return Err(Error::SnapshotMismatch(format!(
                "metric {:?} in file, database opened with {:?}",
                snap.metric, configured.metric
            )));
        }
        if let Some(sq) = &snap.quantizer {
            if snap.metric != DistanceMetric::L2 {
                return Err(Error::QuantizerMetric(snap.metric));
            }
            if sq.dim() != self.store.dimension() {
                return Err(Error::SnapshotMismatch(format!(
                    "quantizer dimension {} in file, database opened with {}",
                    sq.dim(),
                    self.store.dimension()
                )));
            }
        }

        // Adopt the file's quantizer state, reusing the existing handle so the
        // store and any clones keep observing the same quantizer.
        if let Some(sq) = snap.quantizer {
            match self.quantizer.take() {
                Some(handle) => {
                    *handle.write() = sq;
                    self.quantizer = Some(handle);
                }
                None => self.quantizer = Some(Arc::new(RwLock::new(sq))),
            }
        }

        let num_nodes = snap.layers.len();
        let dimension = snap.dimension;
        let mut store = VectorStore::new(dimension, self.quantizer.clone());
        for (i, meta) in snap.metadata.into_iter().enumerate() {
            store.add_vector(&snap.vectors[i * dimension..(i + 1) * dimension], meta)?;
        }

        let mut deleted = vec![false; num_nodes];
        for id in snap.deleted {
            match deleted.get_mut(id as usize) {
                Some(flag) => *flag = true,
                None => {
                    tracing::warn!(id, "snapshot lists an out-of-range deleted id; ignoring")
                }
            }
        }

        let mut graph = HnswGraph::from_parts(
            self.graph.config.clone(),
            snap.neighbors,
            snap.layers,
            deleted,
        );
        graph.recompute_entry_point();

        self.store = store;
        self.graph = graph;
        Ok(())
    }

    /// Number of records, soft-deleted included.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Returns `true` when no records are stored at all.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Number of soft-deleted records awaiting compaction.
    pub fn deleted_count(&self) -> usize {
        self.graph.deleted_count()
    }

    /// The fixed vector dimension.
    pub fn dimension(&self) -> usize {
        self.store.dimension()
    }

    /// Returns `true` when the database rejects mutation.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }
}
