//! Single-file binary snapshot.
//!
//! The format is little-endian and strictly sequential, with no padding and no
//! framing beyond the listed fields:
//!
//! 1. `sq_enabled` (1 byte). An attached but untrained quantizer is written as
//!    0 — the file never carries half-populated ranges.
//! 2. If enabled: `original_dim` (u64), then `dim` f32 mins and `dim` f32 maxs.
//! 3. `m`, `ef_construction`, `ef_search` (three i32).
//! 4. `metric` (i32: 0 = L2, 1 = cosine, 2 = inner product).
//! 5. `num_nodes` (u64); per node: `id` (u32), `max_layer` (i32), then per
//!    layer `num_neighbors` (u64) followed by that many i32 ids.
//! 6. `num_vectors` (u64), `vector_dimension` (u64); per vector: `dim` f32,
//!    `meta_size` (u64), then per entry length-prefixed key and value bytes
//!    (entries key-sorted so re-saving an unchanged database is byte-identical).
//! 7. `num_deleted` (u64) followed by that many u32 ids, ascending.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::hnsw::{DistanceMetric, HnswGraph};
use crate::quantization::ScalarQuantizer;
use crate::store::{Metadata, VectorStore};

/// Durability mode for [`Database::save`](crate::database::Database::save).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SyncMode {
    /// Flush and fsync before returning.
    #[default]
    Full,
    /// Write through the OS page cache; no explicit fsync.
    Normal,
    /// Same as `Normal`; the distinction is reserved for callers that batch
    /// their own syncs.
    Off,
}

/// Decoded contents of a snapshot file, before validation against the open
/// configuration.
#[derive(Debug)]
pub(crate) struct Snapshot {
    pub quantizer: Option<ScalarQuantizer>,
    pub m: usize,
    pub ef_construction: usize,
    pub ef_search: usize,
    pub metric: DistanceMetric,
    pub neighbors: Vec<Vec<Vec<u32>>>,
    pub layers: Vec<usize>,
    pub dimension: usize,
    /// Flat vector arena, `dimension` stride.
    pub vectors: Vec<f32>,
    pub metadata: Vec<Metadata>,
    pub deleted: Vec<u32>,
}

/// Writes the full database state to `path`, truncating any existing file.
pub(crate) fn write_snapshot(
    path: &Path,
    graph: &HnswGraph,
    store: &VectorStore,
    quantizer: Option<&ScalarQuantizer>,
    mode: SyncMode,
) -> Result<()> {
    let file = File::create(path)?;
    let mut w = BufWriter::new(file);

    let trained = quantizer.filter(|q| q.is_trained());
    w.write_all(&[u8::from(trained.is_some())])?;
    if let Some(q) = trained {
        write_u64(&mut w, q.dim() as u64)?;
        for &v in q.mins() {
            write_f32(&mut w, v)?;
        }
        for &v in q.maxs() {
            write_f32(&mut w, v)?;
        }
    }

    write_i32(&mut w, graph.config.m as i32)?;
    write_i32(&mut w, graph.config.ef_construction as i32)?;
    write_i32(&mut w, graph.config.ef_search as i32)?;
    write_i32(&mut w, graph.config.metric.to_code())?;

    write_u64(&mut w, graph.len() as u64)?;
    for id in 0..graph.len() {
        write_u32(&mut w, id as u32)?;
        write_i32(&mut w, graph.layers[id] as i32)?;
        for layer in &graph.neighbors[id] {
            write_u64(&mut w, layer.len() as u64)?;
            for &neighbor in layer {
                write_i32(&mut w, neighbor as i32)?;
            }
        }
    }

    write_u64(&mut w, store.len() as u64)?;
    write_u64(&mut w, store.dimension() as u64)?;
    for id in 0..store.len() as u32 {
        for &v in store.vector(id) {
            write_f32(&mut w, v)?;
        }
        let meta = store.metadata(id);
        write_u64(&mut w, meta.len() as u64)?;
        let mut entries: Vec<_> = meta.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        for (key, value) in entries {
            write_u64(&mut w, key.len() as u64)?;
            w.write_all(key.as_bytes())?;
            write_u64(&mut w, value.len() as u64)?;
            w.write_all(value.as_bytes())?;
        }
    }

    let deleted: Vec<u32> = (0..graph.len() as u32)
        .filter(|&id| graph.is_deleted(id))
        .collect();
    write_u64(&mut w, deleted.len() as u64)?;
    for id in &deleted {
        write_u32(&mut w, *id)?;
    }

    w.flush()?;
    if mode == SyncMode::Full {
        w.get_ref().sync_all()?;
    }
    let bytes = w.get_ref().metadata()?.len();
    tracing::info!(
        path = %path.display(),
        nodes = graph.len(),
        deleted = deleted.len(),
        bytes,
        "saved snapshot"
    );
    Ok(())
}

/// Reads and structurally validates a snapshot file.
///
/// Parameter consistency with the open configuration is the caller's job; this
/// only rejects files that are internally malformed.
pub(crate) fn read_snapshot(path: &Path) -> Result<Snapshot> {
    let file = File::open(path)?;
    let mut r = BufReader::new(file);

    let sq_enabled = read_u8(&mut r)? != 0;
    let quantizer = if sq_enabled {
        let dim = read_u64(&mut r)? as usize;
        let mins = read_f32_vec(&mut r, dim)?;
        let maxs = read_f32_vec(&mut r, dim)?;
        Some(ScalarQuantizer::from_parts(mins, maxs))
    } else {
        None
    };

    let m = read_count(&mut r, "M")?;
    let ef_construction = read_count(&mut r, "efConstruction")?;
    let ef_search = read_count(&mut r, "efSearch")?;
    let metric_code = read_i32(&mut r)?;
    let metric = DistanceMetric::from_code(metric_code)
        .ok_or_else(|| Error::CorruptSnapshot(format!("unknown metric code {metric_code}")))?;

    let num_nodes = read_u64(&mut r)? as usize;
    let mut layers = Vec::new();
    let mut neighbors = Vec::new();
    for position in 0..num_nodes {
        let id = read_u32(&mut r)?;
        if id as usize != position {
            return Err(Error::CorruptSnapshot(format!(
                "node id {id} at position {position}"
            )));
        }
        let max_layer = read_i32(&mut r)?;
        if max_layer < 0 {
            return Err(Error::CorruptSnapshot(format!(
                "negative max_layer {max_layer} for node {id}"
            )));
        }
        let mut node_layers = Vec::with_capacity(max_layer as usize + 1);
        for _ in 0..=max_layer {
            let count = read_u64(&mut r)? as usize;
            let mut list = Vec::new();
            for _ in 0..count {
                let neighbor = read_i32(&mut r)?;
                if neighbor < 0 || neighbor as usize >= num_nodes {
                    return Err(Error::CorruptSnapshot(format!(
                        "neighbor id {neighbor} out of bounds for node {id}"
                    )));
                }
                list.push(neighbor as u32);
            }
            node_layers.push(list);
        }
        layers.push(max_layer as usize);
        neighbors.push(node_layers);
    }

    // Links may only point at nodes that participate in that layer; forward
    // references make this impossible to check inside the node loop.
    for (id, node_layers) in neighbors.iter().enumerate() {
        for (layer, list) in node_layers.iter().enumerate() {
            for &neighbor in list {
                if layers[neighbor as usize] < layer {
                    return Err(Error::CorruptSnapshot(format!(
                        "node {id} links to {neighbor} at layer {layer}, but {neighbor} tops out at {}",
                        layers[neighbor as usize]
                    )));
                }
            }
        }
    }

    let num_vectors = read_u64(&mut r)? as usize;
    let dimension = read_u64(&mut r)? as usize;
    if num_vectors != num_nodes {
        return Err(Error::CorruptSnapshot(format!(
            "{num_vectors} vectors for {num_nodes} graph nodes"
        )));
    }
    let mut vectors = Vec::new();
    let mut metadata = Vec::new();
    for _ in 0..num_vectors {
        for _ in 0..dimension {
            vectors.push(read_f32(&mut r)?);
        }
        let meta_size = read_u64(&mut r)? as usize;
        let mut meta = Metadata::new();
        for _ in 0..meta_size {
            let key = read_string(&mut r)?;
            let value = read_string(&mut r)?;
            meta.insert(key, value);
        }
        metadata.push(meta);
    }

    let num_deleted = read_u64(&mut r)? as usize;
    let mut deleted = Vec::new();
    for _ in 0..num_deleted {
        deleted.push(read_u32(&mut r)?);
    }

    tracing::info!(
        path = %path.display(),
        nodes = num_nodes,
        deleted = deleted.len(),
        "loaded snapshot"
    );

    Ok(Snapshot {
        quantizer,
        m,
        ef_construction,
        ef_search,
        metric,
        neighbors,
        layers,
        dimension,
        vectors,
        metadata,
        deleted,
    })
}

fn write_u64<W: Write>(w: &mut W, v: u64) -> Result<()> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn write_u32<W: Write>(w: &mut W, v: u32) -> Result<()> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn write_i32<W: Write>(w: &mut W, v: i32) -> Result<()> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn write_f32<W: Write>(w: &mut W, v: f32) -> Result<()> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn read_u8<R: Read>(r: &mut R) -> Result<u8> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_u64<R: Read>(r: &mut R) -> Result<u64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

fn read_u32<R: Read>(r: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_i32<R: Read>(r: &mut R) -> Result<i32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

fn read_f32<R: Read>(r: &mut R) -> Result<f32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(f32::from_le_bytes(buf))
}

fn read_f32_vec<R: Read>(r: &mut R, len: usize) -> Result<Vec<f32>> {
    let mut out = Vec::with_capacity(len);
    for _ in 0..len {
        out.push(read_f32(r)?);
    }
    Ok(out)
}

/// Reads an i32 parameter that must be non-negative.
fn read_count<R: Read>(r: &mut R, name: &str) -> Result<usize> {
    let v = read_i32(r)?;
    if v < 0 {
        return Err(Error::CorruptSnapshot(format!("negative {name}: {v}")));
    }
    Ok(v as usize)
}

fn read_string<R: Read>(r: &mut R) -> Result<String> {
    let len = read_u64(r)? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|_| Error::CorruptSnapshot("non-UTF-8 string".into()))
}
