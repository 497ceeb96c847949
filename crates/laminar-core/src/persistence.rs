//! Symbolic, two-pass persistence: nodes are serialized by id with
//! adjacency as connection-id lists, never raw pointers, and reloaded by
//! first allocating every node, then wiring connections via id lookup.
//! The distance function itself is never persisted — it is implicit in
//! the caller's choice of `Index<M>` at load time.

use crate::config::HnswParams;
use crate::distance::Metric;
use crate::error::{Error, Result};
use crate::graph::{Index, IndexState, Level, Node, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::Arc;

const MAGIC: [u8; 4] = *b"LMN1";
const FORMAT_VERSION: u8 = 1;

#[derive(Serialize, Deserialize)]
struct SerialLevel {
    connection_ids: Vec<NodeId>,
}

#[derive(Serialize, Deserialize)]
struct SerialNode {
    id: NodeId,
    vector: Vec<f64>,
    levels: Vec<SerialLevel>,
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    dim: usize,
    m: usize,
    m_max: usize,
    ef_construction: usize,
    max_level: usize,
    entry_point_id: Option<NodeId>,
    deleted_ids: Vec<NodeId>,
    nodes: Vec<SerialNode>,
}

impl<M: Metric> Index<M> {
    /// Writes a self-describing binary snapshot of the index to `path`.
    /// Takes the global read lock for the duration of the write.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let state = self.state.read();

        let nodes = state
            .nodes
            .values()
            .map(|node| {
                let levels = node
                    .levels
                    .read()
                    .iter()
                    .map(|l| SerialLevel {
                        connection_ids: l.connections.clone(),
                    })
                    .collect();
                SerialNode {
                    id: node.id,
                    vector: node.vector.clone(),
                    levels,
                }
            })
            .collect();

        let snapshot = Snapshot {
            dim: self.dim,
            m: self.params.m,
            m_max: self.params.m_max,
            ef_construction: self.params.ef_construction,
            max_level: state.max_level,
            entry_point_id: state.entry_point,
            deleted_ids: state.deleted_ids.iter().copied().collect(),
            nodes,
        };

        let file = std::fs::File::create(path.as_ref()).map_err(|source| Error::Io {
            operation: "save",
            source,
        })?;
        let mut writer = BufWriter::new(file);

        use std::io::Write;
        writer.write_all(&MAGIC).map_err(|source| Error::Io {
            operation: "save",
            source,
        })?;
        writer.write_all(&[FORMAT_VERSION]).map_err(|source| Error::Io {
            operation: "save",
            source,
        })?;

        bincode::serialize_into(&mut writer, &snapshot).map_err(|e| Error::Io {
            operation: "save",
            source: std::io::Error::other(e),
        })?;

        tracing::info!(path = %path.as_ref().display(), nodes = snapshot.nodes.len(), "saved index snapshot");
        Ok(())
    }

    /// Reads a snapshot written by [`Index::save`] and reconstructs the
    /// graph in two passes: allocate every node with empty adjacency,
    /// then wire each level's connections by looking ids up in the node
    /// table. The caller supplies the distance metric via `M`; it must
    /// match whatever was used to build the saved index.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref()).map_err(|source| Error::Io {
            operation: "load",
            source,
        })?;
        let mut reader = BufReader::new(file);

        use std::io::Read;
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic).map_err(|source| Error::Io {
            operation: "load",
            source,
        })?;
        if magic != MAGIC {
            return Err(Error::Decode("bad magic header".to_string()));
        }
        let mut version = [0u8; 1];
        reader.read_exact(&mut version).map_err(|source| Error::Io {
            operation: "load",
            source,
        })?;
        if version[0] != FORMAT_VERSION {
            return Err(Error::Decode(format!(
                "unsupported snapshot version {}",
                version[0]
            )));
        }

        let snapshot: Snapshot = bincode::deserialize_from(&mut reader)
            .map_err(|e| Error::Decode(e.to_string()))?;

        let params = HnswParams::custom(snapshot.m, snapshot.m_max, snapshot.ef_construction);
        let index = Self::new(snapshot.dim, params)?;

        // Pass 1: allocate every node with empty adjacency.
        let mut nodes: HashMap<NodeId, Arc<Node>> = HashMap::with_capacity(snapshot.nodes.len());
        for serial in &snapshot.nodes {
            let levels = serial
                .levels
                .iter()
                .map(|_| Level::default())
                .collect::<Vec<_>>();
            nodes.insert(
                serial.id,
                Arc::new(Node {
                    id: serial.id,
                    vector: serial.vector.clone(),
                    levels: parking_lot::RwLock::new(levels),
                }),
            );
        }

        // Pass 2: wire connections by id lookup.
        for serial in &snapshot.nodes {
            let node = nodes.get(&serial.id).expect("just inserted");
            let mut levels = node.levels.write();
            for (i, serial_level) in serial.levels.iter().enumerate() {
                levels[i].connections = serial_level
                    .connection_ids
                    .iter()
                    .filter(|id| nodes.contains_key(id))
                    .copied()
                    .collect();
            }
        }

        let mut state = index.state.write();
        *state = IndexState {
            nodes: nodes.into_iter().collect(),
            entry_point: snapshot.entry_point_id,
            max_level: snapshot.max_level,
            deleted_ids: snapshot.deleted_ids.into_iter().collect(),
        };
        drop(state);

        tracing::info!(path = %path.as_ref().display(), nodes = snapshot.nodes.len(), "loaded index snapshot");
        Ok(index)
    }
}
