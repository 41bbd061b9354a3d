//! Graph file (`hnsw.bin`).
//!
//! Layout: 8-byte magic, u64 slot count, i32 max level, u64 entry point,
//! u32 has-entry flag, then per slot an i32 level followed (when the level
//! is non-negative) by `level + 1` neighbor lists, each a u32 degree and
//! that many u32 slot indices.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use tracing::debug;

use super::rw::{read_i32, read_u32, read_u64, write_i32, write_u32, write_u64};
use crate::error::{Result, VecdbError};
use crate::index::{ExportNode, GraphExport};

/// Graph file name inside a collection directory.
pub const HNSW_FILE: &str = "hnsw.bin";

const HNSW_MAGIC: [u8; 8] = *b"HNSWv1\0\0";

/// Write a graph export into a collection directory.
///
/// # Errors
///
/// Returns [`VecdbError::Io`] on write failure.
pub fn save_graph(dir: &Path, export: &GraphExport) -> Result<()> {
    let mut out = BufWriter::new(File::create(dir.join(HNSW_FILE))?);

    out.write_all(&HNSW_MAGIC)?;
    write_u64(&mut out, export.nodes.len() as u64)?;
    write_i32(&mut out, export.max_level)?;
    write_u64(&mut out, export.entry_point as u64)?;
    write_u32(&mut out, u32::from(export.has_entry))?;

    for node in &export.nodes {
        write_i32(&mut out, node.level)?;
        if node.level >= 0 {
            for neighbors in &node.links {
                write_u32(&mut out, neighbors.len() as u32)?;
                for &nb in neighbors {
                    write_u32(&mut out, nb as u32)?;
                }
            }
        }
    }

    out.flush()?;
    debug!(nodes = export.nodes.len(), max_level = export.max_level, "saved graph file");
    Ok(())
}

/// Read the graph file from a collection directory.
///
/// `expected_slots` is the slot count of the store loaded alongside; a
/// graph written against a different slot universe is rejected rather than
/// silently mis-indexed.
///
/// # Errors
///
/// Returns [`VecdbError::CorruptState`] on magic or slot-count mismatch,
/// [`VecdbError::Io`] on read failures (including truncation).
pub fn load_graph(dir: &Path, expected_slots: usize) -> Result<GraphExport> {
    let mut input = BufReader::new(File::open(dir.join(HNSW_FILE))?);

    let mut magic = [0u8; 8];
    input.read_exact(&mut magic)?;
    if magic != HNSW_MAGIC {
        return Err(VecdbError::CorruptState("bad hnsw.bin magic".into()));
    }

    let n = read_u64(&mut input)? as usize;
    if n != expected_slots {
        return Err(VecdbError::CorruptState(format!(
            "hnsw.bin slot count mismatch: graph has {n}, store has {expected_slots}"
        )));
    }

    let max_level = read_i32(&mut input)?;
    let entry_point = read_u64(&mut input)? as usize;
    let has_entry = read_u32(&mut input)? != 0;

    let mut nodes = Vec::with_capacity(n);
    for _ in 0..n {
        let level = read_i32(&mut input)?;
        if level < 0 {
            nodes.push(ExportNode::default());
            continue;
        }
        let mut links = Vec::with_capacity(level as usize + 1);
        for _ in 0..=level {
            let degree = read_u32(&mut input)? as usize;
            let mut neighbors = Vec::with_capacity(degree);
            for _ in 0..degree {
                neighbors.push(read_u32(&mut input)? as usize);
            }
            links.push(neighbors);
        }
        nodes.push(ExportNode { level, links });
    }

    debug!(nodes = n, max_level, "loaded graph file");
    Ok(GraphExport {
        entry_point,
        has_entry,
        max_level,
        nodes,
    })
}
