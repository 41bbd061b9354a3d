//! Slot-table files: `vectors.bin`, `alive.bin`, `ids.txt`, `meta.txt`.
//!
//! Every file carries one record per slot, dead or alive, in slot order.
//! Dead slots write zeroed payloads (search never reads them) but keep
//! their id line, so tombstones remain revivable after a reload.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use tracing::debug;

use super::rw::{read_u64, write_u64};
use crate::error::{Result, VecdbError};
use crate::metadata::{self, Metadata};
use crate::store::VectorStore;

/// `vectors.bin` magic ("VEC_V1" as little-endian bytes).
const MAGIC_VEC: u64 = 0x3156_5F43_4556;

/// `alive.bin` magic ("ALV_V1" as little-endian bytes).
const MAGIC_ALV: u64 = 0x3156_5F56_4C41;

const VECTORS_FILE: &str = "vectors.bin";
const ALIVE_FILE: &str = "alive.bin";
const IDS_FILE: &str = "ids.txt";
const META_FILE: &str = "meta.txt";

/// Write the full slot table of a store into a collection directory.
///
/// # Errors
///
/// Returns [`VecdbError::Io`] on any write failure.
pub fn save_store(dir: &Path, store: &VectorStore) -> Result<()> {
    let n = store.len();
    let dim = store.dim();

    {
        let mut out = BufWriter::new(File::create(dir.join(VECTORS_FILE))?);
        write_u64(&mut out, MAGIC_VEC)?;
        write_u64(&mut out, n as u64)?;
        write_u64(&mut out, dim as u64)?;
        let zeros = vec![0u8; dim * 4];
        for i in 0..n {
            match store.vector(i) {
                Some(v) => {
                    for x in v {
                        out.write_all(&x.to_le_bytes())?;
                    }
                }
                // dead slot: payload bytes are unused by search
                None => out.write_all(&zeros)?,
            }
        }
        out.flush()?;
    }

    {
        let mut out = BufWriter::new(File::create(dir.join(ALIVE_FILE))?);
        write_u64(&mut out, MAGIC_ALV)?;
        write_u64(&mut out, n as u64)?;
        for i in 0..n {
            out.write_all(&[u8::from(store.is_alive(i))])?;
        }
        out.flush()?;
    }

    {
        let mut out = BufWriter::new(File::create(dir.join(IDS_FILE))?);
        for i in 0..n {
            out.write_all(store.id_at(i).unwrap_or("").as_bytes())?;
            out.write_all(b"\n")?;
        }
        out.flush()?;
    }

    {
        let empty = Metadata::new();
        let mut out = BufWriter::new(File::create(dir.join(META_FILE))?);
        for i in 0..n {
            let meta = store.metadata_at(i).unwrap_or(&empty);
            out.write_all(metadata::encode(meta).as_bytes())?;
            out.write_all(b"\n")?;
        }
        out.flush()?;
    }

    debug!(slots = n, dim, "saved store files");
    Ok(())
}

/// Read exactly `n` LF-terminated lines, padding with empty strings if the
/// file is short. A trailing CR is stripped for tolerance of CRLF files.
fn read_lines(path: &Path, n: usize) -> Result<Vec<String>> {
    let reader = BufReader::new(File::open(path)?);
    let mut lines = Vec::with_capacity(n);
    for line in reader.lines().take(n) {
        let mut line = line?;
        if line.ends_with('\r') {
            line.pop();
        }
        lines.push(line);
    }
    lines.resize(n, String::new());
    Ok(lines)
}

/// Load the slot-table files from a collection directory into a store.
///
/// `meta.txt` may be absent (archives written before metadata existed);
/// every slot then gets an empty map.
///
/// # Errors
///
/// Returns [`VecdbError::CorruptState`] on magic or size mismatches and on
/// undecodable metadata, [`VecdbError::Io`] on read failures.
pub fn load_store(dir: &Path, store: &mut VectorStore) -> Result<()> {
    let mut input = BufReader::new(File::open(dir.join(VECTORS_FILE))?);
    if read_u64(&mut input)? != MAGIC_VEC {
        return Err(VecdbError::CorruptState("bad vectors.bin magic".into()));
    }
    let n = read_u64(&mut input)? as usize;
    let dim = read_u64(&mut input)? as usize;
    if dim != store.dim() {
        return Err(VecdbError::CorruptState(format!(
            "vectors.bin dim mismatch: file has {dim}, manifest has {}",
            store.dim()
        )));
    }

    let mut payload = vec![0u8; n * dim * 4];
    input.read_exact(&mut payload)?;
    let vectors: Vec<f32> = payload
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();

    let mut input = BufReader::new(File::open(dir.join(ALIVE_FILE))?);
    if read_u64(&mut input)? != MAGIC_ALV {
        return Err(VecdbError::CorruptState("bad alive.bin magic".into()));
    }
    let n_alive = read_u64(&mut input)? as usize;
    if n_alive != n {
        return Err(VecdbError::CorruptState(format!(
            "alive.bin slot count mismatch: {n_alive} vs {n}"
        )));
    }
    let mut alive_bytes = vec![0u8; n];
    input.read_exact(&mut alive_bytes)?;
    let alive: Vec<bool> = alive_bytes.into_iter().map(|b| b != 0).collect();

    let ids = read_lines(&dir.join(IDS_FILE), n)?;

    let meta_path = dir.join(META_FILE);
    let meta = if meta_path.exists() {
        let lines = read_lines(&meta_path, n)?;
        let mut maps = Vec::with_capacity(n);
        for (i, line) in lines.iter().enumerate() {
            maps.push(metadata::decode(line).map_err(|e| {
                VecdbError::CorruptState(format!("meta.txt line {}: {e}", i + 1))
            })?);
        }
        maps
    } else {
        debug!("meta.txt absent, loading empty metadata");
        vec![Metadata::new(); n]
    };

    store.load_from_disk(n, vectors, alive, ids, meta)
}
