//! On-disk formats for a collection directory.
//!
//! A saved collection is a directory containing:
//!
//! - `manifest.json` - dimension, metric, and HNSW parameters ([`manifest`])
//! - `vectors.bin`, `alive.bin`, `ids.txt`, `meta.txt` - the slot table,
//!   written for *every* slot, dead or alive, so slot indices survive a
//!   reload ([`store_files`])
//! - `hnsw.bin` - the graph, present only when an index was built
//!   ([`graph_file`])
//!
//! All binary integers are little-endian. Each binary file starts with a
//! magic constant so a mismatched or truncated file is rejected as
//! [`CorruptState`](crate::VecdbError::CorruptState) instead of being
//! misread.

pub mod graph_file;
pub mod manifest;
pub mod store_files;

pub use graph_file::{load_graph, save_graph, HNSW_FILE};
pub use manifest::{read_manifest, write_manifest, Manifest, MANIFEST_FILE};
pub use store_files::{load_store, save_store};

pub(crate) mod rw {
    //! Fixed-width little-endian read/write helpers.

    use std::io::{Read, Write};

    use crate::error::Result;

    pub fn write_u64<W: Write>(out: &mut W, x: u64) -> Result<()> {
        out.write_all(&x.to_le_bytes())?;
        Ok(())
    }

    pub fn write_u32<W: Write>(out: &mut W, x: u32) -> Result<()> {
        out.write_all(&x.to_le_bytes())?;
        Ok(())
    }

    pub fn write_i32<W: Write>(out: &mut W, x: i32) -> Result<()> {
        out.write_all(&x.to_le_bytes())?;
        Ok(())
    }

    pub fn read_u64<R: Read>(input: &mut R) -> Result<u64> {
        let mut buf = [0u8; 8];
        input.read_exact(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    pub fn read_u32<R: Read>(input: &mut R) -> Result<u32> {
        let mut buf = [0u8; 4];
        input.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    pub fn read_i32<R: Read>(input: &mut R) -> Result<i32> {
        let mut buf = [0u8; 4];
        input.read_exact(&mut buf)?;
        Ok(i32::from_le_bytes(buf))
    }
}
