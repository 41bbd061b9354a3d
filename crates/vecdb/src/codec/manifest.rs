//! Collection manifest (`manifest.json`).
//!
//! The manifest is a small JSON document holding the collection's
//! dimension, metric, and HNSW parameters. Parsing is tolerant: every
//! field defaults when missing, so manifests written by older versions
//! still load. The only hard requirement is a non-zero dimension.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::distance::Metric;
use crate::error::{Result, VecdbError};
use crate::index::HnswConfig;

/// Manifest file name inside a collection directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Current manifest format version.
pub const FORMAT_VERSION: u32 = 1;

fn default_version() -> u32 {
    FORMAT_VERSION
}

fn default_metric() -> String {
    Metric::L2.as_str().to_string()
}

fn default_m() -> usize {
    16
}

fn default_m0() -> usize {
    32
}

fn default_ef_construction() -> usize {
    100
}

fn default_use_diversity() -> bool {
    true
}

fn default_seed() -> u32 {
    123
}

fn default_level_mult() -> f32 {
    1.0
}

/// HNSW parameter block inside the manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HnswSection {
    #[serde(rename = "M", default = "default_m")]
    pub m: usize,
    #[serde(rename = "M0", default = "default_m0")]
    pub m0: usize,
    #[serde(default = "default_ef_construction")]
    pub ef_construction: usize,
    #[serde(default = "default_use_diversity")]
    pub use_diversity: bool,
    #[serde(default = "default_seed")]
    pub seed: u32,
    #[serde(default = "default_level_mult")]
    pub level_mult: f32,
}

impl Default for HnswSection {
    fn default() -> Self {
        Self {
            m: default_m(),
            m0: default_m0(),
            ef_construction: default_ef_construction(),
            use_diversity: default_use_diversity(),
            seed: default_seed(),
            level_mult: default_level_mult(),
        }
    }
}

/// The manifest document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub dim: usize,
    #[serde(default = "default_metric")]
    pub metric: String,
    #[serde(default)]
    pub hnsw: HnswSection,
}

impl Manifest {
    /// Build a manifest for the given collection settings.
    #[must_use]
    pub fn new(dim: usize, metric: Metric, params: &HnswConfig) -> Self {
        Self {
            version: FORMAT_VERSION,
            dim,
            metric: metric.as_str().to_string(),
            hnsw: HnswSection {
                m: params.m,
                m0: params.m0,
                ef_construction: params.ef_construction,
                use_diversity: params.use_diversity,
                seed: params.seed,
                level_mult: params.level_mult,
            },
        }
    }

    /// The metric named by this manifest; unknown names read as L2.
    #[must_use]
    pub fn metric(&self) -> Metric {
        Metric::from_manifest(&self.metric)
    }

    /// The HNSW parameters carried by this manifest.
    #[must_use]
    pub fn hnsw_config(&self) -> HnswConfig {
        HnswConfig {
            m: self.hnsw.m,
            m0: self.hnsw.m0,
            ef_construction: self.hnsw.ef_construction,
            use_diversity: self.hnsw.use_diversity,
            seed: self.hnsw.seed,
            level_mult: self.hnsw.level_mult,
        }
    }
}

/// Read and validate the manifest in a collection directory.
///
/// # Errors
///
/// Returns [`VecdbError::Io`] if the file cannot be read, and
/// [`VecdbError::CorruptState`] if it does not parse or declares a zero
/// dimension.
pub fn read_manifest(dir: &Path) -> Result<Manifest> {
    let path = dir.join(MANIFEST_FILE);
    let text = fs::read_to_string(&path)?;
    let manifest: Manifest = serde_json::from_str(&text).map_err(|e| {
        VecdbError::CorruptState(format!("cannot parse {}: {e}", path.display()))
    })?;
    if manifest.dim == 0 {
        return Err(VecdbError::CorruptState(format!(
            "manifest dim invalid (0) in {}",
            path.display()
        )));
    }
    Ok(manifest)
}

/// Write the manifest into a collection directory.
///
/// # Errors
///
/// Returns [`VecdbError::Io`] on write failure.
pub fn write_manifest(dir: &Path, manifest: &Manifest) -> Result<()> {
    let path = dir.join(MANIFEST_FILE);
    let mut text = serde_json::to_string_pretty(manifest).map_err(|e| {
        VecdbError::CorruptState(format!("cannot serialize manifest: {e}"))
    })?;
    text.push('\n');
    fs::write(&path, text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let params = HnswConfig::default().with_m(8).with_seed(42);
        let manifest = Manifest::new(64, Metric::Cosine, &params);
        write_manifest(dir.path(), &manifest).unwrap();

        let loaded = read_manifest(dir.path()).unwrap();
        assert_eq!(loaded.version, FORMAT_VERSION);
        assert_eq!(loaded.dim, 64);
        assert_eq!(loaded.metric(), Metric::Cosine);
        assert_eq!(loaded.hnsw_config(), params);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(MANIFEST_FILE), r#"{"dim": 8}"#).unwrap();

        let manifest = read_manifest(dir.path()).unwrap();
        assert_eq!(manifest.dim, 8);
        assert_eq!(manifest.metric(), Metric::L2);
        assert_eq!(manifest.hnsw_config(), HnswConfig::default());
    }

    #[test]
    fn test_unknown_metric_reads_as_l2() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(MANIFEST_FILE),
            r#"{"dim": 8, "metric": "MANHATTAN"}"#,
        )
        .unwrap();
        assert_eq!(read_manifest(dir.path()).unwrap().metric(), Metric::L2);
    }

    #[test]
    fn test_zero_dim_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(MANIFEST_FILE), r#"{"metric": "L2"}"#).unwrap();
        assert!(matches!(
            read_manifest(dir.path()),
            Err(VecdbError::CorruptState(_))
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(MANIFEST_FILE), "not json").unwrap();
        assert!(matches!(
            read_manifest(dir.path()),
            Err(VecdbError::CorruptState(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_manifest(dir.path()),
            Err(VecdbError::Io(_))
        ));
    }
}
