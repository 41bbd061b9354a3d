//! HNSW index configuration.

/// Configuration parameters for an HNSW index.
///
/// # Parameters
///
/// * `m` - Maximum number of connections per node in upper layers.
///   Higher values give better recall but use more memory.
///
/// * `m0` - Maximum number of connections in layer 0 (the densest layer).
///   Typically set to `2 * m`.
///
/// * `ef_construction` - Beam width during index construction.
///   Higher values give better index quality but slower construction.
///
/// * `use_diversity` - Whether neighbor selection uses the diversity
///   heuristic (keep candidates closer to the base than to any already
///   chosen neighbor) or plain nearest-first selection.
///
/// * `seed` - Seed for the deterministic level-sampling generator. The same
///   seed plus the same insertion order reproduces the same graph.
///
/// * `level_mult` - Level multiplier controlling the layer distribution.
#[derive(Debug, Clone, PartialEq)]
pub struct HnswConfig {
    /// Maximum number of connections per node (M parameter).
    pub m: usize,
    /// Maximum connections in layer 0 (typically 2 * M).
    pub m0: usize,
    /// Beam width for construction.
    pub ef_construction: usize,
    /// Use the diversity heuristic for neighbor selection.
    pub use_diversity: bool,
    /// Level-sampling seed.
    pub seed: u32,
    /// Level multiplier.
    pub level_mult: f32,
}

impl HnswConfig {
    /// Set the upper-layer degree cap.
    #[must_use]
    pub const fn with_m(mut self, m: usize) -> Self {
        self.m = m;
        self
    }

    /// Set the layer-0 degree cap.
    #[must_use]
    pub const fn with_m0(mut self, m0: usize) -> Self {
        self.m0 = m0;
        self
    }

    /// Set the beam width for construction.
    #[must_use]
    pub const fn with_ef_construction(mut self, ef: usize) -> Self {
        self.ef_construction = ef;
        self
    }

    /// Toggle the diversity heuristic.
    #[must_use]
    pub const fn with_diversity(mut self, on: bool) -> Self {
        self.use_diversity = on;
        self
    }

    /// Set the level-sampling seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }

    /// Set the level multiplier.
    #[must_use]
    pub const fn with_level_mult(mut self, level_mult: f32) -> Self {
        self.level_mult = level_mult;
        self
    }
}

impl Default for HnswConfig {
    fn default() -> Self {
        Self {
            m: 16,
            m0: 32,
            ef_construction: 100,
            use_diversity: true,
            seed: 123,
            level_mult: 1.0,
        }
    }
}
