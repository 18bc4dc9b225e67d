//! Bake configuration.

use serde::{Deserialize, Serialize};

use crate::error::{BakeError, BakeResult};
use ember_math::LANES;

/// Configuration for a progressive bake.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BakeConfig {
    /// Hemisphere sample directions per texel per iteration (S). Must be a
    /// positive multiple of the lane width.
    pub sample_count: usize,

    /// Side length of the quantized-normal mask grid (N).
    pub normal_grid: usize,

    /// Lightmap texels per unit of projected edge length.
    pub texel_density: f32,

    /// Hard ceiling on total accumulator storage, in floats.
    pub storage_budget: usize,

    /// Angular sample grid per texel: (sSize, tSize) virtual viewpoints.
    pub view_grid: (usize, usize),

    /// Eye point for the allocator's virtual viewpoints. `None` places the
    /// eye automatically above the scene bounds.
    pub eye: Option<[f32; 3]>,

    /// Worker threads for the shading pass. 0 = hardware parallelism.
    pub workers: usize,

    /// Seed for all random streams. Reusing a seed reproduces a bake exactly.
    pub seed: u64,
}

impl Default for BakeConfig {
    fn default() -> Self {
        Self {
            sample_count: 256,
            normal_grid: 128,
            texel_density: 16.0,
            storage_budget: 64 << 20,
            view_grid: (1, 1),
            eye: None,
            workers: 0,
            seed: 0,
        }
    }
}

impl BakeConfig {
    /// Validate field ranges. Called once before any allocation or iteration.
    pub fn validate(&self) -> BakeResult<()> {
        if self.sample_count == 0 || self.sample_count % LANES != 0 {
            return Err(BakeError::InvalidConfig(format!(
                "sample_count {} must be a positive multiple of {}",
                self.sample_count, LANES
            )));
        }
        if self.normal_grid < 2 {
            return Err(BakeError::InvalidConfig(format!(
                "normal_grid {} must be at least 2",
                self.normal_grid
            )));
        }
        if !(self.texel_density > 0.0) {
            return Err(BakeError::InvalidConfig(format!(
                "texel_density {} must be positive",
                self.texel_density
            )));
        }
        if self.view_grid.0 == 0 || self.view_grid.1 == 0 {
            return Err(BakeError::InvalidConfig(
                "view_grid sides must be nonzero".to_string(),
            ));
        }
        Ok(())
    }
}
