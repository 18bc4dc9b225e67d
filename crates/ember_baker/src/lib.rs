//! EMBER Baker - progressive radiosity lightmap solver.
//!
//! Bakes converging per-texel outgoing radiance for static quad scenes:
//! - Batched SoA ray-triangle intersection
//! - Per-iteration hemisphere sample set + quantized-normal mask table
//! - Monte Carlo radiosity shading (diffuse / mirror / glossy)
//! - Projected-density lightmap allocation under a hard storage budget
//! - Lock-free parallel accumulation over a shared work cursor

mod hemisphere;
mod layout;
mod progressive;
mod raycast;
mod shade;
mod storage;

pub use hemisphere::{HemisphereLookup, NormalMaskTable, SampleSet};
pub use layout::{LightmapAtlas, LightmapLayout};
pub use progressive::{BakeState, IterationStats, ProgressiveBaker};
pub use raycast::{RayHit, TriangleBatches};
pub use shade::{shade_texel, ShadeContext};
pub use storage::{MemoryStorage, RadianceStorage};

/// Re-export the math and scene foundations
pub use ember_core::{
    AreaLight, BakeConfig, BakeError, BakeResult, Brdf, FaceId, Material, QuadScene, SceneBuilder,
};
pub use ember_math::{Ray, TangentFrame, Vec3, LANES};
