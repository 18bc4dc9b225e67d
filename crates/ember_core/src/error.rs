//! Error taxonomy for the baking pipeline.
//!
//! Only configuration problems surface as `Result`s, and they surface before
//! iteration 0 runs. Numerical edge cases (parallel rays, zero determinants,
//! hits behind the origin) are folded into "no hit" inside the intersector
//! and never propagate. Invariant violations (out-of-range texel writes,
//! duplicate work claims) are defects and panic.

use thiserror::Error;

/// Errors that abort a bake before any iteration runs.
#[derive(Debug, Error)]
pub enum BakeError {
    /// The allocator's projected storage total exceeds the configured ceiling.
    #[error("lightmap storage needs {required} floats, budget is {budget}")]
    StorageBudgetExceeded { required: usize, budget: usize },

    /// A face has no usable UV parameterization (zero projected area).
    #[error("face {face} has a degenerate UV mapping")]
    DegenerateFace { face: usize },

    /// A configuration field is out of range.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

/// Result type for bake setup operations.
pub type BakeResult<T> = Result<T, BakeError>;
