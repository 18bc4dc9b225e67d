//! EMBER Core - Scene model for the radiosity baker.
//!
//! This crate provides:
//!
//! - **Scene types**: `QuadScene`, `SceneBuilder`, `Face`, `AreaLight`
//! - **Materials**: `Material` with a derived `Brdf` dispatch tag
//! - **Configuration**: `BakeConfig` and the `BakeError` taxonomy
//!
//! # Example
//!
//! ```
//! use ember_core::{Material, SceneBuilder};
//! use ember_math::Vec3;
//!
//! let mut builder = SceneBuilder::new();
//! builder.add_quad(
//!     [
//!         Vec3::new(0.0, 0.0, 0.0),
//!         Vec3::new(1.0, 0.0, 0.0),
//!         Vec3::new(1.0, 0.0, 1.0),
//!         Vec3::new(0.0, 0.0, 1.0),
//!     ],
//!     Material::diffuse(Vec3::splat(0.7)),
//! );
//! let scene = builder.build();
//! assert_eq!(scene.face_count(), 1);
//! ```

pub mod config;
pub mod error;
pub mod material;
pub mod scene;

// Re-export commonly used types
pub use config::BakeConfig;
pub use error::{BakeError, BakeResult};
pub use material::{Brdf, Material};
pub use scene::{AreaLight, Face, FaceId, QuadScene, SceneBuilder};
