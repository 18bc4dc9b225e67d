//! Surface materials and the shading dispatch tag.

use glam::Vec3;

/// Reflectance and emission properties of one face.
#[derive(Clone, Debug)]
pub struct Material {
    /// Diffuse reflectance (RGB, 0-1)
    pub diffuse: Vec3,

    /// Specular reflectance (RGB, 0-1)
    pub specular: Vec3,

    /// Glossiness: 0 = perfect mirror, 1 = fully diffuse
    pub glossiness: f32,

    /// Emitted radiance (RGB, linear)
    pub emission: Vec3,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            diffuse: Vec3::splat(0.5), // Grey default
            specular: Vec3::ZERO,
            glossiness: 1.0,
            emission: Vec3::ZERO,
        }
    }
}

impl Material {
    /// A purely diffuse material.
    pub fn diffuse(albedo: Vec3) -> Self {
        Self {
            diffuse: albedo,
            ..Default::default()
        }
    }

    /// A purely emissive material (black body otherwise).
    pub fn emissive(emission: Vec3) -> Self {
        Self {
            diffuse: Vec3::ZERO,
            emission,
            ..Default::default()
        }
    }

    /// A mirror with the given specular reflectance.
    pub fn mirror(specular: Vec3) -> Self {
        Self {
            diffuse: Vec3::ZERO,
            specular,
            glossiness: 0.0,
            ..Default::default()
        }
    }

    /// Check if this material emits light.
    pub fn is_emissive(&self) -> bool {
        self.emission.length_squared() > 0.0
    }

    /// Derive the shading dispatch tag.
    ///
    /// The set is closed and known at scene build, so the shader branches on
    /// this tag instead of going through dynamic dispatch in its hot loop. A
    /// black specular component always collapses to `Diffuse` regardless of
    /// glossiness.
    pub fn brdf(&self) -> Brdf {
        const GLOSS_EPS: f32 = 1e-3;
        if self.specular.length_squared() == 0.0 || self.glossiness >= 1.0 - GLOSS_EPS {
            Brdf::Diffuse
        } else if self.glossiness <= GLOSS_EPS {
            Brdf::Mirror
        } else {
            Brdf::Glossy {
                gloss: self.glossiness,
            }
        }
    }
}

/// Closed set of shading models, derived once per face at scene build.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Brdf {
    /// Cosine-hemisphere gathering only.
    Diffuse,
    /// A single reflected ray, no hemisphere sampling.
    Mirror,
    /// Diffuse gather blended with a microfacet-sampled reflection.
    Glossy { gloss: f32 },
}
