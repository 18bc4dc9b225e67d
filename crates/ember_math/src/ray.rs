//! Ray type for the radiosity gather passes.
//!
//! A ray is defined by an origin point and a direction vector. Gather rays
//! always carry a small origin bias along their direction so a surface never
//! shadows itself with its own triangles.

use glam::Vec3;

/// Origin offset applied by [`Ray::biased`] to gather rays.
pub const ORIGIN_BIAS: f32 = 1e-3;

/// A ray with origin and direction.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// Origin point of the ray
    origin: Vec3,
    /// Direction vector (not necessarily normalized)
    direction: Vec3,
}

impl Ray {
    /// Create a new ray.
    #[inline]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// Create a gather ray whose origin is pushed forward along the
    /// direction by [`ORIGIN_BIAS`].
    #[inline]
    pub fn biased(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin: origin + direction * ORIGIN_BIAS,
            direction,
        }
    }

    /// Get the ray's origin point.
    #[inline]
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    /// Get the ray's direction vector.
    #[inline]
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Compute a point along the ray at parameter t.
    /// P(t) = origin + t * direction
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + t * self.direction
    }
}

impl Default for Ray {
    fn default() -> Self {
        Self {
            origin: Vec3::ZERO,
            direction: Vec3::Z,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ray_at() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0));

        assert_eq!(ray.at(0.0), Vec3::new(0.0, 0.0, 0.0));
        assert_eq!(ray.at(1.0), Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(ray.at(2.5), Vec3::new(2.5, 0.0, 0.0));
    }

    #[test]
    fn test_ray_accessors() {
        let origin = Vec3::new(1.0, 2.0, 3.0);
        let direction = Vec3::new(0.0, 1.0, 0.0);
        let ray = Ray::new(origin, direction);

        assert_eq!(ray.origin(), origin);
        assert_eq!(ray.direction(), direction);
    }

    #[test]
    fn test_biased_origin_moves_forward() {
        let dir = Vec3::new(0.0, 0.0, 1.0);
        let ray = Ray::biased(Vec3::ZERO, dir);

        assert!(ray.origin().z > 0.0);
        assert!((ray.origin().z - ORIGIN_BIAS).abs() < 1e-7);
    }
}
