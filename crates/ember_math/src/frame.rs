//! Orthonormal tangent frames for surface shading.

use glam::Vec3;

/// An orthonormal basis at a surface point: tangent, bitangent, normal.
///
/// Local space puts the normal on +Z, so hemisphere sample directions with
/// non-negative z map onto the upper hemisphere of the surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TangentFrame {
    pub tangent: Vec3,
    pub bitangent: Vec3,
    pub normal: Vec3,
}

impl TangentFrame {
    /// Create a frame from explicit basis vectors. The caller guarantees the
    /// inputs are orthonormal.
    #[inline]
    pub fn new(tangent: Vec3, bitangent: Vec3, normal: Vec3) -> Self {
        Self {
            tangent,
            bitangent,
            normal,
        }
    }

    /// Build a frame around a unit normal, picking an arbitrary tangent.
    pub fn from_normal(normal: Vec3) -> Self {
        let arbitrary = if normal.x.abs() < 0.9 { Vec3::X } else { Vec3::Y };
        let tangent = normal.cross(arbitrary).normalize();
        let bitangent = normal.cross(tangent);
        Self {
            tangent,
            bitangent,
            normal,
        }
    }

    /// Transform a local-space vector (normal = +Z) into world space.
    #[inline]
    pub fn to_world(&self, v: Vec3) -> Vec3 {
        self.tangent * v.x + self.bitangent * v.y + self.normal * v.z
    }

    /// Transform a world-space vector into local space (normal = +Z).
    #[inline]
    pub fn to_local(&self, v: Vec3) -> Vec3 {
        Vec3::new(
            v.dot(self.tangent),
            v.dot(self.bitangent),
            v.dot(self.normal),
        )
    }

    /// Rotate the tangent and bitangent about the normal by `angle` radians.
    ///
    /// Shading uses a random per-texel rotation so the shared sample set does
    /// not alias into structured banding across neighboring texels.
    pub fn rotated_about_normal(&self, angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self {
            tangent: self.tangent * cos + self.bitangent * sin,
            bitangent: self.bitangent * cos - self.tangent * sin,
            normal: self.normal,
        }
    }

    /// Normalized bilinear interpolation of four corner frames at (u, v).
    pub fn bilerp(corners: &[TangentFrame; 4], u: f32, v: f32) -> Self {
        let lerp2 = |a: Vec3, b: Vec3, c: Vec3, d: Vec3| {
            let bottom = a.lerp(b, u);
            let top = d.lerp(c, u);
            bottom.lerp(top, v)
        };
        let normal = lerp2(
            corners[0].normal,
            corners[1].normal,
            corners[2].normal,
            corners[3].normal,
        )
        .normalize();
        let raw_tangent = lerp2(
            corners[0].tangent,
            corners[1].tangent,
            corners[2].tangent,
            corners[3].tangent,
        );
        // Re-orthogonalize against the interpolated normal
        let tangent = (raw_tangent - normal * raw_tangent.dot(normal)).normalize();
        let bitangent = normal.cross(tangent);
        Self {
            tangent,
            bitangent,
            normal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn assert_orthonormal(frame: &TangentFrame) {
        assert!((frame.tangent.length() - 1.0).abs() < EPS);
        assert!((frame.bitangent.length() - 1.0).abs() < EPS);
        assert!((frame.normal.length() - 1.0).abs() < EPS);
        assert!(frame.tangent.dot(frame.bitangent).abs() < EPS);
        assert!(frame.tangent.dot(frame.normal).abs() < EPS);
        assert!(frame.bitangent.dot(frame.normal).abs() < EPS);
    }

    #[test]
    fn test_from_normal_is_orthonormal() {
        for normal in [Vec3::X, Vec3::Y, Vec3::Z, Vec3::new(0.6, 0.48, 0.64)] {
            let frame = TangentFrame::from_normal(normal.normalize());
            assert_orthonormal(&frame);
        }
    }

    #[test]
    fn test_local_world_roundtrip() {
        let frame = TangentFrame::from_normal(Vec3::new(0.0, 1.0, 0.0));
        let v = Vec3::new(0.3, -0.4, 0.86);
        let back = frame.to_local(frame.to_world(v));
        assert!((back - v).length() < EPS);
    }

    #[test]
    fn test_local_z_maps_to_normal() {
        let normal = Vec3::new(1.0, 2.0, -0.5).normalize();
        let frame = TangentFrame::from_normal(normal);
        assert!((frame.to_world(Vec3::Z) - normal).length() < EPS);
    }

    #[test]
    fn test_rotation_preserves_normal() {
        let frame = TangentFrame::from_normal(Vec3::Z);
        let rotated = frame.rotated_about_normal(1.234);
        assert_orthonormal(&rotated);
        assert_eq!(rotated.normal, frame.normal);
        assert!(rotated.tangent.dot(frame.tangent) < 1.0 - EPS);
    }

    #[test]
    fn test_bilerp_of_identical_frames() {
        let frame = TangentFrame::from_normal(Vec3::Y);
        let corners = [frame; 4];
        let mid = TangentFrame::bilerp(&corners, 0.5, 0.5);
        assert!((mid.normal - frame.normal).length() < EPS);
        assert_orthonormal(&mid);
    }
}
