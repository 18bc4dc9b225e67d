//! Quad scene representation for the baker.
//!
//! A scene is a flat list of quad faces over a deduplicated vertex pool.
//! Every face splits into exactly two triangles sharing the c0-c2 diagonal,
//! so triangle `2f` and `2f + 1` always belong to face `f`. All of it is
//! immutable once [`SceneBuilder::build`] runs.

use std::collections::HashMap;
use std::f32::consts::PI;

use glam::Vec3;

use crate::material::Material;
use ember_math::TangentFrame;

/// Index of a face within a scene.
pub type FaceId = usize;

/// One quad face: four vertex indices (counter-clockwise seen from the front
/// side) and the owning material.
#[derive(Clone, Debug)]
pub struct Face {
    /// Indices into the scene vertex pool, CCW order
    pub corners: [u32; 4],

    /// Surface material
    pub material: Material,
}

/// An area light descriptor, converted into an emissive face at build time.
///
/// `flux` is total emitted power; the builder converts it to outgoing
/// radiance over the light's area assuming Lambertian emission.
#[derive(Clone, Debug)]
pub struct AreaLight {
    /// One corner of the light
    pub origin: Vec3,

    /// First edge span
    pub tangent: Vec3,

    /// Second edge span
    pub bitangent: Vec3,

    /// Outward emitting direction
    pub normal: Vec3,

    /// Total emitted power (RGB)
    pub flux: Vec3,
}

/// Incrementally assembled scene. Vertices are deduplicated by exact bit
/// pattern; collaborators feeding baked transforms get stable indices.
#[derive(Default)]
pub struct SceneBuilder {
    positions: Vec<Vec3>,
    faces: Vec<Face>,
    dedup: HashMap<[u32; 3], u32>,
}

impl SceneBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the vertex pool from per-axis position arrays, the layout the
    /// scene-loading collaborator hands over. All three slices must have the
    /// same length.
    pub fn from_axis_positions(xs: &[f32], ys: &[f32], zs: &[f32]) -> Self {
        assert_eq!(xs.len(), ys.len());
        assert_eq!(xs.len(), zs.len());

        let mut builder = Self::new();
        for i in 0..xs.len() {
            builder.intern(Vec3::new(xs[i], ys[i], zs[i]));
        }
        builder
    }

    fn intern(&mut self, position: Vec3) -> u32 {
        let key = [
            position.x.to_bits(),
            position.y.to_bits(),
            position.z.to_bits(),
        ];
        *self.dedup.entry(key).or_insert_with(|| {
            let index = self.positions.len() as u32;
            self.positions.push(position);
            index
        })
    }

    /// Add a quad from explicit corner positions (CCW from the front side).
    pub fn add_quad(&mut self, corners: [Vec3; 4], material: Material) -> FaceId {
        let indices = corners.map(|c| self.intern(c));
        self.add_quad_indexed(indices, material)
    }

    /// Add a quad referencing already-interned vertices.
    pub fn add_quad_indexed(&mut self, corners: [u32; 4], material: Material) -> FaceId {
        for &index in &corners {
            assert!(
                (index as usize) < self.positions.len(),
                "face corner index out of range"
            );
        }
        let id = self.faces.len();
        self.faces.push(Face { corners, material });
        id
    }

    /// Add an area light as an emissive face.
    pub fn add_area_light(&mut self, light: &AreaLight) -> FaceId {
        let c0 = light.origin;
        let c1 = light.origin + light.tangent;
        let c2 = light.origin + light.tangent + light.bitangent;
        let c3 = light.origin + light.bitangent;

        // Keep the front side facing the requested normal
        let winding_normal = light.tangent.cross(light.bitangent);
        let corners = if winding_normal.dot(light.normal) >= 0.0 {
            [c0, c1, c2, c3]
        } else {
            [c0, c3, c2, c1]
        };

        let area = light.tangent.cross(light.bitangent).length();
        let radiance = if area > 0.0 {
            light.flux / (PI * area)
        } else {
            Vec3::ZERO
        };

        self.add_quad(corners, Material::emissive(radiance))
    }

    /// Freeze the scene. Corner shading frames are derived here, once.
    pub fn build(self) -> QuadScene {
        let frames = self
            .faces
            .iter()
            .map(|face| corner_frames(&self.positions, face))
            .collect();

        log::info!(
            "scene built: {} faces, {} unique vertices",
            self.faces.len(),
            self.positions.len()
        );

        QuadScene {
            positions: self.positions,
            faces: self.faces,
            frames,
        }
    }
}

/// Derive the four corner tangent frames of a face.
///
/// U runs along c0->c1 / c3->c2 and V along c0->c3 / c1->c2; each corner's
/// normal comes from its own pair of adjacent edges so gently warped quads
/// still shade smoothly.
fn corner_frames(positions: &[Vec3], face: &Face) -> [TangentFrame; 4] {
    let [c0, c1, c2, c3] = face.corners.map(|i| positions[i as usize]);

    let edge_pairs = [
        (c1 - c0, c3 - c0),
        (c1 - c0, c2 - c1),
        (c2 - c3, c2 - c1),
        (c2 - c3, c3 - c0),
    ];

    edge_pairs.map(|(eu, ev)| {
        let normal = eu.cross(ev).normalize_or_zero();
        let normal = if normal == Vec3::ZERO { Vec3::Z } else { normal };
        let tangent = (eu - normal * eu.dot(normal)).normalize_or_zero();
        let tangent = if tangent == Vec3::ZERO {
            TangentFrame::from_normal(normal).tangent
        } else {
            tangent
        };
        TangentFrame::new(tangent, normal.cross(tangent), normal)
    })
}

/// Immutable scene geometry: vertex pool, faces, derived corner frames.
pub struct QuadScene {
    positions: Vec<Vec3>,
    faces: Vec<Face>,
    frames: Vec<[TangentFrame; 4]>,
}

impl QuadScene {
    /// Number of faces.
    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Number of triangles (two per face).
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.faces.len() * 2
    }

    /// All faces.
    #[inline]
    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    /// One face.
    #[inline]
    pub fn face(&self, face: FaceId) -> &Face {
        &self.faces[face]
    }

    /// The vertex pool.
    #[inline]
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Face owning a triangle.
    #[inline]
    pub fn triangle_face(&self, triangle: usize) -> FaceId {
        triangle / 2
    }

    /// Corner positions of a face.
    pub fn face_corners(&self, face: FaceId) -> [Vec3; 4] {
        self.faces[face].corners.map(|i| self.positions[i as usize])
    }

    /// Corner shading frames of a face.
    #[inline]
    pub fn face_frames(&self, face: FaceId) -> &[TangentFrame; 4] {
        &self.frames[face]
    }

    /// Vertex positions of a triangle. Triangle `2f` covers corners 0,1,2 of
    /// face `f`; triangle `2f + 1` covers corners 0,2,3.
    pub fn triangle_positions(&self, triangle: usize) -> [Vec3; 3] {
        let corners = self.face_corners(self.triangle_face(triangle));
        if triangle % 2 == 0 {
            [corners[0], corners[1], corners[2]]
        } else {
            [corners[0], corners[2], corners[3]]
        }
    }

    /// Corner shading frames of a triangle, matching
    /// [`QuadScene::triangle_positions`] ordering.
    pub fn triangle_frames(&self, triangle: usize) -> [TangentFrame; 3] {
        let frames = self.frames[self.triangle_face(triangle)];
        if triangle % 2 == 0 {
            [frames[0], frames[1], frames[2]]
        } else {
            [frames[0], frames[2], frames[3]]
        }
    }

    /// Bilinear surface point at face parameter (u, v) in [0,1]^2.
    pub fn point_at(&self, face: FaceId, u: f32, v: f32) -> Vec3 {
        let [c0, c1, c2, c3] = self.face_corners(face);
        let bottom = c0.lerp(c1, u);
        let top = c3.lerp(c2, u);
        bottom.lerp(top, v)
    }

    /// Interpolated shading frame at face parameter (u, v).
    pub fn frame_at(&self, face: FaceId, u: f32, v: f32) -> TangentFrame {
        TangentFrame::bilerp(&self.frames[face], u, v)
    }

    /// Face-space (u, v) of a barycentric hit on one of the face's
    /// triangles. `bary` is (u, v) weights of the triangle's second and
    /// third vertices.
    pub fn face_uv_of_hit(&self, triangle: usize, bary: (f32, f32)) -> (f32, f32) {
        // Triangle 2f maps (c0,c1,c2) to quad UV (0,0),(1,0),(1,1);
        // triangle 2f+1 maps (c0,c2,c3) to (0,0),(1,1),(0,1).
        let (bu, bv) = bary;
        if triangle % 2 == 0 {
            (bu + bv, bv)
        } else {
            (bu, bu + bv)
        }
    }

    /// Scene bounds as (min, max). Returns zeros for an empty scene.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        if self.positions.is_empty() {
            return (Vec3::ZERO, Vec3::ZERO);
        }

        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for &position in &self.positions {
            min = min.min(position);
            max = max.max(position);
        }
        (min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_floor() -> [Vec3; 4] {
        [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(0.0, 0.0, 1.0),
        ]
    }

    #[test]
    fn test_vertex_dedup_across_faces() {
        let mut builder = SceneBuilder::new();
        builder.add_quad(unit_floor(), Material::default());

        // Shares the c1-c2 edge with the first quad
        builder.add_quad(
            [
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(2.0, 0.0, 0.0),
                Vec3::new(2.0, 0.0, 1.0),
                Vec3::new(1.0, 0.0, 1.0),
            ],
            Material::default(),
        );

        let scene = builder.build();
        assert_eq!(scene.face_count(), 2);
        assert_eq!(scene.positions().len(), 6);
    }

    #[test]
    fn test_triangle_split_shares_diagonal() {
        let mut builder = SceneBuilder::new();
        builder.add_quad(unit_floor(), Material::default());
        let scene = builder.build();

        assert_eq!(scene.triangle_count(), 2);
        let t0 = scene.triangle_positions(0);
        let t1 = scene.triangle_positions(1);

        // Both triangles contain c0 and c2
        assert_eq!(t0[0], t1[0]);
        assert_eq!(t0[2], t1[1]);
        assert_eq!(scene.triangle_face(0), 0);
        assert_eq!(scene.triangle_face(1), 0);
    }

    #[test]
    fn test_corner_frames_face_up() {
        let mut builder = SceneBuilder::new();
        // CCW seen from above (+Y): 0,0 -> 1,0 -> 1,-1? Use XZ floor wound so
        // the normal is +Y: x then -z.
        builder.add_quad(
            [
                Vec3::new(0.0, 0.0, 1.0),
                Vec3::new(1.0, 0.0, 1.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 0.0, 0.0),
            ],
            Material::default(),
        );
        let scene = builder.build();

        for frame in scene.face_frames(0) {
            assert!((frame.normal - Vec3::Y).length() < 1e-5);
        }
    }

    #[test]
    fn test_point_at_bilinear() {
        let mut builder = SceneBuilder::new();
        builder.add_quad(unit_floor(), Material::default());
        let scene = builder.build();

        let center = scene.point_at(0, 0.5, 0.5);
        assert!((center - Vec3::new(0.5, 0.0, 0.5)).length() < 1e-6);

        let corner = scene.point_at(0, 0.0, 1.0);
        assert!((corner - Vec3::new(0.0, 0.0, 1.0)).length() < 1e-6);
    }

    #[test]
    fn test_face_uv_of_hit_covers_both_triangles() {
        let mut builder = SceneBuilder::new();
        builder.add_quad(unit_floor(), Material::default());
        let scene = builder.build();

        // Centroid of triangle 0: bary (1/3, 1/3) over (c0, c1, c2)
        let (u, v) = scene.face_uv_of_hit(0, (1.0 / 3.0, 1.0 / 3.0));
        assert!((u - 2.0 / 3.0).abs() < 1e-6);
        assert!((v - 1.0 / 3.0).abs() < 1e-6);

        // Centroid of triangle 1 over (c0, c2, c3)
        let (u, v) = scene.face_uv_of_hit(1, (1.0 / 3.0, 1.0 / 3.0));
        assert!((u - 1.0 / 3.0).abs() < 1e-6);
        assert!((v - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_area_light_radiance_from_flux() {
        let mut builder = SceneBuilder::new();
        let light = AreaLight {
            origin: Vec3::ZERO,
            tangent: Vec3::new(2.0, 0.0, 0.0),
            bitangent: Vec3::new(0.0, 0.0, 1.0),
            normal: Vec3::Y,
            flux: Vec3::splat(PI * 4.0),
        };
        let id = builder.add_area_light(&light);
        let scene = builder.build();

        // Area 2, flux 4*pi -> radiance = 4*pi / (pi * 2) = 2
        let emission = scene.face(id).material.emission;
        assert!((emission - Vec3::splat(2.0)).length() < 1e-5);
        assert!(scene.face(id).material.is_emissive());

        // Front side must face the requested normal
        let frame = scene.face_frames(id)[0];
        assert!(frame.normal.dot(Vec3::Y) > 0.99);
    }

    #[test]
    fn test_area_light_flipped_winding() {
        let mut builder = SceneBuilder::new();
        let light = AreaLight {
            origin: Vec3::ZERO,
            tangent: Vec3::new(0.0, 0.0, 1.0),
            bitangent: Vec3::new(1.0, 0.0, 0.0),
            normal: Vec3::Y,
            flux: Vec3::ONE,
        };
        let id = builder.add_area_light(&light);
        let scene = builder.build();

        let frame = scene.face_frames(id)[0];
        assert!(frame.normal.dot(Vec3::Y) > 0.99);
    }

    #[test]
    fn test_from_axis_positions() {
        let xs = [0.0, 1.0, 1.0, 0.0];
        let ys = [0.0, 0.0, 0.0, 0.0];
        let zs = [0.0, 0.0, 1.0, 1.0];
        let mut builder = SceneBuilder::from_axis_positions(&xs, &ys, &zs);
        builder.add_quad_indexed([0, 1, 2, 3], Material::default());
        let scene = builder.build();

        assert_eq!(scene.positions().len(), 4);
        assert_eq!(scene.face_corners(0)[2], Vec3::new(1.0, 0.0, 1.0));
    }
}
