//! Batched ray-triangle intersection.
//!
//! Uses the Möller-Trumbore algorithm over structure-of-arrays triangle data:
//! the scene's triangles are flattened into lane-aligned buffers at build
//! time, and one ray is tested against [`LANES`] triangles per batch so the
//! inner loop compiles down to vector arithmetic. This is the dominant cost
//! of the whole bake; everything else exists to amortize it.

use glam::Vec3;

use ember_core::QuadScene;
use ember_math::{LaneBuffer, Ray, LANES};

/// Determinant threshold below which a triangle counts as parallel/degenerate.
const DET_EPS: f32 = 1e-8;

/// Minimum accepted hit parameter. Hits at or behind the origin fold into
/// "no hit" rather than surfacing as errors.
const T_MIN: f32 = 1e-4;

/// Nearest-hit result: triangle index, ray parameter, barycentrics of the
/// triangle's second and third vertices.
#[derive(Debug, Clone, Copy)]
pub struct RayHit {
    pub triangle: u32,
    pub t: f32,
    pub u: f32,
    pub v: f32,
}

impl RayHit {
    /// The "no hit" sentinel: infinite t, invalid triangle index.
    pub const NONE: RayHit = RayHit {
        triangle: u32::MAX,
        t: f32::INFINITY,
        u: 0.0,
        v: 0.0,
    };

    /// True if this records an actual intersection.
    #[inline]
    pub fn is_hit(&self) -> bool {
        self.t.is_finite()
    }
}

/// Scene triangles flattened to lane-aligned SoA buffers.
///
/// Per triangle: one anchor vertex and the two edge vectors out of it, one
/// `LaneBuffer` per axis. Padding lanes hold zero edges, so their determinant
/// never passes the epsilon test and they can never report a hit.
pub struct TriangleBatches {
    v0x: LaneBuffer,
    v0y: LaneBuffer,
    v0z: LaneBuffer,
    e1x: LaneBuffer,
    e1y: LaneBuffer,
    e1z: LaneBuffer,
    e2x: LaneBuffer,
    e2y: LaneBuffer,
    e2z: LaneBuffer,
    count: usize,
}

impl TriangleBatches {
    /// Flatten a scene's triangles.
    pub fn from_scene(scene: &QuadScene) -> Self {
        let count = scene.triangle_count();
        let mut v0 = [Vec::with_capacity(count), Vec::new(), Vec::new()];
        let mut e1 = [Vec::with_capacity(count), Vec::new(), Vec::new()];
        let mut e2 = [Vec::with_capacity(count), Vec::new(), Vec::new()];

        for tri in 0..count {
            let [a, b, c] = scene.triangle_positions(tri);
            let edge1 = b - a;
            let edge2 = c - a;
            for axis in 0..3 {
                v0[axis].push(a[axis]);
                e1[axis].push(edge1[axis]);
                e2[axis].push(edge2[axis]);
            }
        }

        let buffer = |values: &[f32]| LaneBuffer::from_slice(values, 0.0);
        Self {
            v0x: buffer(&v0[0]),
            v0y: buffer(&v0[1]),
            v0z: buffer(&v0[2]),
            e1x: buffer(&e1[0]),
            e1y: buffer(&e1[1]),
            e1z: buffer(&e1[2]),
            e2x: buffer(&e2[0]),
            e2y: buffer(&e2[1]),
            e2z: buffer(&e2[2]),
            count,
        }
    }

    /// Number of real triangles (padding excluded).
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    /// True if the scene has no triangles.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Nearest hit accepting only front-facing triangles (positive
    /// determinant: the ray approaches against the triangle normal).
    #[inline]
    pub fn intersect_front(&self, ray: &Ray) -> RayHit {
        self.intersect::<false>(ray)
    }

    /// Nearest hit accepting either winding. Gather rays use this together
    /// with a biased origin so a surface cannot shadow itself.
    #[inline]
    pub fn intersect_two_sided(&self, ray: &Ray) -> RayHit {
        self.intersect::<true>(ray)
    }

    fn intersect<const TWO_SIDED: bool>(&self, ray: &Ray) -> RayHit {
        let o = ray.origin();
        let d = ray.direction();
        let mut best = RayHit::NONE;

        for batch in 0..self.v0x.lane_count() {
            let v0x = self.v0x.lane(batch);
            let v0y = self.v0y.lane(batch);
            let v0z = self.v0z.lane(batch);
            let e1x = self.e1x.lane(batch);
            let e1y = self.e1y.lane(batch);
            let e1z = self.e1z.lane(batch);
            let e2x = self.e2x.lane(batch);
            let e2y = self.e2y.lane(batch);
            let e2z = self.e2z.lane(batch);

            let mut t_lane = [f32::INFINITY; LANES];
            let mut u_lane = [0.0f32; LANES];
            let mut v_lane = [0.0f32; LANES];

            for l in 0..LANES {
                // h = d x e2
                let hx = d.y * e2z[l] - d.z * e2y[l];
                let hy = d.z * e2x[l] - d.x * e2z[l];
                let hz = d.x * e2y[l] - d.y * e2x[l];

                let det = e1x[l] * hx + e1y[l] * hy + e1z[l] * hz;
                let facing = if TWO_SIDED {
                    det.abs() > DET_EPS
                } else {
                    det > DET_EPS
                };

                let inv = 1.0 / det;
                let sx = o.x - v0x[l];
                let sy = o.y - v0y[l];
                let sz = o.z - v0z[l];
                let u = (sx * hx + sy * hy + sz * hz) * inv;

                // q = s x e1
                let qx = sy * e1z[l] - sz * e1y[l];
                let qy = sz * e1x[l] - sx * e1z[l];
                let qz = sx * e1y[l] - sy * e1x[l];
                let v = (d.x * qx + d.y * qy + d.z * qz) * inv;

                let t = (e2x[l] * qx + e2y[l] * qy + e2z[l] * qz) * inv;

                // NaNs from a zero determinant fail every comparison here,
                // so degenerate lanes fold into "no hit" on their own.
                let inside = u >= 0.0 && v >= 0.0 && u + v <= 1.0;
                if facing && inside && t > T_MIN {
                    t_lane[l] = t;
                    u_lane[l] = u;
                    v_lane[l] = v;
                }
            }

            // Per-batch minimum, then reduce into the running best
            let mut lane_best = 0;
            for l in 1..LANES {
                if t_lane[l] < t_lane[lane_best] {
                    lane_best = l;
                }
            }
            if t_lane[lane_best] < best.t {
                best = RayHit {
                    triangle: (batch * LANES + lane_best) as u32,
                    t: t_lane[lane_best],
                    u: u_lane[lane_best],
                    v: v_lane[lane_best],
                };
            }
        }

        best
    }
}
