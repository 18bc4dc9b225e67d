//! Per-face lightmap allocation.
//!
//! Sizes every face's (U, V) texel grid from the worst-case projected edge
//! length observed across a small grid of sheared-perspective virtual
//! viewpoints, scaled by the configured texel density. Resolutions round up
//! to even. Total storage is checked against the configured hard ceiling
//! before anything is allocated: the per-face sample count
//! U * V * sSize * tSize * 3 floats grows multiplicatively with scene
//! complexity, so the budget failure is fatal and happens before iteration 0.

use glam::Vec3;

use ember_core::{BakeConfig, BakeError, BakeResult, FaceId, QuadScene};

/// Faces closer than this along a viewpoint's forward axis don't project.
const W_MIN: f32 = 1e-3;

/// Shear factor of the per-texel angular view grid (local space).
const VIEW_SHEAR: f32 = 0.75;

/// One face's lightmap parameterization: resolution and base offset into
/// the flat sample storage, in float-triplet units.
#[derive(Debug, Clone, Copy)]
pub struct LightmapLayout {
    pub width: u32,
    pub height: u32,
    pub offset: usize,
}

impl LightmapLayout {
    /// Texels in this face's spatial grid.
    #[inline]
    pub fn texel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// All face layouts plus the shared angular view grid.
pub struct LightmapAtlas {
    layouts: Vec<LightmapLayout>,
    view_grid: (usize, usize),
    total_slots: usize,
}

/// Per-axis resolution cap. A face skimming a viewpoint can project to a
/// near-infinite density; the storage budget rejects such scenes anyway,
/// but the clamp keeps the arithmetic finite first.
const MAX_SIDE: u32 = 1 << 16;

/// Round up to the next even value, never below 2.
fn even_up(texels: u32) -> u32 {
    (texels.clamp(2, MAX_SIDE) + 1) & !1
}

/// Projected length of the segment a-b seen from `eye` looking along
/// `forward`, on the image plane at unit focal distance. Returns zero when
/// either endpoint is at or behind the eye.
fn projected_length(a: Vec3, b: Vec3, eye: Vec3, forward: Vec3, right: Vec3, up: Vec3) -> f32 {
    let qa = a - eye;
    let qb = b - eye;
    let wa = qa.dot(forward);
    let wb = qb.dot(forward);
    if wa < W_MIN || wb < W_MIN {
        return 0.0;
    }
    let sa = glam::Vec2::new(qa.dot(right) / wa, qa.dot(up) / wa);
    let sb = glam::Vec2::new(qb.dot(right) / wb, qb.dot(up) / wb);
    (sb - sa).length()
}

impl LightmapAtlas {
    /// Size every face and assign storage offsets.
    pub fn allocate(scene: &QuadScene, config: &BakeConfig) -> BakeResult<Self> {
        let (s_size, t_size) = config.view_grid;
        let (bounds_min, bounds_max) = scene.bounds();
        let center = (bounds_min + bounds_max) * 0.5;
        let diagonal = (bounds_max - bounds_min).length().max(1e-3);

        // Base eye: configured, or an oblique vantage above the scene
        let base_eye = match config.eye {
            Some(eye) => Vec3::from_array(eye),
            None => center + Vec3::new(0.4, 1.0, 0.7).normalize() * (1.25 * diagonal),
        };
        let forward0 = (center - base_eye).normalize_or_zero();
        let forward0 = if forward0 == Vec3::ZERO { -Vec3::Y } else { forward0 };
        let arbitrary = if forward0.y.abs() < 0.9 { Vec3::Y } else { Vec3::X };
        let right0 = forward0.cross(arbitrary).normalize();
        let up0 = right0.cross(forward0);
        let spread = 0.35 * diagonal;

        // The sheared viewpoint set
        let mut viewpoints = Vec::with_capacity(s_size * t_size);
        for t in 0..t_size {
            for s in 0..s_size {
                let sx = ((s as f32 + 0.5) / s_size as f32) * 2.0 - 1.0;
                let ty = ((t as f32 + 0.5) / t_size as f32) * 2.0 - 1.0;
                let eye = base_eye + (right0 * sx + up0 * ty) * spread;
                let forward = (center - eye).normalize();
                let right = forward.cross(up0).normalize();
                let up = right.cross(forward);
                viewpoints.push((eye, forward, right, up));
            }
        }

        let mut layouts = Vec::with_capacity(scene.face_count());
        let mut offset = 0usize;

        for face in 0..scene.face_count() {
            let [c0, c1, c2, c3] = scene.face_corners(face);

            let area = 0.5 * ((c1 - c0).cross(c2 - c0).length()
                + (c2 - c0).cross(c3 - c0).length());
            if area <= f32::EPSILON {
                return Err(BakeError::DegenerateFace { face });
            }

            // Worst-case projected density per parameter axis
            let mut u_len = 0.0f32;
            let mut v_len = 0.0f32;
            for &(eye, forward, right, up) in &viewpoints {
                u_len = u_len
                    .max(projected_length(c0, c1, eye, forward, right, up))
                    .max(projected_length(c3, c2, eye, forward, right, up));
                v_len = v_len
                    .max(projected_length(c1, c2, eye, forward, right, up))
                    .max(projected_length(c0, c3, eye, forward, right, up));
            }

            let width = even_up((u_len * config.texel_density).ceil() as u32);
            let height = even_up((v_len * config.texel_density).ceil() as u32);

            layouts.push(LightmapLayout {
                width,
                height,
                offset,
            });
            offset += width as usize * height as usize * s_size * t_size;
        }

        let total_floats = offset * 3;
        if total_floats > config.storage_budget {
            return Err(BakeError::StorageBudgetExceeded {
                required: total_floats,
                budget: config.storage_budget,
            });
        }

        log::info!(
            "lightmap atlas: {} faces, {} slots ({} floats of {} budget)",
            layouts.len(),
            offset,
            total_floats,
            config.storage_budget
        );

        Ok(Self {
            layouts,
            view_grid: (s_size, t_size),
            total_slots: offset,
        })
    }

    /// Layout of one face.
    #[inline]
    pub fn layout(&self, face: FaceId) -> &LightmapLayout {
        &self.layouts[face]
    }

    /// All layouts, face order.
    #[inline]
    pub fn layouts(&self) -> &[LightmapLayout] {
        &self.layouts
    }

    /// The angular grid shared by every texel.
    #[inline]
    pub fn view_grid(&self) -> (usize, usize) {
        self.view_grid
    }

    /// View slots per texel (sSize * tSize).
    #[inline]
    pub fn slots_per_texel(&self) -> usize {
        self.view_grid.0 * self.view_grid.1
    }

    /// Total float-triplet slots across all faces.
    #[inline]
    pub fn total_slots(&self) -> usize {
        self.total_slots
    }

    /// Total spatial texels across all faces.
    pub fn texel_count(&self) -> usize {
        self.layouts.iter().map(|l| l.texel_count()).sum()
    }

    /// Storage slot of the first view sample of texel (x, y).
    #[inline]
    pub fn texel_base(&self, face: FaceId, x: u32, y: u32) -> usize {
        let layout = &self.layouts[face];
        debug_assert!(x < layout.width && y < layout.height, "texel out of range");
        layout.offset
            + (y as usize * layout.width as usize + x as usize) * self.slots_per_texel()
    }

    /// Storage slot of view sample (s, t) of texel (x, y).
    #[inline]
    pub fn slot_of(&self, face: FaceId, x: u32, y: u32, s: usize, t: usize) -> usize {
        self.texel_base(face, x, y) + t * self.view_grid.0 + s
    }

    /// Local-space outgoing direction of view slot (s, t): a sheared grid
    /// over the surface's upper hemisphere, +Z for the 1x1 grid.
    pub fn view_dir_local(&self, s: usize, t: usize) -> Vec3 {
        let (s_size, t_size) = self.view_grid;
        if s_size * t_size == 1 {
            return Vec3::Z;
        }
        let sx = ((s as f32 + 0.5) / s_size as f32) * 2.0 - 1.0;
        let ty = ((t as f32 + 0.5) / t_size as f32) * 2.0 - 1.0;
        Vec3::new(sx * VIEW_SHEAR, ty * VIEW_SHEAR, 1.0).normalize()
    }

    /// Nearest view slot for a local-space direction (inverse of
    /// [`LightmapAtlas::view_dir_local`], clamped at the grid edges).
    pub fn view_slot_for_local(&self, dir: Vec3) -> (usize, usize) {
        let (s_size, t_size) = self.view_grid;
        if s_size * t_size == 1 {
            return (0, 0);
        }
        let z = dir.z.max(W_MIN);
        let sx = (dir.x / z / VIEW_SHEAR + 1.0) * 0.5;
        let ty = (dir.y / z / VIEW_SHEAR + 1.0) * 0.5;
        let s = ((sx * s_size as f32) as isize).clamp(0, s_size as isize - 1) as usize;
        let t = ((ty * t_size as f32) as isize).clamp(0, t_size as isize - 1) as usize;
        (s, t)
    }
}
