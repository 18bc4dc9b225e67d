//! Radiosity shading of one lightmap texel.
//!
//! Outgoing radiance = emission + reflectance x Monte-Carlo-integrated
//! incident radiance. The gather rotates the iteration's shared sample set
//! into the texel's frame (random rotation about the normal so the shared
//! set doesn't alias into banding), prunes sample directions through the
//! quantized-normal masks, and confirms every survivor with the exact
//! intersector. Incident radiance comes from the previous iteration's
//! accumulator, which already contains each face's emission.

use std::f32::consts::TAU;

use glam::Vec3;
use rand::rngs::StdRng;
use rand::Rng;

use crate::hemisphere::{and3_or_into, for_each_set_bit, HemisphereLookup};
use crate::layout::LightmapAtlas;
use crate::raycast::{RayHit, TriangleBatches};
use crate::storage::RadianceStorage;
use ember_core::{Brdf, FaceId, QuadScene};
use ember_math::{Ray, TangentFrame};

/// Everything a worker needs to shade texels within one iteration. All
/// fields are immutable for the iteration's duration.
pub struct ShadeContext<'a, S: RadianceStorage> {
    pub scene: &'a QuadScene,
    pub tris: &'a TriangleBatches,
    pub lookup: &'a HemisphereLookup,
    pub atlas: &'a LightmapAtlas,
    /// Previous iteration's accumulator (read-only)
    pub prev: &'a S,
}

/// Reflect an outgoing vector about an axis: 2(v.axis)axis - v.
#[inline]
fn reflect(v: Vec3, axis: Vec3) -> Vec3 {
    2.0 * v.dot(axis) * axis - v
}

/// Schlick's approximation with an RGB F0.
#[inline]
fn schlick(cosine: f32, f0: Vec3) -> Vec3 {
    let c = 1.0 - cosine.clamp(0.0, 1.0);
    f0 + (Vec3::ONE - f0) * c.powi(5)
}

/// Sample a GGX half-vector around +Z with roughness alpha.
fn sample_ggx_half(alpha: f32, rng: &mut StdRng) -> Vec3 {
    let xi1: f32 = rng.gen();
    let xi2: f32 = rng.gen();
    let a2 = alpha * alpha;
    let cos2 = (1.0 - xi1) / (1.0 + (a2 - 1.0) * xi1);
    let cos_theta = cos2.sqrt();
    let sin_theta = (1.0 - cos2).max(0.0).sqrt();
    let phi = TAU * xi2;
    Vec3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta)
}

/// Shade every view slot of texel (x, y) of `face` into `out`.
///
/// `out` must hold exactly `atlas.slots_per_texel()` entries; slot order is
/// t-major, matching [`LightmapAtlas::slot_of`].
pub fn shade_texel<S: RadianceStorage>(
    ctx: &ShadeContext<'_, S>,
    face: FaceId,
    x: u32,
    y: u32,
    rng: &mut StdRng,
    out: &mut [Vec3],
) {
    let layout = ctx.atlas.layout(face);
    debug_assert_eq!(out.len(), ctx.atlas.slots_per_texel());

    let u = (x as f32 + 0.5) / layout.width as f32;
    let v = (y as f32 + 0.5) / layout.height as f32;
    let point = ctx.scene.point_at(face, u, v);
    let base_frame = ctx.scene.frame_at(face, u, v);
    let frame = base_frame.rotated_about_normal(rng.gen::<f32>() * TAU);

    let material = &ctx.scene.face(face).material;
    let (s_size, t_size) = ctx.atlas.view_grid();

    match material.brdf() {
        Brdf::Diffuse => {
            let gather = gather_hemisphere(ctx, face, point, &frame);
            let color = material.emission + material.diffuse * gather;
            out.fill(color);
        }
        Brdf::Mirror => {
            for t in 0..t_size {
                for s in 0..s_size {
                    let view = base_frame.to_world(ctx.atlas.view_dir_local(s, t));
                    let incident = reflect(view, frame.normal);
                    let radiance = incident_radiance(ctx, point, incident);
                    out[t * s_size + s] = material.emission + material.specular * radiance;
                }
            }
        }
        Brdf::Glossy { gloss } => {
            let gather = gather_hemisphere(ctx, face, point, &frame);
            let diffuse_part = material.emission + material.diffuse * gather * gloss;
            let alpha = gloss * gloss;

            for t in 0..t_size {
                for s in 0..s_size {
                    let view = base_frame.to_world(ctx.atlas.view_dir_local(s, t));
                    let half = frame.to_world(sample_ggx_half(alpha, rng));
                    let incident = reflect(view, half);

                    let mut specular_part = Vec3::ZERO;
                    if incident.dot(frame.normal) > 0.0 {
                        let fresnel = schlick(view.dot(half), material.specular);
                        let radiance = incident_radiance(ctx, point, incident);
                        specular_part = fresnel * radiance * (1.0 - gloss);
                    }
                    out[t * s_size + s] = diffuse_part + specular_part;
                }
            }
        }
    }
}

/// Cosine-weighted hemisphere gather of previous-iteration radiance.
///
/// With cosine importance sampling the estimator is the plain average of the
/// radiance seen along each sample direction; the cosine and pi factors
/// cancel against the pdf.
fn gather_hemisphere<S: RadianceStorage>(
    ctx: &ShadeContext<'_, S>,
    face: FaceId,
    point: Vec3,
    frame: &TangentFrame,
) -> Vec3 {
    let samples = &ctx.lookup.samples;
    let table = &ctx.lookup.table;
    let mut blocked = vec![0u64; table.words()];

    // Bound which sample directions any other face could block. A sample
    // reaches a triangle's front side only while traveling against its
    // normal, so each vertex normal is negated before the table lookup:
    // the AND picks out directions inside all three flipped hemispheres.
    // A flat quad cannot occlude its own hemisphere; its triangles are
    // skipped.
    let own = [face * 2, face * 2 + 1];
    for tri in 0..ctx.scene.triangle_count() {
        if own.contains(&tri) {
            continue;
        }
        let frames = ctx.scene.triangle_frames(tri);
        let m0 = table.mask(frame.to_local(-frames[0].normal));
        let m1 = table.mask(frame.to_local(-frames[1].normal));
        let m2 = table.mask(frame.to_local(-frames[2].normal));
        and3_or_into(&mut blocked, m0, m1, m2);

        if blocked.iter().all(|&w| w == u64::MAX) {
            break;
        }
    }

    let mut sum = Vec3::ZERO;
    for_each_set_bit(&blocked, |i| {
        let dir = frame.to_world(samples.dir(i));
        let ray = Ray::biased(point, dir);
        let hit = ctx.tris.intersect_two_sided(&ray);
        if hit.is_hit() {
            sum += previous_radiance(ctx, &hit, dir);
        }
    });

    sum / samples.len() as f32
}

/// Previous-iteration radiance along a single explicit direction.
fn incident_radiance<S: RadianceStorage>(
    ctx: &ShadeContext<'_, S>,
    point: Vec3,
    dir: Vec3,
) -> Vec3 {
    let ray = Ray::biased(point, dir);
    let hit = ctx.tris.intersect_two_sided(&ray);
    if hit.is_hit() {
        previous_radiance(ctx, &hit, dir)
    } else {
        Vec3::ZERO
    }
}

/// Look up the accumulated radiance a hit point sent back along `-dir`
/// last iteration: nearest texel of the hit face, nearest view slot to the
/// return direction.
fn previous_radiance<S: RadianceStorage>(
    ctx: &ShadeContext<'_, S>,
    hit: &RayHit,
    dir: Vec3,
) -> Vec3 {
    let tri = hit.triangle as usize;
    let face = ctx.scene.triangle_face(tri);
    let (u, v) = ctx.scene.face_uv_of_hit(tri, (hit.u, hit.v));
    let u = u.clamp(0.0, 1.0);
    let v = v.clamp(0.0, 1.0);

    let layout = ctx.atlas.layout(face);
    let x = ((u * layout.width as f32) as u32).min(layout.width - 1);
    let y = ((v * layout.height as f32) as u32).min(layout.height - 1);

    let hit_frame = ctx.scene.frame_at(face, u, v);
    let (s, t) = ctx.atlas.view_slot_for_local(hit_frame.to_local(-dir));

    ctx.prev.load(ctx.atlas.slot_of(face, x, y, s, t))
}
