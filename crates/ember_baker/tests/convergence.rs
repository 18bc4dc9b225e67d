//! End-to-end bakes against analytic references.

use ember_baker::{
    AreaLight, BakeConfig, Material, ProgressiveBaker, QuadScene, Vec3,
};
use ember_core::SceneBuilder;

/// 1x1 floor at y=0 facing up, 1x1 ceiling at y=1 facing down.
fn floor_and_ceiling(floor_mat: Material, ceiling_mat: Material) -> QuadScene {
    let mut builder = SceneBuilder::new();
    builder.add_quad(
        [
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 0.0),
        ],
        floor_mat,
    );
    builder.add_quad(
        [
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(0.0, 1.0, 1.0),
        ],
        ceiling_mat,
    );
    builder.build()
}

fn config() -> BakeConfig {
    BakeConfig {
        sample_count: 256,
        normal_grid: 64,
        texel_density: 4.0,
        eye: Some([0.5, 3.0, 0.5]),
        seed: 17,
        ..Default::default()
    }
}

/// Irradiance at `point` (on the upward-facing floor) from a ceiling patch
/// of constant radiance, by midpoint quadrature of the point-to-area
/// cosine-weighted inverse-square integral:
/// E = L * integral cos(theta_p) * cos(theta_a) / r^2 dA.
fn ceiling_irradiance(point: Vec3, radiance: f32) -> f32 {
    const GRID: usize = 256;
    let da = 1.0 / (GRID * GRID) as f32;
    let mut sum = 0.0f64;
    for i in 0..GRID {
        for j in 0..GRID {
            let sample = Vec3::new(
                (i as f32 + 0.5) / GRID as f32,
                1.0,
                (j as f32 + 0.5) / GRID as f32,
            );
            let delta = sample - point;
            let r2 = delta.length_squared();
            let cos_p = delta.y / r2.sqrt(); // floor normal +Y
            let cos_a = delta.y / r2.sqrt(); // ceiling normal -Y
            sum += (cos_p * cos_a / r2) as f64 * da as f64;
        }
    }
    radiance * sum as f32
}

/// White floor under an emissive ceiling, zero reflectance elsewhere. A
/// floor texel's converged radiance must land within 5% of the textbook
/// point-to-area irradiance over pi.
#[test]
fn test_floor_matches_analytic_irradiance() {
    let emitted = 1.0f32;
    let scene = floor_and_ceiling(
        Material::diffuse(Vec3::ONE),
        Material::emissive(Vec3::splat(emitted)),
    );
    let mut baker = ProgressiveBaker::new(scene, config()).unwrap();
    for _ in 0..60 {
        baker.iterate();
    }

    let atlas = baker.atlas();
    let layout = *atlas.layout(0);
    let floor = baker.face_lightmap(0);

    // Texel nearest the face center
    let x = layout.width / 2;
    let y = layout.height / 2;
    let baked = floor[(y as usize * layout.width as usize + x as usize)
        * atlas.slots_per_texel()];

    // The same texel center in world space (floor runs x right, z toward
    // the viewer, v axis flipped)
    let u = (x as f32 + 0.5) / layout.width as f32;
    let v = (y as f32 + 0.5) / layout.height as f32;
    let point = Vec3::new(u, 0.0, 1.0 - v);

    let expected = ceiling_irradiance(point, emitted) / std::f32::consts::PI;
    let error = (baked.x - expected).abs() / expected;
    assert!(
        error < 0.05,
        "baked {} vs analytic {} ({}% off)",
        baked.x,
        expected,
        error * 100.0
    );

    // Grey in, grey out
    assert!((baked.x - baked.y).abs() < 1e-6);
    assert!((baked.x - baked.z).abs() < 1e-6);
}

/// Error against the analytic solution shrinks as iterations accumulate.
#[test]
fn test_error_shrinks_with_iterations() {
    let scene = floor_and_ceiling(
        Material::diffuse(Vec3::ONE),
        Material::emissive(Vec3::ONE),
    );
    let mut baker = ProgressiveBaker::new(scene, config()).unwrap();

    let atlas = baker.atlas();
    let layout = *atlas.layout(0);
    let slots = atlas.slots_per_texel();
    let x = layout.width / 2;
    let y = layout.height / 2;
    let index = (y as usize * layout.width as usize + x as usize) * slots;
    let u = (x as f32 + 0.5) / layout.width as f32;
    let v = (y as f32 + 0.5) / layout.height as f32;
    let expected = ceiling_irradiance(Vec3::new(u, 0.0, 1.0 - v), 1.0) / std::f32::consts::PI;

    let error_at = |baker: &ProgressiveBaker| -> f32 {
        (baker.face_lightmap(0)[index].x - expected).abs()
    };

    for _ in 0..4 {
        baker.iterate();
    }
    let early = error_at(&baker);

    for _ in 4..48 {
        baker.iterate();
    }
    let late = error_at(&baker);

    assert!(
        late <= early * 1.25 + 0.005,
        "error grew from {} to {}",
        early,
        late
    );
}

/// Closed two-face exchange: a dim reflective ceiling over a brighter floor
/// bounces light back; the floor's steady state exceeds single-bounce.
#[test]
fn test_interreflection_adds_radiance() {
    let single_bounce = {
        let scene = floor_and_ceiling(
            Material::diffuse(Vec3::ONE),
            Material::emissive(Vec3::ONE), // non-reflective light
        );
        let mut baker = ProgressiveBaker::new(scene, config()).unwrap();
        for _ in 0..40 {
            baker.iterate();
        }
        mean_radiance(&baker, 0)
    };

    let multi_bounce = {
        let scene = floor_and_ceiling(
            Material::diffuse(Vec3::ONE),
            Material {
                diffuse: Vec3::splat(0.8), // light also reflects
                emission: Vec3::ONE,
                ..Default::default()
            },
        );
        let mut baker = ProgressiveBaker::new(scene, config()).unwrap();
        for _ in 0..40 {
            baker.iterate();
        }
        mean_radiance(&baker, 0)
    };

    assert!(
        multi_bounce > single_bounce * 1.01,
        "interreflection had no effect: {} vs {}",
        multi_bounce,
        single_bounce
    );
}

fn mean_radiance(baker: &ProgressiveBaker, face: usize) -> f32 {
    let values = baker.face_lightmap(face);
    values.iter().map(|v| v.x).sum::<f32>() / values.len() as f32
}

/// Area lights enter the bake as ordinary emissive faces.
#[test]
fn test_area_light_illuminates_floor() {
    let mut builder = SceneBuilder::new();
    builder.add_quad(
        [
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 0.0),
        ],
        Material::diffuse(Vec3::ONE),
    );
    builder.add_area_light(&AreaLight {
        origin: Vec3::new(0.0, 1.0, 0.0),
        tangent: Vec3::new(1.0, 0.0, 0.0),
        bitangent: Vec3::new(0.0, 0.0, 1.0),
        normal: -Vec3::Y,
        flux: Vec3::splat(10.0),
    });
    let scene = builder.build();

    let mut baker = ProgressiveBaker::new(scene, config()).unwrap();
    for _ in 0..8 {
        baker.iterate();
    }

    assert!(
        mean_radiance(&baker, 0) > 0.0,
        "area light contributed nothing"
    );
}
