//! Simple radiosity bake example.
//!
//! Bakes an open box lit by a ceiling panel and saves the floor lightmap
//! to PPM format.

use ember_baker::{
    AreaLight, BakeConfig, Material, ProgressiveBaker, SceneBuilder, Vec3,
};
use std::fs::File;
use std::io::{BufWriter, Write};

const ITERATIONS: u32 = 64;

fn main() {
    env_logger::init();

    println!("EMBER Radiosity Baker - Box Example");
    println!("===================================");

    let start = std::time::Instant::now();
    let scene = build_scene();
    println!(
        "Scene built in {:?} ({} faces)",
        start.elapsed(),
        scene.face_count()
    );

    let config = BakeConfig {
        sample_count: 256,
        texel_density: 16.0,
        seed: 1,
        ..Default::default()
    };

    let mut baker = ProgressiveBaker::new(scene, config).expect("bake setup failed");
    println!(
        "Atlas: {} texels, {} view slots each",
        baker.atlas().texel_count(),
        baker.atlas().slots_per_texel()
    );

    let start = std::time::Instant::now();
    for _ in 0..ITERATIONS {
        let stats = baker.iterate();
        if stats.iteration % 16 == 0 {
            println!(
                "  iteration {:3}: shade {:?}, store {:?}",
                stats.iteration, stats.shade, stats.store
            );
        }
    }
    println!("Baked {} iterations in {:?}", ITERATIONS, start.elapsed());

    let filename = "floor_lightmap.ppm";
    save_ppm(&baker, 0, filename).expect("Failed to save lightmap");
    println!("Saved to {}", filename);
}

fn build_scene() -> ember_baker::QuadScene {
    let mut builder = SceneBuilder::new();
    let white = Material::diffuse(Vec3::splat(0.73));
    let red = Material::diffuse(Vec3::new(0.65, 0.05, 0.05));
    let green = Material::diffuse(Vec3::new(0.12, 0.45, 0.15));

    // Floor (+Y up)
    builder.add_quad(
        [
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 0.0),
        ],
        white.clone(),
    );
    // Ceiling (-Y down)
    builder.add_quad(
        [
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(0.0, 1.0, 1.0),
        ],
        white.clone(),
    );
    // Back wall (+Z toward the viewer)
    builder.add_quad(
        [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ],
        white,
    );
    // Side walls
    builder.add_quad(
        [
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 1.0),
        ],
        red,
    );
    builder.add_quad(
        [
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(1.0, 1.0, 0.0),
        ],
        green,
    );

    // Ceiling light panel, slightly below the ceiling
    builder.add_area_light(&AreaLight {
        origin: Vec3::new(0.35, 0.99, 0.35),
        tangent: Vec3::new(0.3, 0.0, 0.0),
        bitangent: Vec3::new(0.0, 0.0, 0.3),
        normal: -Vec3::Y,
        flux: Vec3::new(4.0, 4.0, 3.4),
    });

    builder.build()
}

fn save_ppm(baker: &ProgressiveBaker, face: usize, filename: &str) -> std::io::Result<()> {
    let layout = *baker.atlas().layout(face);
    let slots = baker.atlas().slots_per_texel();
    let lightmap = baker.face_lightmap(face);

    let file = File::create(filename)?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "P3")?;
    writeln!(writer, "{} {}", layout.width, layout.height)?;
    writeln!(writer, "255")?;

    for y in 0..layout.height {
        for x in 0..layout.width {
            let value = lightmap[(y as usize * layout.width as usize + x as usize) * slots];
            // Gamma 2.0, clamped to 8 bits
            let to_byte = |channel: f32| (255.0 * channel.max(0.0).sqrt().min(1.0)) as u8;
            writeln!(
                writer,
                "{} {} {}",
                to_byte(value.x),
                to_byte(value.y),
                to_byte(value.z)
            )?;
        }
    }

    Ok(())
}
