//! Progressive accumulation loop.
//!
//! Each iteration rebuilds the hemisphere lookup, shades every (face, texel)
//! pair against the previous iteration's immutable accumulator, and folds
//! the fresh estimates into a running average. Workers claim texels off one
//! shared atomic cursor; per-texel cost varies wildly with intersector
//! early-outs, so static partitioning would leave threads idle. Per-texel
//! random streams are seeded from (seed, iteration, texel index), making the
//! output bit-identical for any worker-pool size.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use glam::Vec3;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::hemisphere::HemisphereLookup;
use crate::layout::LightmapAtlas;
use crate::raycast::TriangleBatches;
use crate::shade::{shade_texel, ShadeContext};
use crate::storage::{MemoryStorage, RadianceStorage};
use ember_core::{BakeConfig, BakeResult, FaceId, QuadScene};

/// Where the baker is in its lifecycle. There is no terminal state; the
/// caller just stops asking for iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BakeState {
    /// Accumulator holds pure emission (iteration 0).
    Cleared,
    /// k iterations folded into the running average.
    Converging(u32),
}

/// Timing breakdown of one iteration. `store` is accumulated across all
/// workers, so it can exceed the wall-clock `shade` time.
#[derive(Debug, Clone, Copy)]
pub struct IterationStats {
    pub iteration: u32,
    pub shade: Duration,
    pub store: Duration,
}

#[derive(Clone, Copy)]
struct TexelRef {
    face: u32,
    x: u32,
    y: u32,
}

/// The progressive radiosity baker. Owns the scene, the flattened triangle
/// batches, the lightmap atlas, and both accumulator buffers.
pub struct ProgressiveBaker<S: RadianceStorage = MemoryStorage> {
    scene: QuadScene,
    config: BakeConfig,
    tris: TriangleBatches,
    atlas: LightmapAtlas,
    texels: Vec<TexelRef>,
    buffers: [S; 2],
    read: usize,
    iteration: u32,
}

fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Independent stream seed for (bake seed, iteration, stream index).
fn stream_seed(seed: u64, iteration: u32, index: u64) -> u64 {
    splitmix64(seed ^ splitmix64(((iteration as u64) << 32).wrapping_add(index)))
}

impl ProgressiveBaker<MemoryStorage> {
    /// Validate the config, size the lightmaps (this is where the storage
    /// budget can reject the scene), and clear the accumulator to emission.
    pub fn new(scene: QuadScene, config: BakeConfig) -> BakeResult<Self> {
        Self::with_storage(scene, config, MemoryStorage::new)
    }
}

impl<S: RadianceStorage> ProgressiveBaker<S> {
    /// Like [`ProgressiveBaker::new`] with a caller-supplied storage backend.
    /// `alloc` is invoked twice (read and write buffer) with the slot count.
    pub fn with_storage(
        scene: QuadScene,
        config: BakeConfig,
        mut alloc: impl FnMut(usize) -> S,
    ) -> BakeResult<Self> {
        config.validate()?;
        let atlas = LightmapAtlas::allocate(&scene, &config)?;
        let tris = TriangleBatches::from_scene(&scene);

        let mut texels = Vec::with_capacity(atlas.texel_count());
        for face in 0..scene.face_count() {
            let layout = atlas.layout(face);
            for y in 0..layout.height {
                for x in 0..layout.width {
                    texels.push(TexelRef {
                        face: face as u32,
                        x,
                        y,
                    });
                }
            }
        }

        let buffers = [alloc(atlas.total_slots()), alloc(atlas.total_slots())];
        let mut baker = Self {
            scene,
            config,
            tris,
            atlas,
            texels,
            buffers,
            read: 0,
            iteration: 0,
        };
        baker.clear();
        Ok(baker)
    }

    /// Reset the accumulator to pure emission (iteration 0). This is the
    /// only way accumulated samples are ever discarded.
    pub fn clear(&mut self) {
        for face in 0..self.scene.face_count() {
            let emission = self.scene.face(face).material.emission;
            let layout = self.atlas.layout(face);
            let slots = layout.texel_count() * self.atlas.slots_per_texel();
            for i in 0..slots {
                for buffer in &self.buffers {
                    buffer.store(layout.offset + i, emission);
                }
            }
        }
        self.read = 0;
        self.iteration = 0;
    }

    /// Current lifecycle state.
    pub fn state(&self) -> BakeState {
        if self.iteration == 0 {
            BakeState::Cleared
        } else {
            BakeState::Converging(self.iteration)
        }
    }

    /// Completed iterations.
    #[inline]
    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    /// The scene being baked.
    #[inline]
    pub fn scene(&self) -> &QuadScene {
        &self.scene
    }

    /// The lightmap atlas (resolutions, offsets, view grid).
    #[inline]
    pub fn atlas(&self) -> &LightmapAtlas {
        &self.atlas
    }

    /// The last completed iteration's accumulator.
    #[inline]
    pub fn radiance(&self) -> &S {
        &self.buffers[self.read]
    }

    /// Copy out one face's lightmap, slot order per
    /// [`LightmapAtlas::slot_of`]. Values are linear, not gamma-corrected.
    pub fn face_lightmap(&self, face: FaceId) -> Vec<Vec3> {
        let layout = self.atlas.layout(face);
        let slots = layout.texel_count() * self.atlas.slots_per_texel();
        let read = self.radiance();
        (0..slots).map(|i| read.load(layout.offset + i)).collect()
    }

    /// Run one full iteration: rebuild the hemisphere lookup, shade every
    /// texel in parallel, swap buffers.
    pub fn iterate(&mut self) -> IterationStats {
        let mut lookup_rng =
            StdRng::seed_from_u64(stream_seed(self.config.seed, self.iteration, u64::MAX));
        let lookup_start = Instant::now();
        let lookup = HemisphereLookup::build(
            self.config.sample_count,
            self.config.normal_grid,
            &mut lookup_rng,
        );
        let lookup_time = lookup_start.elapsed();

        let [a, b] = &self.buffers;
        let (read_buf, write_buf) = if self.read == 0 { (a, b) } else { (b, a) };

        let ctx = ShadeContext {
            scene: &self.scene,
            tris: &self.tris,
            lookup: &lookup,
            atlas: &self.atlas,
            prev: read_buf,
        };

        let workers = if self.config.workers > 0 {
            self.config.workers
        } else {
            rayon::current_num_threads()
        };

        let cursor = AtomicUsize::new(0);
        let store_nanos = AtomicU64::new(0);
        let texels = &self.texels;
        let atlas = &self.atlas;
        let slots_per_texel = atlas.slots_per_texel();
        let seed = self.config.seed;
        let iteration = self.iteration;
        // Estimates already averaged into the read buffer
        let folded = self.iteration as f32;

        let shade_start = Instant::now();
        rayon::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|_| {
                    let mut estimate = vec![Vec3::ZERO; slots_per_texel];
                    loop {
                        let claim = cursor.fetch_add(1, Ordering::Relaxed);
                        if claim >= texels.len() {
                            break;
                        }
                        let texel = texels[claim];
                        let mut rng = StdRng::seed_from_u64(stream_seed(
                            seed,
                            iteration,
                            claim as u64,
                        ));
                        shade_texel(
                            &ctx,
                            texel.face as usize,
                            texel.x,
                            texel.y,
                            &mut rng,
                            &mut estimate,
                        );

                        let write_start = Instant::now();
                        let base = atlas.texel_base(texel.face as usize, texel.x, texel.y);
                        for (offset, &value) in estimate.iter().enumerate() {
                            let slot = base + offset;
                            let prev = read_buf.load(slot);
                            let average = (prev * folded + value) / (folded + 1.0);
                            write_buf.store(slot, average);
                        }
                        store_nanos
                            .fetch_add(write_start.elapsed().as_nanos() as u64, Ordering::Relaxed);
                    }
                });
            }
        });
        let shade_time = shade_start.elapsed();

        // Swap: the freshly written buffer becomes the next read buffer
        self.read = 1 - self.read;
        self.iteration += 1;

        let stats = IterationStats {
            iteration: self.iteration,
            shade: shade_time,
            store: Duration::from_nanos(store_nanos.into_inner()),
        };
        log::debug!(
            "iteration {}: {} texels, lookup {:?}, shade {:?}, store {:?}",
            stats.iteration,
            texels.len(),
            lookup_time,
            stats.shade,
            stats.store
        );
        stats
    }
}
