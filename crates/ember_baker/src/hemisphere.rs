//! Hemisphere sample set and quantized-normal visibility masks.
//!
//! Every iteration regenerates S stratified cosine-weighted directions in a
//! canonical frame (normal = +Z), plus an N x N table mapping a quantized
//! direction to an S-bit mask of the samples in its positive hemisphere.
//! ANDing the masks of a candidate occluder's three vertex normals bounds
//! which samples that occluder could possibly block, replacing an
//! O(samples x triangles) visibility test with an O(1) bitmask combine.
//!
//! The table is a conservative approximation only: mask construction keeps a
//! cosine slack wider than any grid cell, so quantization can add candidate
//! directions but never hide one. Misclassification costs extra ray casts,
//! never correctness; survivors are always confirmed by the real
//! intersector.

use std::f32::consts::TAU;

use glam::{Vec2, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Map a unit direction to the octahedral unit square [0,1]^2.
///
/// The mapping is bijective over the whole sphere, so arbitrary candidate
/// normals (not just upper-hemisphere ones) quantize to a unique cell.
pub fn octa_encode(dir: Vec3) -> Vec2 {
    let inv_l1 = 1.0 / (dir.x.abs() + dir.y.abs() + dir.z.abs());
    let mut p = Vec2::new(dir.x * inv_l1, dir.y * inv_l1);
    if dir.z < 0.0 {
        p = Vec2::new(
            (1.0 - p.y.abs()) * p.x.signum(),
            (1.0 - p.x.abs()) * p.y.signum(),
        );
    }
    p * 0.5 + Vec2::splat(0.5)
}

/// Inverse of [`octa_encode`]: unit square back to a unit direction.
pub fn octa_decode(uv: Vec2) -> Vec3 {
    let p = uv * 2.0 - Vec2::ONE;
    let z = 1.0 - p.x.abs() - p.y.abs();
    let dir = if z >= 0.0 {
        Vec3::new(p.x, p.y, z)
    } else {
        Vec3::new(
            (1.0 - p.y.abs()) * p.x.signum(),
            (1.0 - p.x.abs()) * p.y.signum(),
            z,
        )
    };
    dir.normalize()
}

/// S stratified cosine-weighted hemisphere directions in the canonical
/// frame (+Z up). Regenerated every iteration; read-only within one.
pub struct SampleSet {
    dirs: Vec<Vec3>,
}

impl SampleSet {
    /// Draw `count` directions. Inclination and azimuth strata are jittered
    /// by two independent uniform streams split off the given rng.
    pub fn generate(count: usize, rng: &mut StdRng) -> Self {
        let mut incl_stream = StdRng::seed_from_u64(rng.gen());
        let mut azim_stream = StdRng::seed_from_u64(rng.gen());

        // Factor the count into the squarest stratum grid that divides it
        let mut rows = (count as f32).sqrt() as usize;
        while rows > 1 && count % rows != 0 {
            rows -= 1;
        }
        let cols = count / rows;

        let mut dirs = Vec::with_capacity(count);
        for row in 0..rows {
            for col in 0..cols {
                let xi1 = (row as f32 + incl_stream.gen::<f32>()) / rows as f32;
                let xi2 = (col as f32 + azim_stream.gen::<f32>()) / cols as f32;

                // Cosine-weighted: cos(theta) = sqrt(1 - xi1)
                let cos_theta = (1.0 - xi1).sqrt();
                let sin_theta = xi1.sqrt();
                let phi = TAU * xi2;
                dirs.push(Vec3::new(
                    sin_theta * phi.cos(),
                    sin_theta * phi.sin(),
                    cos_theta,
                ));
            }
        }

        Self { dirs }
    }

    /// Number of directions.
    #[inline]
    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    /// True if the set is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    /// All directions.
    #[inline]
    pub fn dirs(&self) -> &[Vec3] {
        &self.dirs
    }

    /// One direction.
    #[inline]
    pub fn dir(&self, index: usize) -> Vec3 {
        self.dirs[index]
    }
}

/// N x N grid over the octahedral square; each cell stores an S-bit mask of
/// the sample directions within (cosine slack included) its representative
/// direction's positive hemisphere.
pub struct NormalMaskTable {
    grid: usize,
    words: usize,
    bits: Vec<u64>,
}

impl NormalMaskTable {
    /// Precompute all cell masks for one sample set.
    pub fn build(samples: &SampleSet, grid: usize) -> Self {
        let words = samples.len().div_ceil(64);
        let mut bits = vec![0u64; grid * grid * words];

        // Wider than the angular radius of any cell, so a direction near a
        // cell border can never be pruned out of its true hemisphere.
        let slack = 5.0 / grid as f32;

        for cy in 0..grid {
            for cx in 0..grid {
                let uv = Vec2::new(
                    (cx as f32 + 0.5) / grid as f32,
                    (cy as f32 + 0.5) / grid as f32,
                );
                let rep = octa_decode(uv);
                let cell = &mut bits[(cy * grid + cx) * words..][..words];
                for (i, dir) in samples.dirs().iter().enumerate() {
                    if rep.dot(*dir) >= -slack {
                        cell[i / 64] |= 1u64 << (i % 64);
                    }
                }
            }
        }

        Self { grid, words, bits }
    }

    /// u64 words per mask.
    #[inline]
    pub fn words(&self) -> usize {
        self.words
    }

    /// Fetch the mask for an arbitrary direction in O(1).
    #[inline]
    pub fn mask(&self, dir: Vec3) -> &[u64] {
        let uv = octa_encode(dir);
        let cx = ((uv.x * self.grid as f32) as usize).min(self.grid - 1);
        let cy = ((uv.y * self.grid as f32) as usize).min(self.grid - 1);
        &self.bits[(cy * self.grid + cx) * self.words..][..self.words]
    }
}

/// One iteration's immutable sampling snapshot: direction set + mask table.
pub struct HemisphereLookup {
    pub samples: SampleSet,
    pub table: NormalMaskTable,
}

impl HemisphereLookup {
    /// Build the snapshot for one iteration.
    pub fn build(sample_count: usize, grid: usize, rng: &mut StdRng) -> Self {
        let samples = SampleSet::generate(sample_count, rng);
        let table = NormalMaskTable::build(&samples, grid);
        Self { samples, table }
    }
}

/// acc |= a & b & c, word by word.
#[inline]
pub fn and3_or_into(acc: &mut [u64], a: &[u64], b: &[u64], c: &[u64]) {
    for w in 0..acc.len() {
        acc[w] |= a[w] & b[w] & c[w];
    }
}

/// Invoke `f` with the index of every set bit.
#[inline]
pub fn for_each_set_bit(words: &[u64], mut f: impl FnMut(usize)) {
    for (w, &word) in words.iter().enumerate() {
        let mut bits = word;
        while bits != 0 {
            let bit = bits.trailing_zeros() as usize;
            f(w * 64 + bit);
            bits &= bits - 1;
        }
    }
}
