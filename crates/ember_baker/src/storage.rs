//! Accumulator storage behind a minimal indexable-array interface.
//!
//! The scheduler owns two buffers (read and write) and swaps them between
//! iterations. Where those floats actually live (heap, memory-mapped file,
//! a texture upload staging area) is the storage backend's business; the
//! solver only ever loads and stores float triplets by flat slot index.

use std::cell::UnsafeCell;

use glam::Vec3;

/// A flat array of float triplets, one per lightmap sample slot.
///
/// `store` takes `&self` so a worker pool can write during the shading pass.
/// Contract: within one iteration, every slot has exactly one writer (the
/// scheduler's atomic cursor hands each texel to exactly one worker), and no
/// reads target a buffer being written. Out-of-range slots are an invariant
/// violation and must panic, not wrap or extend.
pub trait RadianceStorage: Send + Sync {
    /// Number of triplet slots.
    fn len(&self) -> usize;

    /// True if the buffer has no slots.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read one slot.
    fn load(&self, slot: usize) -> Vec3;

    /// Write one slot. See the trait docs for the aliasing contract.
    fn store(&self, slot: usize, value: Vec3);
}

/// Default heap-backed storage.
pub struct MemoryStorage {
    cells: Vec<UnsafeCell<[f32; 3]>>,
}

// SAFETY: concurrent access is governed by the RadianceStorage contract.
// During a shading pass each slot of the write buffer is stored by exactly
// one worker (disjoint slots, no locks needed), while all concurrent loads
// target the other buffer. Outside the pass the owner has exclusive access.
unsafe impl Sync for MemoryStorage {}

impl MemoryStorage {
    /// Allocate `len` zeroed slots.
    pub fn new(len: usize) -> Self {
        let mut cells = Vec::with_capacity(len);
        cells.resize_with(len, || UnsafeCell::new([0.0; 3]));
        Self { cells }
    }
}

impl RadianceStorage for MemoryStorage {
    #[inline]
    fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    fn load(&self, slot: usize) -> Vec3 {
        // SAFETY: no writer targets this slot concurrently (trait contract);
        // the index panics on out-of-range before the raw read.
        let rgb = unsafe { *self.cells[slot].get() };
        Vec3::from_array(rgb)
    }

    #[inline]
    fn store(&self, slot: usize, value: Vec3) {
        // SAFETY: this slot's unique writer (trait contract).
        unsafe {
            *self.cells[slot].get() = value.to_array();
        }
    }
}
