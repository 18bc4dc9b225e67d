//! Lane-width-aligned structure-of-arrays storage.
//!
//! The intersector walks triangle data in fixed-width batches so the
//! per-batch arithmetic compiles down to vector instructions. [`LaneBuffer`]
//! owns one float attribute (one axis of a vertex, one axis of an edge) laid
//! out as a sequence of aligned [`Lane`] blocks, padded at the tail with a
//! caller-chosen fill value.

use bytemuck::{Pod, Zeroable};

/// Number of scalar floats processed together in one vectorized batch.
pub const LANES: usize = 8;

/// One aligned batch of [`LANES`] floats.
#[repr(C, align(32))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lane(pub [f32; LANES]);

// SAFETY: 8 f32s fill the 32-byte aligned size exactly, so there is no
// padding and any bit pattern is valid.
unsafe impl Zeroable for Lane {}
unsafe impl Pod for Lane {}

impl Lane {
    /// A lane filled with a single value.
    #[inline]
    pub fn splat(value: f32) -> Self {
        Lane([value; LANES])
    }
}

/// An owned float attribute stored as aligned lanes.
///
/// `len` is the logical element count; the backing storage is always a whole
/// number of lanes. Elements past `len` hold the padding value supplied at
/// construction and must be chosen so padded entries are inert (zero edge
/// vectors for triangle data).
#[derive(Debug, Clone, Default)]
pub struct LaneBuffer {
    lanes: Vec<Lane>,
    len: usize,
}

impl LaneBuffer {
    /// Build a buffer from a slice, padding the final lane with `fill`.
    pub fn from_slice(values: &[f32], fill: f32) -> Self {
        let lane_count = values.len().div_ceil(LANES);
        let mut lanes = vec![Lane::splat(fill); lane_count];
        for (i, &v) in values.iter().enumerate() {
            lanes[i / LANES].0[i % LANES] = v;
        }
        Self {
            lanes,
            len: values.len(),
        }
    }

    /// Logical element count (excluding padding).
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if no elements are stored.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of whole lanes, padding included.
    #[inline]
    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    /// All lanes, padding included.
    #[inline]
    pub fn lanes(&self) -> &[Lane] {
        &self.lanes
    }

    /// Fetch one lane by batch index.
    #[inline]
    pub fn lane(&self, batch: usize) -> &[f32; LANES] {
        &self.lanes[batch].0
    }

    /// Fetch a single logical element. Bounds are checked in debug builds;
    /// reads from the padding region are a caller bug.
    #[inline]
    pub fn get(&self, index: usize) -> f32 {
        debug_assert!(index < self.len, "LaneBuffer read past logical length");
        self.lanes[index / LANES].0[index % LANES]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_slice_pads_tail() {
        let buf = LaneBuffer::from_slice(&[1.0, 2.0, 3.0], 0.0);
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.lane_count(), 1);

        let lane = buf.lane(0);
        assert_eq!(lane[0], 1.0);
        assert_eq!(lane[2], 3.0);
        assert_eq!(lane[3], 0.0);
        assert_eq!(lane[LANES - 1], 0.0);
    }

    #[test]
    fn test_exact_multiple_has_no_extra_lane() {
        let values: Vec<f32> = (0..LANES * 2).map(|i| i as f32).collect();
        let buf = LaneBuffer::from_slice(&values, -1.0);
        assert_eq!(buf.lane_count(), 2);
        assert_eq!(buf.get(LANES), LANES as f32);
    }

    #[test]
    fn test_lane_alignment() {
        let buf = LaneBuffer::from_slice(&[0.0; 20], 0.0);
        let addr = buf.lanes().as_ptr() as usize;
        assert_eq!(addr % 32, 0);
    }

    #[test]
    fn test_custom_fill() {
        let buf = LaneBuffer::from_slice(&[5.0], f32::INFINITY);
        assert_eq!(buf.lane(0)[1], f32::INFINITY);
        assert_eq!(buf.get(0), 5.0);
    }
}
