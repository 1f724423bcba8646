// ============================================================================
// ADJUSTMENT OPERATIONS: whole-canvas pixel adjustments (mask aware)
// ============================================================================
//
// These ops ignore neighbouring pixels; the channel mask is applied by the
// buffer pair, so a masked-off channel is never written.
// ============================================================================

use image::Rgba;

use crate::canvas::CompositeOp;

/// Set every covered channel to `color`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FillOp {
    pub color: Rgba<u8>,
}

impl FillOp {
    pub fn new(color: Rgba<u8>) -> Self {
        Self { color }
    }
}

impl CompositeOp for FillOp {
    fn apply(&self, _x: u32, _y: u32, _src: [u8; 4]) -> [u8; 4] {
        self.color.0
    }
}

/// Replace every covered channel `v` with `1 - v` (`255 - v` in 8-bit terms).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InvertOp;

impl CompositeOp for InvertOp {
    fn apply(&self, _x: u32, _y: u32, [r, g, b, a]: [u8; 4]) -> [u8; 4] {
        [255 - r, 255 - g, 255 - b, 255 - a]
    }
}
