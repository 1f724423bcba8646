// ============================================================================
// BRUSH DAB: one radial stamp of the brush at a single position
// ============================================================================

use crate::canvas::{CompositeOp, PixelRect};
use crate::components::tools::BrushProperties;

/// Opacity of a dab at normalized distance `d` (distance / brush size).
///
/// Fully opaque inside the hard core `d <= hardness / 2`, zero from `d >= 0.5`,
/// smoothstep in between. The rim is `0.5 - hardness / 2` wide.
pub fn dab_falloff(d: f32, hardness: f32) -> f32 {
    let core = hardness.clamp(0.0, 1.0) * 0.5;
    if d <= core {
        return 1.0;
    } else if d >= 0.5 {
        return 0.0;
    }
    // 1.0 at the core edge, 0.0 at the rim
    let t = ((0.5 - d) / (0.5 - core)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// A single dab of `color` centred on `center`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DabOp {
    pub center: (f32, f32),
    pub size: f32,
    pub hardness: f32,
    pub strength: f32,
    pub color: [f32; 4],
}

impl DabOp {
    pub fn new(center: (f32, f32), brush: &BrushProperties) -> Self {
        let c = brush.color;
        Self {
            center,
            size: brush.size,
            hardness: brush.hardness,
            strength: brush.strength.clamp(0.0, 1.0),
            color: [c[0] as f32, c[1] as f32, c[2] as f32, c[3] as f32],
        }
    }

    /// Brush contribution at a pixel centre.
    pub fn coverage(&self, px: f32, py: f32) -> f32 {
        if self.size <= 0.0 {
            return 0.0;
        }
        let dx = px - self.center.0;
        let dy = py - self.center.1;
        let d = (dx * dx + dy * dy).sqrt() / self.size;
        dab_falloff(d, self.hardness) * self.strength
    }
}

impl CompositeOp for DabOp {
    fn bounds(&self, width: u32, height: u32) -> Option<PixelRect> {
        if !(self.size > 0.0) || !self.center.0.is_finite() || !self.center.1.is_finite() {
            return None;
        }
        let radius = self.size * 0.5;
        let max_x = (self.center.0 + radius).ceil();
        let max_y = (self.center.1 + radius).ceil();
        if max_x <= 0.0 || max_y <= 0.0 {
            return None;
        }
        PixelRect {
            min_x: (self.center.0 - radius).floor().max(0.0) as u32,
            min_y: (self.center.1 - radius).floor().max(0.0) as u32,
            max_x: max_x as u32,
            max_y: max_y as u32,
        }
        .clamped(width, height)
    }

    fn apply(&self, x: u32, y: u32, src: [u8; 4]) -> [u8; 4] {
        let coverage = self.coverage(x as f32 + 0.5, y as f32 + 0.5);
        if coverage <= 0.0 {
            return src;
        }
        let mut out = src;
        for c in 0..4 {
            let s = src[c] as f32;
            out[c] = (s + (self.color[c] - s) * coverage).round().clamp(0.0, 255.0) as u8;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{CanvasBuffers, ChannelMask};
    use image::{Rgba, RgbaImage};

    fn brush(size: f32, hardness: f32, strength: f32) -> BrushProperties {
        BrushProperties {
            size,
            hardness,
            strength,
            color: [0, 0, 0, 255],
            ..BrushProperties::default()
        }
    }

    #[test]
    fn falloff_boundaries() {
        assert_eq!(dab_falloff(0.0, 0.0), 1.0);
        assert_eq!(dab_falloff(0.2, 0.5), 1.0);
        assert_eq!(dab_falloff(0.25, 0.5), 1.0);
        assert_eq!(dab_falloff(0.5, 0.5), 0.0);
        assert_eq!(dab_falloff(0.7, 0.0), 0.0);
        // Hard brush: a disc with no rim
        assert_eq!(dab_falloff(0.499, 1.0), 1.0);
        assert_eq!(dab_falloff(0.5, 1.0), 1.0);
        assert_eq!(dab_falloff(0.501, 1.0), 0.0);
    }

    #[test]
    fn falloff_is_monotonic_in_the_rim() {
        let mut last = 1.0;
        for i in 0..=100 {
            let d = 0.25 + 0.25 * i as f32 / 100.0;
            let v = dab_falloff(d, 0.5);
            assert!(v <= last, "falloff rose at d={d}");
            last = v;
        }
    }

    #[test]
    fn hard_dab_paints_a_disc() {
        let mut canvas = CanvasBuffers::from_image(RgbaImage::from_pixel(
            20,
            20,
            Rgba([255, 255, 255, 255]),
        ))
        .unwrap();
        canvas.apply_pass(&DabOp::new((10.0, 10.0), &brush(10.0, 1.0, 1.0)), ChannelMask::ALL);

        assert_eq!(canvas.pixel(10, 10).0, [0, 0, 0, 255]);
        assert_eq!(canvas.pixel(6, 10).0, [0, 0, 0, 255]);
        // Pixel centre (15.5, 10.5) is outside radius 5
        assert_eq!(canvas.pixel(15, 10).0, [255, 255, 255, 255]);
        assert_eq!(canvas.pixel(0, 0).0, [255, 255, 255, 255]);
    }

    #[test]
    fn strength_scales_contribution() {
        let mut canvas = CanvasBuffers::from_image(RgbaImage::from_pixel(
            4,
            4,
            Rgba([200, 200, 200, 255]),
        ))
        .unwrap();
        canvas.apply_pass(&DabOp::new((2.0, 2.0), &brush(8.0, 1.0, 0.5)), ChannelMask::RGB);
        assert_eq!(canvas.pixel(2, 2).0, [100, 100, 100, 255]);
    }

    #[test]
    fn dab_outside_canvas_touches_nothing() {
        let op = DabOp::new((-50.0, -50.0), &brush(10.0, 1.0, 1.0));
        assert_eq!(op.bounds(10, 10), None);
        let op = DabOp::new((5.0, 5.0), &brush(0.0, 1.0, 1.0));
        assert_eq!(op.bounds(10, 10), None);
    }
}
