use image::{Rgba, RgbaImage};

use crate::canvas::{CanvasBuffers, CanvasError, ChannelMask};
use crate::components::history::SnapshotTarget;
use crate::components::tools::{BrushProperties, StrokeResampler};
use crate::config::EditorSettings;
use crate::io::{CodecError, ImageCodec, export_pixels};
use crate::ops::{DabOp, FillOp, InvertOp};

/// Owns the canvas and the brush state; every edit goes through here.
///
/// Mutating calls never record history. The caller decides the undo
/// granularity and records once per finished gesture.
pub struct Painter {
    canvas: CanvasBuffers,
    brush: BrushProperties,
    channel_mask: ChannelMask,
    stroke: StrokeResampler,
    disposed: bool,
}

impl Painter {
    /// Edit an existing image.
    pub fn new_from_image(image: RgbaImage) -> Result<Self, CanvasError> {
        Ok(Self::with_canvas(CanvasBuffers::from_image(image)?))
    }

    /// A `width`x`height` canvas filled with `color`.
    pub fn new_blank(width: u32, height: u32, color: Rgba<u8>) -> Result<Self, CanvasError> {
        let mut painter = Self::with_canvas(CanvasBuffers::new(width, height)?);
        painter.canvas.apply_pass(&FillOp::new(color), ChannelMask::ALL);
        Ok(painter)
    }

    /// A blank canvas using the configured size, color, brush and mask.
    pub fn from_settings(settings: &EditorSettings) -> Result<Self, CanvasError> {
        let mut painter = Self::new_blank(
            settings.canvas_width,
            settings.canvas_height,
            Rgba(settings.canvas_color),
        )?;
        painter.brush = settings.brush.clone();
        painter.channel_mask = settings.channel_mask;
        Ok(painter)
    }

    fn with_canvas(canvas: CanvasBuffers) -> Self {
        Self {
            canvas,
            brush: BrushProperties::default(),
            channel_mask: ChannelMask::default(),
            stroke: StrokeResampler::default(),
            disposed: false,
        }
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn width(&self) -> u32 {
        self.canvas.width()
    }

    pub fn height(&self) -> u32 {
        self.canvas.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        self.canvas.target()
    }

    pub fn brush(&self) -> &BrushProperties {
        &self.brush
    }

    pub fn brush_mut(&mut self) -> &mut BrushProperties {
        &mut self.brush
    }

    pub fn set_brush(&mut self, brush: BrushProperties) {
        self.brush = brush;
    }

    pub fn channel_mask(&self) -> ChannelMask {
        self.channel_mask
    }

    pub fn set_channel_mask(&mut self, mask: ChannelMask) {
        self.channel_mask = mask;
    }

    /// Last committed dab centre of the current stroke.
    pub fn stroke_cursor(&self) -> Option<(f32, f32)> {
        self.stroke.cursor()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    // ========================================================================
    // OPERATIONS
    // ========================================================================

    /// Replace the canvas with `image`, resizing if needed. Any history built
    /// for the old size must be rebuilt by the caller.
    pub fn load(&mut self, image: &RgbaImage) -> Result<(), CanvasError> {
        self.assert_alive();
        self.canvas.load(image)?;
        self.stroke.reset();
        Ok(())
    }

    /// Encode the current pixels.
    pub fn save(&self, codec: &dyn ImageCodec) -> Result<Vec<u8>, CodecError> {
        self.assert_alive();
        let (width, height) = self.canvas.dimensions();
        export_pixels(codec, width, height, self.canvas.target().as_raw())
    }

    /// Set every masked channel of every pixel to `color`.
    pub fn fill(&mut self, color: Rgba<u8>) {
        self.assert_alive();
        self.canvas.apply_pass(&FillOp::new(color), self.channel_mask);
    }

    /// Invert every masked channel.
    pub fn invert(&mut self) {
        self.assert_alive();
        self.canvas.apply_pass(&InvertOp, self.channel_mask);
    }

    /// Paint at `position`.
    ///
    /// A new stroke (`is_continuation == false`) puts one dab at `position`.
    /// A continuation dabs every `size / density` pixels from the stroke
    /// cursor toward `position`; leftover distance shorter than a step is
    /// kept for the next call. Returns the number of dabs applied.
    pub fn paint(&mut self, position: (f32, f32), is_continuation: bool) -> usize {
        self.assert_alive();
        let dabs = if is_continuation {
            if let Err(e) = self.brush.validate() {
                log::debug!("paint: {e}, skipping");
                return 0;
            }
            self.stroke.advance(position, self.brush.step())
        } else {
            self.stroke.begin(position);
            if !self.brush.can_dab() {
                log::debug!("paint: brush size {} paints nothing", self.brush.size);
                return 0;
            }
            vec![position]
        };

        for &center in &dabs {
            self.canvas.apply_pass(&DabOp::new(center, &self.brush), self.channel_mask);
        }
        log::trace!("paint: {} dab(s) toward {:?}", dabs.len(), position);
        dabs.len()
    }

    /// A display copy of the canvas. RGB channels outside the mask read as
    /// zero and, given a cursor, a solid brush-sized disc is drawn over it.
    pub fn draw(&self, brush_cursor: Option<(f32, f32)>) -> RgbaImage {
        self.assert_alive();
        let mut preview = CanvasBuffers::from_image(self.canvas.target().clone())
            .unwrap_or_else(|_| unreachable!("live canvas dimensions are always valid"));
        preview.apply_pass(
            &FillOp::new(Rgba([0, 0, 0, 0])),
            ChannelMask::RGB - self.channel_mask,
        );
        if let Some(center) = brush_cursor {
            let outline = BrushProperties {
                hardness: 1.0,
                strength: 1.0,
                ..self.brush.clone()
            };
            preview.apply_pass(&DabOp::new(center, &outline), ChannelMask::ALL);
        }
        preview.into_image()
    }

    /// Free the canvas. Any later operation panics.
    pub fn dispose(&mut self) {
        self.canvas.release();
        self.stroke.reset();
        self.disposed = true;
    }

    fn assert_alive(&self) {
        assert!(!self.disposed, "painter used after dispose");
    }
}

impl SnapshotTarget for Painter {
    fn snapshot_pixels(&self) -> &RgbaImage {
        self.assert_alive();
        self.canvas.target()
    }

    fn restore(&mut self, pixels: &RgbaImage) {
        self.assert_alive();
        self.canvas.replace_target(pixels);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::PngCodec;

    fn white(width: u32, height: u32) -> Painter {
        Painter::new_blank(width, height, Rgba([255, 255, 255, 255])).unwrap()
    }

    #[test]
    fn blank_canvas_is_filled() {
        let painter = white(3, 2);
        assert_eq!((painter.width(), painter.height()), (3, 2));
        assert!(painter.pixels().pixels().all(|p| p.0 == [255; 4]));
    }

    #[test]
    fn zero_sized_canvas_is_rejected() {
        assert!(matches!(
            Painter::new_blank(0, 10, Rgba([0; 4])),
            Err(CanvasError::InvalidDimensions { width: 0, height: 10 })
        ));
    }

    #[test]
    fn fill_respects_channel_mask() {
        let mut painter = white(2, 2);
        painter.set_channel_mask(ChannelMask::RED | ChannelMask::ALPHA);
        painter.fill(Rgba([0, 0, 0, 0]));
        assert!(painter.pixels().pixels().all(|p| p.0 == [0, 255, 255, 0]));
    }

    #[test]
    fn new_stroke_paints_one_dab() {
        let mut painter = white(32, 32);
        painter.brush_mut().size = 8.0;
        assert_eq!(painter.paint((16.0, 16.0), false), 1);
        assert_eq!(painter.stroke_cursor(), Some((16.0, 16.0)));
        assert_eq!(painter.pixels().get_pixel(16, 16).0, [0, 0, 0, 255]);
    }

    #[test]
    fn continuation_spaces_dabs_by_step() {
        let mut painter = white(128, 8);
        painter.set_brush(BrushProperties { size: 20.0, density: 10.0, ..Default::default() });
        painter.paint((0.0, 4.0), false);
        assert_eq!(painter.paint((100.0, 4.0), true), 50);
        assert_eq!(painter.stroke_cursor(), Some((100.0, 4.0)));
    }

    #[test]
    fn degenerate_brush_paints_nothing() {
        let mut painter = white(16, 16);
        painter.brush_mut().density = 0.0;
        painter.paint((0.0, 0.0), false);
        let before = painter.pixels().clone();
        assert_eq!(painter.paint((10.0, 10.0), true), 0);
        painter.brush_mut().density = 10.0;
        painter.brush_mut().size = 0.0;
        assert_eq!(painter.paint((8.0, 8.0), false), 0);
        // the first dab is the only change
        assert_eq!(painter.pixels(), &before);
    }

    #[test]
    fn draw_zeroes_masked_rgb_and_overlays_cursor() {
        let mut painter = white(20, 20);
        painter.set_channel_mask(ChannelMask::GREEN | ChannelMask::ALPHA);
        painter.set_brush(BrushProperties {
            size: 6.0,
            hardness: 0.0,
            strength: 0.1,
            color: [200, 100, 50, 255],
            ..Default::default()
        });
        let preview = painter.draw(Some((10.0, 10.0)));
        assert_eq!(preview.get_pixel(0, 0).0, [0, 255, 0, 255]);
        assert_eq!(preview.get_pixel(10, 10).0, [200, 100, 50, 255]);
        assert!(painter.pixels().pixels().all(|p| p.0 == [255; 4]));
    }

    #[test]
    fn save_encodes_current_pixels() {
        let mut painter = white(4, 4);
        painter.invert();
        let bytes = painter.save(&PngCodec).unwrap();
        let decoded = PngCodec.decode(&bytes).unwrap();
        assert_eq!(&decoded, painter.pixels());
    }

    #[test]
    fn load_resizes_and_resets_stroke() {
        let mut painter = white(4, 4);
        painter.paint((1.0, 1.0), false);
        painter.load(&RgbaImage::new(7, 3)).unwrap();
        assert_eq!((painter.width(), painter.height()), (7, 3));
        assert_eq!(painter.stroke_cursor(), None);
    }

    #[test]
    #[should_panic(expected = "painter used after dispose")]
    fn use_after_dispose_panics() {
        let mut painter = white(4, 4);
        painter.dispose();
        painter.invert();
    }
}
