use image::{Rgba, RgbaImage};
use rayon::prelude::*;

/// Largest pixel count a canvas may hold (~256 megapixels).
pub const MAX_CANVAS_PIXELS: u64 = 256_000_000;

// ============================================================================
// CHANNEL MASK
// ============================================================================

bitflags::bitflags! {
    /// Which RGBA channels a compositing pass is allowed to write.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
    pub struct ChannelMask: u8 {
        const RED   = 0b0001;
        const GREEN = 0b0010;
        const BLUE  = 0b0100;
        const ALPHA = 0b1000;
        const RGB   = Self::RED.bits() | Self::GREEN.bits() | Self::BLUE.bits();
        const ALL   = Self::RGB.bits() | Self::ALPHA.bits();
    }
}

impl Default for ChannelMask {
    fn default() -> Self {
        Self::ALL
    }
}

impl ChannelMask {
    /// Per-channel write flags in RGBA order.
    pub fn channels(self) -> [bool; 4] {
        [
            self.contains(Self::RED),
            self.contains(Self::GREEN),
            self.contains(Self::BLUE),
            self.contains(Self::ALPHA),
        ]
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanvasError {
    #[error("invalid canvas dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
}

/// Reject empty canvases and anything past [`MAX_CANVAS_PIXELS`].
pub fn validate_dimensions(width: u32, height: u32) -> Result<(), CanvasError> {
    let total = width as u64 * height as u64;
    if width == 0 || height == 0 || total > MAX_CANVAS_PIXELS {
        return Err(CanvasError::InvalidDimensions { width, height });
    }
    Ok(())
}

// ============================================================================
// PIXEL RECT + COMPOSITE OPERATION
// ============================================================================

/// Half-open pixel rectangle `[min, max)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl PixelRect {
    pub fn full(width: u32, height: u32) -> Self {
        Self { min_x: 0, min_y: 0, max_x: width, max_y: height }
    }

    /// Clamp to a `width`x`height` canvas. `None` when nothing is left.
    pub fn clamped(self, width: u32, height: u32) -> Option<Self> {
        let rect = Self {
            min_x: self.min_x.min(width),
            min_y: self.min_y.min(height),
            max_x: self.max_x.min(width),
            max_y: self.max_y.min(height),
        };
        if rect.min_x >= rect.max_x || rect.min_y >= rect.max_y {
            None
        } else {
            Some(rect)
        }
    }

    pub fn width(&self) -> u32 {
        self.max_x.saturating_sub(self.min_x)
    }

    pub fn height(&self) -> u32 {
        self.max_y.saturating_sub(self.min_y)
    }
}

/// A per-pixel compositing operation.
///
/// `apply` receives the pixel read from the scratch copy and returns the full
/// RGBA result; the buffer pair decides which of those channels reach the
/// target according to the active [`ChannelMask`].
pub trait CompositeOp: Sync {
    /// Region the operation can change. Pixels outside keep their value.
    fn bounds(&self, width: u32, height: u32) -> Option<PixelRect> {
        Some(PixelRect::full(width, height))
    }

    fn apply(&self, x: u32, y: u32, src: [u8; 4]) -> [u8; 4];
}

// ============================================================================
// CANVAS BUFFER PAIR
// ============================================================================

/// The live `target` image plus an equally sized `scratch` image.
///
/// Every compositing pass copies `target` into `scratch`, then reads from
/// `scratch` while writing `target`, so no pass ever reads the pixels it is
/// writing. Both buffers are always (re)allocated together.
pub struct CanvasBuffers {
    target: RgbaImage,
    scratch: RgbaImage,
}

impl CanvasBuffers {
    /// Create a fully transparent canvas.
    pub fn new(width: u32, height: u32) -> Result<Self, CanvasError> {
        validate_dimensions(width, height)?;
        Ok(Self {
            target: RgbaImage::new(width, height),
            scratch: RgbaImage::new(width, height),
        })
    }

    /// Adopt `image` as the target and allocate a matching scratch buffer.
    pub fn from_image(image: RgbaImage) -> Result<Self, CanvasError> {
        validate_dimensions(image.width(), image.height())?;
        let scratch = RgbaImage::new(image.width(), image.height());
        Ok(Self { target: image, scratch })
    }

    pub fn width(&self) -> u32 {
        self.target.width()
    }

    pub fn height(&self) -> u32 {
        self.target.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.target.dimensions()
    }

    /// The live pixels.
    pub fn target(&self) -> &RgbaImage {
        &self.target
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgba<u8> {
        *self.target.get_pixel(x, y)
    }

    /// Reallocate both buffers at a new size. Contents become transparent.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), CanvasError> {
        validate_dimensions(width, height)?;
        self.target = RgbaImage::new(width, height);
        self.scratch = RgbaImage::new(width, height);
        Ok(())
    }

    /// Resize to `image` and copy its pixels into the target.
    pub fn load(&mut self, image: &RgbaImage) -> Result<(), CanvasError> {
        let (width, height) = image.dimensions();
        if (width, height) != self.dimensions() {
            self.resize(width, height)?;
        }
        self.target.copy_from_slice(image.as_raw());
        Ok(())
    }

    /// Take the live pixels, dropping the scratch buffer.
    pub fn into_image(self) -> RgbaImage {
        self.target
    }

    /// Free both buffers. The pair is left 0x0.
    pub fn release(&mut self) {
        self.target = RgbaImage::new(0, 0);
        self.scratch = RgbaImage::new(0, 0);
    }

    /// Overwrite the target with same-sized pixels (history restore).
    ///
    /// # Panics
    /// If `pixels` does not match the canvas dimensions. That only happens when
    /// the canvas was resized without rebuilding its history.
    pub fn replace_target(&mut self, pixels: &RgbaImage) {
        assert_eq!(
            pixels.dimensions(),
            self.dimensions(),
            "snapshot dimension mismatch: snapshot is {:?}, canvas is {:?}",
            pixels.dimensions(),
            self.dimensions(),
        );
        self.target.copy_from_slice(pixels.as_raw());
    }

    /// Run `op` over the canvas: copy the rows `op` covers from target into
    /// scratch, then read scratch and write target, touching only the channels
    /// in `mask`.
    pub fn apply_pass<O: CompositeOp + ?Sized>(&mut self, op: &O, mask: ChannelMask) {
        if mask.is_empty() {
            return;
        }
        let (width, height) = self.dimensions();
        let Some(rect) = op.bounds(width, height).and_then(|r| r.clamped(width, height)) else {
            return;
        };

        // Only rows inside `rect` are read or written, so only they need a
        // fresh scratch copy.
        let stride = width as usize * 4;
        let span = rect.min_y as usize * stride..rect.max_y as usize * stride;
        let scratch: &mut [u8] = &mut self.scratch;
        let target: &mut [u8] = &mut self.target;
        scratch[span.clone()].copy_from_slice(&target[span.clone()]);

        let channels = mask.channels();
        let scratch: &[u8] = scratch;
        let rows = &mut target[span];

        rows.par_chunks_mut(stride).enumerate().for_each(|(i, row_out)| {
            let y = rect.min_y + i as u32;
            let row_in = &scratch[y as usize * stride..(y as usize + 1) * stride];
            for x in rect.min_x..rect.max_x {
                let pi = x as usize * 4;
                let src = [row_in[pi], row_in[pi + 1], row_in[pi + 2], row_in[pi + 3]];
                let out = op.apply(x, y, src);
                for c in 0..4 {
                    if channels[c] {
                        row_out[pi + c] = out[c];
                    }
                }
            }
        });
    }
}
