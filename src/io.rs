use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, ImageError, ImageFormat, Rgba, RgbaImage};
use std::fs;
use std::io::Cursor;
use std::path::Path;

use crate::canvas::{CanvasError, validate_dimensions};
use crate::painter::Painter;

#[derive(thiserror::Error, Debug)]
pub enum CodecError {
    #[error("image codec error: {0}")]
    Image(#[from] ImageError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid image dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("pixel buffer holds {actual} bytes, expected {expected} for {width}x{height} RGBA")]
    BufferSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

impl From<CanvasError> for CodecError {
    fn from(e: CanvasError) -> Self {
        match e {
            CanvasError::InvalidDimensions { width, height } => {
                CodecError::InvalidDimensions { width, height }
            }
        }
    }
}

/// An external image file format. The canvas never encodes or decodes
/// anything itself; it hands RGBA8 pixels to one of these.
pub trait ImageCodec {
    fn decode(&self, bytes: &[u8]) -> Result<RgbaImage, CodecError>;

    fn encode(&self, image: &RgbaImage) -> Result<Vec<u8>, CodecError>;
}

/// Lossless 8-bit RGBA PNG.
#[derive(Clone, Copy, Debug, Default)]
pub struct PngCodec;

impl ImageCodec for PngCodec {
    fn decode(&self, bytes: &[u8]) -> Result<RgbaImage, CodecError> {
        let image = image::load_from_memory_with_format(bytes, ImageFormat::Png)?;
        Ok(image.to_rgba8())
    }

    fn encode(&self, image: &RgbaImage) -> Result<Vec<u8>, CodecError> {
        let mut bytes = Vec::new();
        PngEncoder::new(Cursor::new(&mut bytes)).write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ColorType::Rgba8,
        )?;
        Ok(bytes)
    }
}

/// Decode `bytes` into `(width, height, rgba8 pixels)`.
pub fn load_initial_pixels(
    codec: &dyn ImageCodec,
    bytes: &[u8],
) -> Result<(u32, u32, Vec<u8>), CodecError> {
    let image = codec.decode(bytes)?;
    let (width, height) = image.dimensions();
    validate_dimensions(width, height)?;
    Ok((width, height, image.into_raw()))
}

/// Encode a tightly packed RGBA8 buffer.
pub fn export_pixels(
    codec: &dyn ImageCodec,
    width: u32,
    height: u32,
    pixels: &[u8],
) -> Result<Vec<u8>, CodecError> {
    validate_dimensions(width, height)?;
    let expected = width as usize * height as usize * 4;
    if pixels.len() != expected {
        return Err(CodecError::BufferSize {
            width,
            height,
            expected,
            actual: pixels.len(),
        });
    }
    // Length checked above, so the buffer always fits.
    let image = RgbaImage::from_raw(width, height, pixels.to_vec()).ok_or(
        CodecError::BufferSize {
            width,
            height,
            expected,
            actual: pixels.len(),
        },
    )?;
    codec.encode(&image)
}

/// Read and decode an image file.
pub fn load_image_file(codec: &dyn ImageCodec, path: &Path) -> Result<RgbaImage, CodecError> {
    let bytes = fs::read(path)?;
    let image = codec.decode(&bytes)?;
    validate_dimensions(image.width(), image.height())?;
    log::info!(
        "loaded {}x{} image from {}",
        image.width(),
        image.height(),
        path.display()
    );
    Ok(image)
}

/// Write a new `width`x`height` image filled with `color` to `path`.
pub fn create_blank_image(
    path: &Path,
    width: u32,
    height: u32,
    color: Rgba<u8>,
    codec: &dyn ImageCodec,
) -> Result<(), CodecError> {
    let painter = Painter::new_blank(width, height, color)?;
    let bytes = painter.save(codec)?;
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, bytes)?;
    log::info!("created blank {width}x{height} image at {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn png_round_trip_is_lossless() {
        let image = RgbaImage::from_fn(5, 3, |x, y| Rgba([x as u8 * 50, y as u8 * 80, 7, 128 + x as u8]));
        let bytes = PngCodec.encode(&image).unwrap();
        let (w, h, pixels) = load_initial_pixels(&PngCodec, &bytes).unwrap();
        assert_eq!((w, h), (5, 3));
        assert_eq!(pixels, image.into_raw());
    }

    #[test]
    fn export_rejects_short_buffer() {
        let err = export_pixels(&PngCodec, 2, 2, &[0; 15]).unwrap_err();
        assert!(matches!(err, CodecError::BufferSize { expected: 16, actual: 15, .. }));
    }

    #[test]
    fn export_rejects_zero_size() {
        let err = export_pixels(&PngCodec, 0, 4, &[]).unwrap_err();
        assert!(matches!(err, CodecError::InvalidDimensions { width: 0, height: 4 }));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        assert!(matches!(
            PngCodec.decode(b"not a png"),
            Err(CodecError::Image(_))
        ));
    }

    #[test]
    fn blank_image_is_written_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("masks").join("blank.png");
        create_blank_image(&path, 8, 4, Rgba([10, 20, 30, 255]), &PngCodec).unwrap();

        let image = load_image_file(&PngCodec, &path).unwrap();
        assert_eq!(image.dimensions(), (8, 4));
        assert!(image.pixels().all(|p| p.0 == [10, 20, 30, 255]));
    }
}
