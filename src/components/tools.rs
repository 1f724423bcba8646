use image::Rgba;
use serde::{Deserialize, Serialize};

/// Smallest dab spacing (in pixels) a continued stroke will resample at.
/// Anything finer is treated as a degenerate brush.
pub const MIN_STEP: f32 = 0.01;

/// Most dabs a single [`StrokeResampler::advance`] call returns. A longer
/// move keeps its trailing dabs and skips the rest of the path.
pub const MAX_STROKE_DABS: usize = 1 << 16;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum BrushError {
    #[error("degenerate brush (size {size}, density {density})")]
    Degenerate { size: f32, density: f32 },
}

// ============================================================================
// BRUSH PROPERTIES
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrushProperties {
    /// Dab diameter in canvas pixels.
    pub size: f32,
    /// 0.0..=1.0, fraction of the diameter painted at full opacity.
    pub hardness: f32,
    /// 0.0..=1.0, scales the opacity of every dab.
    pub strength: f32,
    /// Dabs per brush diameter along a stroke. Step = size / density.
    pub density: f32,
    /// Straight (non-premultiplied) RGBA.
    pub color: [u8; 4],
}

impl Default for BrushProperties {
    fn default() -> Self {
        Self {
            size: 100.0,
            hardness: 1.0,
            strength: 1.0,
            density: 10.0,
            color: [0, 0, 0, 255],
        }
    }
}

impl BrushProperties {
    pub fn color(&self) -> Rgba<u8> {
        Rgba(self.color)
    }

    pub fn set_color(&mut self, color: Rgba<u8>) {
        self.color = color.0;
    }

    /// Distance between consecutive dabs of a continued stroke.
    pub fn step(&self) -> f32 {
        self.size / self.density
    }

    /// Check the brush can be resampled along a stroke.
    pub fn validate(&self) -> Result<(), BrushError> {
        let step = self.step();
        let positive = |v: f32| v.is_finite() && v > 0.0;
        if !positive(self.size) || !positive(self.density) || !(step.is_finite() && step >= MIN_STEP) {
            return Err(BrushError::Degenerate {
                size: self.size,
                density: self.density,
            });
        }
        Ok(())
    }

    /// Can a single dab of this brush cover anything at all?
    pub fn can_dab(&self) -> bool {
        self.size.is_finite() && self.size > 0.0
    }
}

/// Range and wheel sensitivity for interactive brush resizing.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BrushSizeLimits {
    pub min: f32,
    pub max: f32,
    /// Fraction of the size gained or lost per unit of wheel delta.
    pub factor: f32,
}

impl Default for BrushSizeLimits {
    fn default() -> Self {
        Self {
            min: 10.0,
            max: 1000.0,
            factor: 0.1,
        }
    }
}

impl BrushSizeLimits {
    pub fn clamp(&self, size: f32) -> f32 {
        size.clamp(self.min, self.max)
    }

    /// Size after a wheel movement of `delta` (positive shrinks, negative grows).
    pub fn scaled(&self, size: f32, delta: f32) -> f32 {
        self.clamp(size * (1.0 - delta * self.factor))
    }
}

// ============================================================================
// STROKE RESAMPLER
// ============================================================================

/// Turns pointer samples into evenly spaced dab positions.
///
/// Holds the last committed dab centre (the stroke cursor). Movement shorter
/// than one step is not consumed: the next call measures from the same cursor,
/// so sub-step movements add up across calls.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StrokeResampler {
    cursor: Option<(f32, f32)>,
}

impl StrokeResampler {
    pub fn cursor(&self) -> Option<(f32, f32)> {
        self.cursor
    }

    /// Start a new stroke at `position`. The caller dabs once there.
    pub fn begin(&mut self, position: (f32, f32)) {
        self.cursor = Some(position);
    }

    pub fn reset(&mut self) {
        self.cursor = None;
    }

    /// Continue the stroke toward `position`, returning the dab centres in
    /// path order. `step` must already be validated; a non-positive or
    /// non-finite step yields no dabs and leaves the cursor in place.
    ///
    /// Without a prior [`begin`](Self::begin) the call starts a stroke and
    /// returns `position` as its single dab.
    pub fn advance(&mut self, position: (f32, f32), step: f32) -> Vec<(f32, f32)> {
        let Some((cx, cy)) = self.cursor else {
            self.begin(position);
            return vec![position];
        };
        if !(step.is_finite() && step >= MIN_STEP) {
            return Vec::new();
        }

        let dx = position.0 - cx;
        let dy = position.1 - cy;
        let distance = (dx * dx + dy * dy).sqrt();
        if !distance.is_finite() {
            return Vec::new();
        }
        let steps = (distance / step).floor() as f64;
        if steps < 1.0 {
            return Vec::new();
        }

        // Dab k sits k steps along the path. Past MAX_STROKE_DABS only the
        // trailing dabs are kept; the cursor still lands on the last step.
        let (ux, uy) = (dx as f64 / distance as f64, dy as f64 / distance as f64);
        let (ox, oy) = (cx as f64, cy as f64);
        let step = step as f64;
        let kept = steps.min(MAX_STROKE_DABS as f64) as usize;
        if (kept as f64) < steps {
            log::debug!("stroke: {steps} steps in one move, keeping the last {kept}");
        }
        let first = steps - kept as f64 + 1.0;
        let dabs: Vec<(f32, f32)> = (0..kept)
            .map(|i| {
                let k = first + i as f64;
                ((ox + ux * step * k) as f32, (oy + uy * step * k) as f32)
            })
            .collect();
        self.cursor = dabs.last().copied();
        dabs
    }
}
