//! Per-pixel compositing operations run through [`crate::canvas::CanvasBuffers::apply_pass`].

pub mod adjustments;
pub mod dab;

pub use adjustments::{FillOp, InvertOp};
pub use dab::{DabOp, dab_falloff};
