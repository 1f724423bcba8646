//! MaskPaint: a raster painting core for editing mask-like RGBA images.
//!
//! A [`Painter`] owns the canvas and brush and applies fills, brush strokes
//! and inversions under a [`ChannelMask`]. A [`HistoryStack`] keeps full-canvas
//! snapshots for undo/redo and can be driven by a host undo system through
//! [`UndoNotifier`]. [`Session`] ties both together for one open image.

pub mod canvas;
pub mod components;
pub mod config;
pub mod io;
pub mod logger;
pub mod ops;
pub mod painter;
pub mod project;

pub use canvas::{CanvasBuffers, CanvasError, ChannelMask};
pub use components::history::{
    HistoryCursor, HistoryStack, Snapshot, SnapshotTarget, UndoNotifier, UndoRedoListener,
};
pub use components::tools::{BrushProperties, BrushSizeLimits};
pub use components::undo_bus::UndoBus;
pub use config::EditorSettings;
pub use io::{CodecError, ImageCodec, PngCodec};
pub use painter::Painter;
pub use project::{Modifiers, PointerButton, PointerEvent, Session, SessionError};
