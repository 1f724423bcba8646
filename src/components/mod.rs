//! Editor state that sits beside the canvas: brush settings and history.

pub mod history;
pub mod tools;
pub mod undo_bus;

pub use history::{
    HistoryCursor, HistoryStack, ListenerId, SharedNotifier, Snapshot, SnapshotTarget,
    UndoNotifier, UndoRedoListener,
};
pub use tools::{BrushError, BrushProperties, BrushSizeLimits, StrokeResampler};
pub use undo_bus::UndoBus;
