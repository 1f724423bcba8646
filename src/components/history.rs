use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::sync::Arc;

use image::RgbaImage;
use uuid::Uuid;

// ============================================================================
// SNAPSHOT: immutable full-canvas copy
// ============================================================================

/// An immutable copy of the canvas at one point in time.
///
/// Clones share the same pixels. Two snapshots are equal only when they are
/// the same capture (same [`id`](Self::id)), never because their pixels match.
#[derive(Clone)]
pub struct Snapshot {
    id: Uuid,
    pixels: Arc<RgbaImage>,
}

impl Snapshot {
    pub fn capture(pixels: &RgbaImage) -> Self {
        Self {
            id: Uuid::new_v4(),
            pixels: Arc::new(pixels.clone()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn memory_bytes(&self) -> usize {
        self.pixels.as_raw().len()
    }
}

impl PartialEq for Snapshot {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Snapshot {}

impl std::fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshot")
            .field("id", &self.id)
            .field("dimensions", &self.dimensions())
            .finish()
    }
}

/// Something history can capture from and restore into.
pub trait SnapshotTarget {
    fn snapshot_pixels(&self) -> &RgbaImage;

    /// Overwrite the live pixels with a same-sized snapshot.
    fn restore(&mut self, pixels: &RgbaImage);
}

impl SnapshotTarget for crate::canvas::CanvasBuffers {
    fn snapshot_pixels(&self) -> &RgbaImage {
        self.target()
    }

    fn restore(&mut self, pixels: &RgbaImage) {
        self.replace_target(pixels);
    }
}

// ============================================================================
// HOST UNDO INTEGRATION
// ============================================================================

/// The history position, shared with an external undo host so the host can
/// move it back and forth on its own undo/redo.
#[derive(Clone, Debug, Default)]
pub struct HistoryCursor(Rc<Cell<usize>>);

impl HistoryCursor {
    pub fn get(&self) -> usize {
        self.0.get()
    }

    pub fn set(&self, value: usize) {
        self.0.set(value);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Receives notifications that the host performed an undo or redo.
pub trait UndoRedoListener {
    fn on_external_undo_redo(&mut self);
}

/// A host-level undo system (e.g. an editor-wide Ctrl+Z) that history plugs into.
pub trait UndoNotifier {
    /// Called right before history moves `cursor`, so the host can put the
    /// current value back on its own undo.
    fn record_cursor(&mut self, cursor: &HistoryCursor, label: &str);

    fn subscribe(&mut self, listener: Weak<RefCell<dyn UndoRedoListener>>) -> ListenerId;

    fn unsubscribe(&mut self, id: ListenerId);
}

pub type SharedNotifier = Rc<RefCell<dyn UndoNotifier>>;

// ============================================================================
// HISTORY STACK
// ============================================================================

/// Linear undo/redo history of full-canvas snapshots.
///
/// The cursor counts live entries: `peek()` is `snapshots[cursor - 1]`, and
/// everything from `cursor` on is the redo branch, dropped by the next
/// [`record`](Self::record).
pub struct HistoryStack {
    snapshots: Vec<Snapshot>,
    cursor: HistoryCursor,
    host: Option<SharedNotifier>,
    disposed: bool,
}

impl HistoryStack {
    /// Seed the history with one snapshot of `target` (cursor = 1).
    pub fn new(target: &impl SnapshotTarget) -> Self {
        let mut history = Self {
            snapshots: Vec::new(),
            cursor: HistoryCursor::default(),
            host: None,
            disposed: false,
        };
        history.record(target);
        history
    }

    /// Drop the redo branch and push a snapshot of `target`.
    ///
    /// # Panics
    /// After [`dispose`](Self::dispose), or when `target` no longer has the
    /// dimensions of the current snapshot.
    pub fn record(&mut self, target: &impl SnapshotTarget) {
        self.assert_alive();
        let pixels = target.snapshot_pixels();
        if let Some(current) = self.snapshots.get(self.cursor.get().wrapping_sub(1)) {
            assert_eq!(
                pixels.dimensions(),
                current.dimensions(),
                "snapshot dimension mismatch: canvas is {:?}, history holds {:?}",
                pixels.dimensions(),
                current.dimensions(),
            );
        }

        let cursor = self.cursor.get();
        let discarded = self.snapshots.len().saturating_sub(cursor);
        self.snapshots.truncate(cursor);
        if discarded > 0 {
            log::trace!("history: discarded {discarded} redo snapshot(s)");
        }

        self.snapshots.push(Snapshot::capture(pixels));
        if cursor > 0 {
            self.report_cursor("Modify Texture");
        }
        self.cursor.set(cursor + 1);
        log::trace!("history: recorded snapshot {}/{}", self.cursor.get(), self.snapshots.len());
    }

    /// Step back one snapshot and restore it. `false` at the oldest entry.
    pub fn undo(&mut self, target: &mut impl SnapshotTarget) -> bool {
        self.assert_alive();
        if !self.can_undo() {
            log::debug!("history: nothing to undo");
            return false;
        }
        self.report_cursor("Undo Texture");
        self.cursor.set(self.cursor.get() - 1);
        self.apply(target);
        true
    }

    /// Step forward one snapshot and restore it. `false` at the newest entry.
    pub fn redo(&mut self, target: &mut impl SnapshotTarget) -> bool {
        self.assert_alive();
        if !self.can_redo() {
            log::debug!("history: nothing to redo");
            return false;
        }
        self.report_cursor("Redo Texture");
        self.cursor.set(self.cursor.get() + 1);
        self.apply(target);
        true
    }

    /// The snapshot at the cursor.
    pub fn peek(&self) -> &Snapshot {
        self.assert_alive();
        &self.snapshots[self.cursor.get() - 1]
    }

    /// Re-apply the snapshot at the cursor after the host moved (or didn't
    /// move) it. Applying at an unchanged cursor is harmless.
    pub fn on_external_undo_redo(&mut self, target: &mut impl SnapshotTarget) {
        if self.disposed {
            return;
        }
        let cursor = self.cursor.get();
        let clamped = cursor.clamp(1, self.snapshots.len());
        if clamped != cursor {
            log::warn!(
                "history: host restored cursor {cursor} outside 1..={}, clamping to {clamped}",
                self.snapshots.len()
            );
            self.cursor.set(clamped);
        }
        self.apply(target);
    }

    pub fn can_undo(&self) -> bool {
        self.cursor.get() > 1
    }

    pub fn can_redo(&self) -> bool {
        self.cursor.get() < self.snapshots.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor.get()
    }

    /// Shared handle to the cursor, as handed to the host.
    pub fn cursor_handle(&self) -> &HistoryCursor {
        &self.cursor
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    /// Bytes held by all snapshots. Shared pixels are counted once per entry.
    pub fn memory_usage(&self) -> usize {
        self.snapshots.iter().map(Snapshot::memory_bytes).sum()
    }

    /// Report future cursor moves to `host`.
    pub fn attach_host(&mut self, host: SharedNotifier) {
        self.host = Some(host);
    }

    pub fn detach_host(&mut self) -> Option<SharedNotifier> {
        self.host.take()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Release every snapshot. Any later record/undo/redo/peek panics.
    pub fn dispose(&mut self) {
        self.snapshots.clear();
        self.host = None;
        self.disposed = true;
    }

    fn apply(&self, target: &mut impl SnapshotTarget) {
        let snapshot = self.peek();
        let live = target.snapshot_pixels().dimensions();
        assert_eq!(
            live,
            snapshot.dimensions(),
            "snapshot dimension mismatch: canvas is {:?}, snapshot is {:?}",
            live,
            snapshot.dimensions(),
        );
        target.restore(snapshot.pixels());
    }

    fn report_cursor(&self, label: &str) {
        if let Some(host) = &self.host {
            host.borrow_mut().record_cursor(&self.cursor, label);
        }
    }

    fn assert_alive(&self) {
        assert!(!self.disposed, "history stack used after dispose");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::CanvasBuffers;
    use image::Rgba;

    fn canvas_with(value: u8) -> CanvasBuffers {
        CanvasBuffers::from_image(RgbaImage::from_pixel(2, 2, Rgba([value, value, value, 255])))
            .unwrap()
    }

    fn set(canvas: &mut CanvasBuffers, value: u8) {
        canvas.replace_target(&RgbaImage::from_pixel(2, 2, Rgba([value, value, value, 255])));
    }

    #[test]
    fn init_seeds_one_snapshot() {
        let canvas = canvas_with(0);
        let history = HistoryStack::new(&canvas);
        assert_eq!(history.len(), 1);
        assert_eq!(history.cursor(), 1);
        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert_eq!(history.peek().pixels(), canvas.target());
    }

    #[test]
    fn undo_and_redo_restore_pixels() {
        let mut canvas = canvas_with(0);
        let mut history = HistoryStack::new(&canvas);
        set(&mut canvas, 100);
        history.record(&canvas);

        assert!(history.undo(&mut canvas));
        assert_eq!(canvas.pixel(0, 0)[0], 0);
        assert!(!history.undo(&mut canvas));
        assert_eq!(history.cursor(), 1);

        assert!(history.redo(&mut canvas));
        assert_eq!(canvas.pixel(0, 0)[0], 100);
        assert!(!history.redo(&mut canvas));
        assert_eq!(history.cursor(), 2);
    }

    #[test]
    fn record_after_undo_discards_redo_branch() {
        let mut canvas = canvas_with(0);
        let mut history = HistoryStack::new(&canvas);
        set(&mut canvas, 1);
        history.record(&canvas);
        let first = history.peek().clone();
        set(&mut canvas, 2);
        history.record(&canvas);

        history.undo(&mut canvas);
        set(&mut canvas, 3);
        history.record(&canvas);

        assert!(!history.can_redo());
        assert_eq!(history.len(), 3);
        assert_eq!(history.snapshots()[1], first);
        assert_eq!(history.peek().pixels().get_pixel(0, 0)[0], 3);
    }

    #[test]
    fn snapshots_compare_by_identity() {
        let canvas = canvas_with(7);
        let a = Snapshot::capture(canvas.target());
        let b = Snapshot::capture(canvas.target());
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn external_notification_clamps_cursor() {
        let mut canvas = canvas_with(0);
        let mut history = HistoryStack::new(&canvas);
        set(&mut canvas, 50);
        history.record(&canvas);

        history.cursor_handle().set(9);
        history.on_external_undo_redo(&mut canvas);
        assert_eq!(history.cursor(), 2);
        assert_eq!(canvas.pixel(1, 1)[0], 50);

        history.cursor_handle().set(1);
        history.on_external_undo_redo(&mut canvas);
        assert_eq!(canvas.pixel(1, 1)[0], 0);
    }

    #[test]
    #[should_panic(expected = "snapshot dimension mismatch")]
    fn record_rejects_resized_canvas() {
        let mut canvas = canvas_with(0);
        let mut history = HistoryStack::new(&canvas);
        canvas.resize(4, 4).unwrap();
        history.record(&canvas);
    }

    #[test]
    #[should_panic(expected = "used after dispose")]
    fn record_after_dispose_panics() {
        let canvas = canvas_with(0);
        let mut history = HistoryStack::new(&canvas);
        history.dispose();
        assert!(history.is_empty());
        history.record(&canvas);
    }

    #[test]
    fn memory_usage_counts_every_entry() {
        let mut canvas = canvas_with(0);
        let mut history = HistoryStack::new(&canvas);
        set(&mut canvas, 9);
        history.record(&canvas);
        assert_eq!(history.memory_usage(), 2 * 2 * 2 * 4);
    }
}
