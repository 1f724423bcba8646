use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use bitflags::bitflags;
use image::{Rgba, RgbaImage};
use uuid::Uuid;

use crate::canvas::{CanvasError, ChannelMask};
use crate::components::history::{
    HistoryStack, ListenerId, SharedNotifier, Snapshot, UndoRedoListener,
};
use crate::components::tools::BrushSizeLimits;
use crate::config::EditorSettings;
use crate::io::{CodecError, ImageCodec, load_image_file};
use crate::painter::Painter;

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Canvas(#[from] CanvasError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("could not write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

bitflags! {
    /// Keyboard modifiers held during a pointer event.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT = 1 << 0;
        const CONTROL = 1 << 1;
        const ALT = 1 << 2;
        const COMMAND = 1 << 3;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

/// Pointer input in canvas pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerEvent {
    Down {
        position: (f32, f32),
        button: PointerButton,
        modifiers: Modifiers,
    },
    Drag {
        position: (f32, f32),
        modifiers: Modifiers,
    },
    Up {
        button: PointerButton,
    },
    /// Wheel movement; with SHIFT alone, positive shrinks the brush.
    Scroll { delta: f32, modifiers: Modifiers },
}

/// Single open image: the painter, its history and save state.
pub struct Session {
    pub id: Uuid,
    painter: Painter,
    history: HistoryStack,
    /// Snapshot that matches the file on disk.
    saved_snapshot: Uuid,
    size_limits: BrushSizeLimits,
    /// `true` between a painting `Down` and its `Up`.
    stroke_active: bool,
    host: Option<(SharedNotifier, ListenerId)>,

    /// `None` for unsaved/untitled images.
    pub path: Option<PathBuf>,
    /// Display name (derived from path or "Untitled-X")
    pub name: String,
}

impl Session {
    pub fn new_untitled(
        untitled_counter: usize,
        settings: &EditorSettings,
    ) -> Result<Self, SessionError> {
        let painter = Painter::from_settings(settings)?;
        let mut session = Self::from_painter(painter, format!("Untitled-{}", untitled_counter));
        session.size_limits = settings.brush_size;
        Ok(session)
    }

    /// Open `path` with the configured brush and mask.
    pub fn from_file(
        path: PathBuf,
        codec: &dyn ImageCodec,
        settings: &EditorSettings,
    ) -> Result<Self, SessionError> {
        let image = load_image_file(codec, &path)?;
        let mut painter = Painter::new_from_image(image)?;
        painter.set_brush(settings.brush.clone());
        painter.set_channel_mask(settings.channel_mask);

        let mut session = Self::from_painter(painter, name_from_path(&path));
        session.size_limits = settings.brush_size;
        session.path = Some(path);
        Ok(session)
    }

    /// Wrap a painter, seeding history with its current pixels. The initial
    /// state counts as saved.
    pub fn from_painter(painter: Painter, name: String) -> Self {
        let history = HistoryStack::new(&painter);
        let saved_snapshot = history.peek().id();
        log::info!(
            "session \"{}\" opened ({}x{})",
            name,
            painter.width(),
            painter.height()
        );
        Self {
            id: Uuid::new_v4(),
            painter,
            history,
            saved_snapshot,
            size_limits: BrushSizeLimits::default(),
            stroke_active: false,
            host: None,
            path: None,
            name,
        }
    }

    // ========================================================================
    // STATE
    // ========================================================================

    pub fn painter(&self) -> &Painter {
        &self.painter
    }

    /// Direct painter access. Changes made here are not recorded until
    /// [`record`](Self::record) is called.
    pub fn painter_mut(&mut self) -> &mut Painter {
        &mut self.painter
    }

    pub fn history(&self) -> &HistoryStack {
        &self.history
    }

    pub fn size_limits(&self) -> BrushSizeLimits {
        self.size_limits
    }

    pub fn set_size_limits(&mut self, limits: BrushSizeLimits) {
        self.size_limits = limits;
    }

    pub fn set_channel_mask(&mut self, mask: ChannelMask) {
        self.painter.set_channel_mask(mask);
    }

    pub fn is_stroke_active(&self) -> bool {
        self.stroke_active
    }

    /// The current snapshot differs from the last saved one.
    pub fn has_unsaved_changes(&self) -> bool {
        self.history.peek().id() != self.saved_snapshot
    }

    /// Get the display title (name with dirty indicator)
    pub fn display_title(&self) -> String {
        if self.has_unsaved_changes() {
            format!("{}*", self.name)
        } else {
            self.name.clone()
        }
    }

    // ========================================================================
    // EDITING
    // ========================================================================

    /// Snapshot the canvas as one undo step.
    pub fn record(&mut self) {
        self.history.record(&self.painter);
    }

    pub fn fill(&mut self, color: Rgba<u8>) {
        self.painter.fill(color);
        self.record();
    }

    pub fn invert(&mut self) {
        self.painter.invert();
        self.record();
    }

    pub fn undo(&mut self) -> bool {
        self.history.undo(&mut self.painter)
    }

    pub fn redo(&mut self) -> bool {
        self.history.redo(&mut self.painter)
    }

    /// Handle one pointer event. Returns the number of dabs painted.
    ///
    /// Only the primary button with no modifiers paints. A whole
    /// down-drag-up gesture becomes a single undo step.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> usize {
        match event {
            PointerEvent::Down {
                position,
                button: PointerButton::Primary,
                modifiers,
            } if modifiers.is_empty() => {
                self.stroke_active = true;
                self.painter.paint(position, false)
            }
            PointerEvent::Drag { position, modifiers } if self.stroke_active && modifiers.is_empty() => {
                self.painter.paint(position, true)
            }
            PointerEvent::Up {
                button: PointerButton::Primary,
            } if self.stroke_active => {
                self.stroke_active = false;
                self.record();
                0
            }
            PointerEvent::Scroll { delta, modifiers } if modifiers == Modifiers::SHIFT => {
                let brush = self.painter.brush_mut();
                brush.size = self.size_limits.scaled(brush.size, delta);
                log::trace!("brush size -> {}", brush.size);
                0
            }
            _ => 0,
        }
    }

    /// Replace the image, restarting history from it.
    pub fn load_image(&mut self, image: &RgbaImage) -> Result<(), SessionError> {
        self.painter.load(image)?;
        self.stroke_active = false;
        let host = self.history.detach_host();
        self.history.dispose();
        self.history = HistoryStack::new(&self.painter);
        if let Some(host) = host {
            self.history.attach_host(host);
        }
        self.saved_snapshot = self.history.peek().id();
        Ok(())
    }

    // ========================================================================
    // SAVING
    // ========================================================================

    /// Encode the canvas and mark the current state as saved.
    pub fn save(&mut self, codec: &dyn ImageCodec) -> Result<Vec<u8>, SessionError> {
        let bytes = self.painter.save(codec)?;
        self.mark_saved();
        Ok(bytes)
    }

    /// Encode and write to `path`, adopting it as the session path.
    pub fn save_to_path(&mut self, path: &Path, codec: &dyn ImageCodec) -> Result<(), SessionError> {
        let bytes = self.painter.save(codec)?;
        std::fs::write(path, bytes).map_err(|source| SessionError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        self.mark_saved();
        self.path = Some(path.to_path_buf());
        self.name = name_from_path(path);
        log::info!("session saved to {}", path.display());
        Ok(())
    }

    fn mark_saved(&mut self) {
        let snapshot: &Snapshot = self.history.peek();
        self.saved_snapshot = snapshot.id();
    }

    // ========================================================================
    // HOST UNDO + LIFECYCLE
    // ========================================================================

    /// Register `session` with a host undo system: history reports its cursor
    /// moves to `notifier`, and host undo/redo re-applies the current snapshot.
    pub fn subscribe(session: &Rc<RefCell<Session>>, notifier: SharedNotifier) {
        let listener: Rc<RefCell<dyn UndoRedoListener>> = session.clone();
        let id = notifier.borrow_mut().subscribe(Rc::downgrade(&listener));
        let mut this = session.borrow_mut();
        this.unsubscribe();
        this.history.attach_host(notifier.clone());
        this.host = Some((notifier, id));
    }

    pub fn unsubscribe(&mut self) {
        if let Some((notifier, id)) = self.host.take() {
            notifier.borrow_mut().unsubscribe(id);
            self.history.detach_host();
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.host.is_some()
    }

    /// Leave the host undo system and free the canvas and every snapshot.
    pub fn dispose(&mut self) {
        self.unsubscribe();
        self.history.dispose();
        self.painter.dispose();
        log::info!("session \"{}\" disposed", self.name);
    }
}

impl UndoRedoListener for Session {
    fn on_external_undo_redo(&mut self) {
        if self.painter.is_disposed() {
            return;
        }
        self.history.on_external_undo_redo(&mut self.painter);
    }
}

fn name_from_path(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}
