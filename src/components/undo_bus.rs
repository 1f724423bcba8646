use std::cell::RefCell;
use std::rc::{Rc, Weak};

use super::history::{HistoryCursor, ListenerId, UndoNotifier, UndoRedoListener};

struct CursorRecord {
    cursor: HistoryCursor,
    value: usize,
    label: String,
}

/// A minimal host undo system.
///
/// Keeps LIFO stacks of recorded cursor values. `perform_undo`/`perform_redo`
/// swap the recorded value back into the cursor and then notify every live
/// listener, the same way an editor-wide undo would.
#[derive(Default)]
pub struct UndoBus {
    undo: Vec<CursorRecord>,
    redo: Vec<CursorRecord>,
    listeners: Vec<(ListenerId, Weak<RefCell<dyn UndoRedoListener>>)>,
    next_id: u64,
}

impl UndoBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::new()))
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Label of the entry the next undo would revert.
    pub fn undo_label(&self) -> Option<&str> {
        self.undo.last().map(|r| r.label.as_str())
    }

    pub fn redo_label(&self) -> Option<&str> {
        self.redo.last().map(|r| r.label.as_str())
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Revert the most recent recorded cursor and notify listeners.
    /// Returns `false` when there is nothing to undo.
    pub fn perform_undo(bus: &Rc<RefCell<Self>>) -> bool {
        let listeners = {
            let mut this = bus.borrow_mut();
            let Some(record) = this.undo.pop() else {
                return false;
            };
            let swapped = swap_in(record);
            log::debug!("undo bus: undo \"{}\"", swapped.label);
            this.redo.push(swapped);
            this.live_listeners()
        };
        notify(&listeners);
        true
    }

    /// Re-apply the most recently undone cursor and notify listeners.
    pub fn perform_redo(bus: &Rc<RefCell<Self>>) -> bool {
        let listeners = {
            let mut this = bus.borrow_mut();
            let Some(record) = this.redo.pop() else {
                return false;
            };
            let swapped = swap_in(record);
            log::debug!("undo bus: redo \"{}\"", swapped.label);
            this.undo.push(swapped);
            this.live_listeners()
        };
        notify(&listeners);
        true
    }

    // Drops listeners whose owner is gone; the bus lock is released before
    // the survivors are called, so they may record again.
    fn live_listeners(&mut self) -> Vec<Rc<RefCell<dyn UndoRedoListener>>> {
        self.listeners.retain(|(_, weak)| weak.strong_count() > 0);
        self.listeners.iter().filter_map(|(_, weak)| weak.upgrade()).collect()
    }
}

/// Put the recorded value into the cursor, returning a record of the value
/// it replaced.
fn swap_in(record: CursorRecord) -> CursorRecord {
    let current = record.cursor.get();
    record.cursor.set(record.value);
    CursorRecord {
        value: current,
        ..record
    }
}

fn notify(listeners: &[Rc<RefCell<dyn UndoRedoListener>>]) {
    for listener in listeners {
        match listener.try_borrow_mut() {
            Ok(mut l) => l.on_external_undo_redo(),
            Err(_) => log::warn!("undo bus: listener busy, skipping notification"),
        }
    }
}

impl UndoNotifier for UndoBus {
    fn record_cursor(&mut self, cursor: &HistoryCursor, label: &str) {
        self.undo.push(CursorRecord {
            cursor: cursor.clone(),
            value: cursor.get(),
            label: label.to_string(),
        });
        self.redo.clear();
    }

    fn subscribe(&mut self, listener: Weak<RefCell<dyn UndoRedoListener>>) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.listeners.push((id, listener));
        id
    }

    fn unsubscribe(&mut self, id: ListenerId) {
        self.listeners.retain(|(existing, _)| *existing != id);
    }
}
