use std::cell::RefCell;
use std::rc::Rc;

use image::Rgba;
use maskpaint::{
    EditorSettings, Modifiers, PointerButton, PointerEvent, Session, UndoBus,
};

fn shared_session() -> Rc<RefCell<Session>> {
    let settings = EditorSettings {
        canvas_width: 32,
        canvas_height: 32,
        ..Default::default()
    };
    Rc::new(RefCell::new(Session::new_untitled(1, &settings).unwrap()))
}

fn stroke(session: &Rc<RefCell<Session>>, from: (f32, f32), to: (f32, f32)) {
    let mut s = session.borrow_mut();
    s.handle_pointer(PointerEvent::Down {
        position: from,
        button: PointerButton::Primary,
        modifiers: Modifiers::empty(),
    });
    s.handle_pointer(PointerEvent::Drag {
        position: to,
        modifiers: Modifiers::empty(),
    });
    s.handle_pointer(PointerEvent::Up {
        button: PointerButton::Primary,
    });
}

#[test]
fn host_undo_walks_back_through_gestures() {
    let bus = UndoBus::shared();
    let session = shared_session();
    Session::subscribe(&session, bus.clone());
    session.borrow_mut().painter_mut().brush_mut().size = 4.0;

    stroke(&session, (2.0, 2.0), (30.0, 2.0));
    let after_first = session.borrow().painter().pixels().clone();
    stroke(&session, (2.0, 20.0), (30.0, 20.0));
    assert_eq!(session.borrow().history().len(), 3);

    assert!(UndoBus::perform_undo(&bus));
    assert_eq!(session.borrow().painter().pixels(), &after_first);
    assert!(UndoBus::perform_undo(&bus));
    assert!(session.borrow().painter().pixels().pixels().all(|p| p.0 == [255; 4]));
    assert!(!UndoBus::perform_undo(&bus));

    assert!(UndoBus::perform_redo(&bus));
    assert_eq!(session.borrow().painter().pixels(), &after_first);
}

#[test]
fn own_undo_is_visible_to_the_host() {
    let bus = UndoBus::shared();
    let session = shared_session();
    Session::subscribe(&session, bus.clone());

    session.borrow_mut().fill(Rgba([0, 0, 0, 255]));
    assert!(session.borrow_mut().undo());
    assert_eq!(bus.borrow().undo_label(), Some("Undo Texture"));

    // Host undo of the session's own undo puts the fill back.
    assert!(UndoBus::perform_undo(&bus));
    assert_eq!(session.borrow().painter().pixels().get_pixel(0, 0).0, [0, 0, 0, 255]);
}

#[test]
fn dropped_session_is_pruned_from_the_host() {
    let bus = UndoBus::shared();
    {
        let session = shared_session();
        Session::subscribe(&session, bus.clone());
        session.borrow_mut().invert();
    }
    assert!(UndoBus::perform_undo(&bus));
    assert_eq!(bus.borrow().listener_count(), 0);
}
