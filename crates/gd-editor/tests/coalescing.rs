//! Integration tests: gesture coalescing in the undo history.
//!
//! A drag or resize produces a burst of attribute writes; the history must
//! fold each burst into one undo step that restores the pre-gesture state.

use gd_core::{NodeId, NodeKind, SceneNode, keys};
use gd_editor::{AttrBundle, CoalesceGroups, Command, HistoryConfig, HistoryEngine, Session};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

fn size(width: f64, height: f64) -> Value {
    json!({ "width": width, "height": height })
}

fn pos(x: f64, y: f64) -> Value {
    json!({ "x": x, "y": y })
}

fn bundle(entries: &[(&str, Value)]) -> AttrBundle {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), Some(v.clone())))
        .collect()
}

fn with_rect(config: HistoryConfig) -> (Session, NodeId) {
    let mut session = Session::new(config);
    let root = session.root_id();
    let id = session
        .create_node(root, 0, SceneNode::new(NodeKind::Rect))
        .unwrap();
    (session, id)
}

// ─── Resize gesture ─────────────────────────────────────────────────────

#[test]
fn resize_gesture_scenario() {
    let mut session = Session::default();
    let root = session.root_id();
    let a = session
        .create_node(root, 0, SceneNode::new(NodeKind::Rect))
        .unwrap();

    for (s, p) in [
        (size(10.0, 10.0), pos(0.0, 0.0)),
        (size(30.0, 15.0), pos(2.0, 2.0)),
        (size(50.0, 20.0), pos(5.0, 5.0)),
    ] {
        session
            .set_attributes(a, bundle(&[(keys::SIZE, s), (keys::POSITION, p)]))
            .unwrap();
    }
    assert_eq!(session.history.undo_len(), 2);

    session.undo().unwrap();
    session.undo().unwrap();
    assert!(session.save().unwrap().children.is_empty());
    assert!(!session.history.can_undo());

    session.redo().unwrap();
    session.redo().unwrap();
    assert_eq!(session.get(a, keys::SIZE), Some(&size(50.0, 20.0)));
    assert_eq!(session.get(a, keys::POSITION), Some(&pos(5.0, 5.0)));
    assert!(!session.history.can_redo());
}

#[test]
fn grouped_single_key_writes_restore_pre_gesture_state() {
    let (mut session, id) = with_rect(HistoryConfig::default());
    let before_size = session.get(id, keys::SIZE).cloned();
    let before_pos = session.get(id, keys::POSITION).cloned();

    for step in 1..=5 {
        let f = f64::from(step);
        session.set_attribute(id, keys::SIZE, size(f, f)).unwrap();
        session.set_attribute(id, keys::POSITION, pos(f, f)).unwrap();
        session.set_attribute(id, keys::ANGLE, json!(f * 3.0)).unwrap();
    }
    assert_eq!(session.history.undo_len(), 2);

    session.undo().unwrap();
    assert_eq!(session.get(id, keys::SIZE).cloned(), before_size);
    assert_eq!(session.get(id, keys::POSITION).cloned(), before_pos);
    assert_eq!(session.get(id, keys::ANGLE), Some(&json!(0.0)));
}

// ─── Duplicate-key drop ─────────────────────────────────────────────────

#[test]
fn duplicate_key_drop_without_groups() {
    let config = HistoryConfig::default().with_groups(CoalesceGroups::none());
    let (mut session, id) = with_rect(config);
    session.seal();
    let original = session.get(id, keys::CORNER_RADIUS).cloned();

    session.set_attribute(id, keys::CORNER_RADIUS, json!(4)).unwrap();
    session.set_attribute(id, keys::CORNER_RADIUS, json!(9)).unwrap();
    assert_eq!(session.history.undo_len(), 2);

    session.undo().unwrap();
    assert_eq!(session.get(id, keys::CORNER_RADIUS).cloned(), original);
}

#[test]
fn without_groups_geometry_keys_are_separate_steps() {
    let config = HistoryConfig::default().with_groups(CoalesceGroups::none());
    let (mut session, id) = with_rect(config);

    session.set_attribute(id, keys::SIZE, size(1.0, 1.0)).unwrap();
    session.set_attribute(id, keys::POSITION, pos(1.0, 1.0)).unwrap();
    assert_eq!(session.history.undo_len(), 3);
}

// ─── Barriers ───────────────────────────────────────────────────────────

#[test]
fn structural_barrier_with_prepared_node() {
    let mut session = Session::default();
    let root = session.root_id();

    let a = session.prepare(SceneNode::new(NodeKind::Rect)).unwrap();
    session.set_attribute(a, keys::SIZE, size(0.4, 0.4)).unwrap();
    session.insert(a, root, 0).unwrap();
    session.set_attribute(a, keys::SIZE, size(0.6, 0.6)).unwrap();
    assert_eq!(session.history.undo_len(), 2);

    session.undo().unwrap();
    assert_eq!(session.get(a, keys::SIZE), Some(&size(0.4, 0.4)));
    session.undo().unwrap();
    assert!(session.save().unwrap().children.is_empty());
}

#[test]
fn trailing_set_does_not_coalesce_across_create() {
    let (mut session, a) = with_rect(HistoryConfig::default());
    let root = session.root_id();
    session.seal();

    session.set_attribute(a, keys::SIZE, size(0.3, 0.3)).unwrap();
    session
        .create_node(root, 1, SceneNode::new(NodeKind::Circle))
        .unwrap();
    session.set_attribute(a, keys::SIZE, size(0.5, 0.5)).unwrap();
    assert_eq!(session.history.undo_len(), 4);

    session.undo().unwrap();
    assert_eq!(session.get(a, keys::SIZE), Some(&size(0.3, 0.3)));
}

#[test]
fn edits_on_other_nodes_do_not_split_a_gesture() {
    let (mut session, a) = with_rect(HistoryConfig::default());
    let root = session.root_id();
    let b = session
        .create_node(root, 1, SceneNode::new(NodeKind::Circle))
        .unwrap();
    session.seal();

    for step in 1..=4 {
        let f = f64::from(step) / 10.0;
        session.set_attribute(a, keys::POSITION, pos(f, f)).unwrap();
        session.set_attribute(b, keys::POSITION, pos(f, 0.0)).unwrap();
    }
    assert_eq!(session.history.undo_len(), 4);
}

#[test]
fn raw_history_push_walks_past_other_nodes() {
    let a = NodeId::intern("coalesce_raw_a");
    let b = NodeId::intern("coalesce_raw_b");
    let mut history = HistoryEngine::default();

    history
        .push(Command::attribute_set(a, keys::SIZE, size(1.0, 1.0)))
        .unwrap();
    history
        .push(Command::attribute_set(b, keys::SIZE, size(1.0, 1.0)))
        .unwrap();
    history
        .push(Command::attribute_set(a, keys::POSITION, pos(0.0, 0.0)))
        .unwrap();
    assert_eq!(history.undo_len(), 2);

    history.push(Command::move_node(b, a, 0, 0)).unwrap();
    history
        .push(Command::attribute_set(a, keys::SIZE, size(2.0, 2.0)))
        .unwrap();
    assert_eq!(history.undo_len(), 4);
}
