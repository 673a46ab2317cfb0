//! Tag uniqueness and child reuse

use super::test_utils::*;
use premo::{PmError, PmLifecycleState, TagPath};

#[test]
fn test_same_tag_same_description_reuses_child() {
    let log = event_log();
    let mut delegate = delegate(&log);
    let root = delegate.on_create().unwrap();
    let tree = delegate.tree_mut();

    let first = tree.attach_child(root, item("a"), "a").unwrap().unwrap();
    let second = tree.attach_child(root, item("a"), "a").unwrap().unwrap();

    assert_eq!(first, second);
    assert_eq!(tree.children(root), &[first]);
    assert_eq!(hooks(&log, "on_create"), vec!["root", "root/a"]);
}

#[test]
fn test_same_tag_other_description_is_rejected() {
    let log = event_log();
    let mut delegate = delegate(&log);
    let root = delegate.on_create().unwrap();
    let tree = delegate.tree_mut();

    let first = tree.attach_child(root, item("a"), "a").unwrap().unwrap();
    let err = tree.attach_child(root, item("other"), "a").unwrap_err();

    match err {
        PmError::DuplicateTag { parent, tag } => {
            assert_eq!(parent.to_string(), "root");
            assert_eq!(tag, "a");
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(tree.children(root), &[first]);
    assert_eq!(tree.description(first), Some(&item("a")));
}

#[test]
fn test_same_tag_under_different_parents_is_fine() {
    let log = event_log();
    let mut delegate = delegate(&log);
    let root = delegate.on_create().unwrap();
    let tree = delegate.tree_mut();

    let a = tree.attach_child(root, item("a"), "a").unwrap().unwrap();
    let nested = tree.attach_child(a, item("a"), "a").unwrap().unwrap();

    assert_ne!(a, nested);
    assert_eq!(tree.path(nested).unwrap().to_string(), "root/a/a");
    let path = TagPath::root("root").child("a").child("a");
    assert_eq!(tree.find(&path), Some(nested));
}

#[test]
fn test_attach_in_on_create_is_idempotent_across_hooks() {
    let log = event_log();
    let (mut delegate, errors) = persistent_delegate(&log, Screen::Home, None);
    let root = delegate.on_create().unwrap();

    let tree = delegate.tree();
    let counter = tree.child(root, "counter").unwrap();
    assert_eq!(tree.children(root).len(), 1);
    assert_eq!(tree.lifecycle_state(counter), Some(PmLifecycleState::Created));
    assert_eq!(hooks(&log, "on_create"), vec!["root", "root/counter"]);
    assert!(errors.borrow().is_empty());
}

#[test]
fn test_attach_to_destroyed_parent_is_ignored() {
    let log = event_log();
    let mut delegate = delegate(&log);
    let root = delegate.on_create().unwrap();
    delegate.on_destroy().unwrap();

    let attached = delegate
        .tree_mut()
        .attach_child(root, item("a"), "a")
        .unwrap();
    assert!(attached.is_none());
    assert!(delegate.tree().is_empty());
}
