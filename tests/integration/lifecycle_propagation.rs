//! Lifecycle propagation through the tree

use super::test_utils::*;
use premo::{
    LifecycleError, PmArgs, PmContext, PmDelegate, PmError, PmLifecycleState, PresentationModel,
};

/// root{a{a1}, b}, created through the delegate
fn build_tree(log: &EventLog) -> premo::PmDelegate<Screen> {
    let mut delegate = delegate(log);
    let root = delegate.on_create().unwrap();
    let tree = delegate.tree_mut();
    let a = tree.attach_child(root, item("a"), "a").unwrap().unwrap();
    tree.attach_child(a, item("a1"), "a1").unwrap().unwrap();
    tree.attach_child(root, item("b"), "b").unwrap().unwrap();
    delegate
}

#[test]
fn test_create_runs_top_down_once() {
    let log = event_log();
    let delegate = build_tree(&log);

    assert_eq!(
        hooks(&log, "on_create"),
        vec!["root", "root/a", "root/a/a1", "root/b"]
    );
    let tree = delegate.tree();
    for id in tree.walk() {
        assert_eq!(tree.lifecycle_state(id), Some(PmLifecycleState::Created));
    }
}

#[test]
fn test_foreground_parent_first_background_children_first() {
    let log = event_log();
    let mut delegate = build_tree(&log);

    delegate.on_foreground().unwrap();
    assert_eq!(
        hooks(&log, "on_foreground"),
        vec!["root", "root/a", "root/a/a1", "root/b"]
    );

    delegate.on_background().unwrap();
    assert_eq!(
        hooks(&log, "on_background"),
        vec!["root/a/a1", "root/a", "root/b", "root"]
    );
}

#[test]
fn test_repeated_transitions_are_noops() {
    let log = event_log();
    let mut delegate = build_tree(&log);

    // Background straight after create does nothing
    delegate.on_background().unwrap();
    assert!(hooks(&log, "on_background").is_empty());

    delegate.on_foreground().unwrap();
    delegate.on_foreground().unwrap();
    assert_eq!(hooks(&log, "on_foreground").len(), 4);
}

#[test]
fn test_destroy_is_post_order() {
    let log = event_log();
    let mut delegate = build_tree(&log);
    delegate.on_foreground().unwrap();
    log.borrow_mut().clear();

    delegate.on_destroy().unwrap();

    assert_eq!(
        hooks(&log, "on_destroy"),
        vec!["root/a/a1", "root/a", "root/b", "root"]
    );
    // Each foregrounded node leaves the foreground right before it is destroyed
    let entries = log.borrow().clone();
    assert_eq!(entries[0], "root/a/a1 on_background");
    assert_eq!(entries[1], "root/a/a1 on_destroy");
    assert_eq!(entries.last().map(String::as_str), Some("root on_destroy"));

    assert!(delegate.tree().is_empty());
    assert!(delegate.root().is_none());
}

#[test]
fn test_no_hooks_after_destroy() {
    let log = event_log();
    let mut delegate = build_tree(&log);
    delegate.on_destroy().unwrap();
    let before = log.borrow().len();

    delegate.on_foreground().unwrap();
    delegate.on_background().unwrap();
    delegate.on_destroy().unwrap();
    delegate.on_save();
    assert!(!delegate.handle_back());

    assert_eq!(log.borrow().len(), before);
    assert!(delegate.is_destroyed());
}

#[test]
fn test_lifecycle_before_create_is_an_error() {
    let log = event_log();
    let mut delegate = delegate(&log);

    assert!(matches!(
        delegate.on_foreground(),
        Err(PmError::Lifecycle(LifecycleError::NotCreated(_)))
    ));
    assert!(matches!(
        delegate.on_background(),
        Err(PmError::Lifecycle(LifecycleError::NotCreated(_)))
    ));
    assert!(log.borrow().is_empty());
}

#[test]
fn test_create_twice_is_fatal() {
    let log = event_log();
    let mut delegate = delegate(&log);
    delegate.on_create().unwrap();

    assert!(matches!(
        delegate.on_create(),
        Err(PmError::Lifecycle(LifecycleError::AlreadyCreated(_)))
    ));

    // No resurrection after destroy either
    delegate.on_destroy().unwrap();
    assert!(matches!(
        delegate.on_create(),
        Err(PmError::Lifecycle(LifecycleError::AlreadyCreated(_)))
    ));
    assert_eq!(hooks(&log, "on_create"), vec!["root"]);
}

#[test]
fn test_child_attached_to_foreground_parent_catches_up() {
    let log = event_log();
    let mut delegate = delegate(&log);
    let root = delegate.on_create().unwrap();
    delegate.on_foreground().unwrap();

    let tree = delegate.tree_mut();
    let late = tree.attach_child(root, item("late"), "late").unwrap().unwrap();

    assert_eq!(
        tree.lifecycle_state(late),
        Some(PmLifecycleState::InForeground)
    );
    assert_eq!(hooks(&log, "on_create"), vec!["root", "root/late"]);
    assert_eq!(hooks(&log, "on_foreground"), vec!["root", "root/late"]);
}

#[test]
fn test_detach_destroys_subtree_and_invalidates_ids() {
    let log = event_log();
    let mut delegate = build_tree(&log);
    let root = delegate.root().unwrap();
    let tree = delegate.tree_mut();
    let a = tree.child(root, "a").unwrap();
    let a1 = tree.child(a, "a1").unwrap();

    assert!(tree.detach_child(root, "a").unwrap());
    assert!(!tree.detach_child(root, "a").unwrap());

    assert_eq!(hooks(&log, "on_destroy"), vec!["root/a/a1", "root/a"]);
    assert!(!tree.contains(a));
    assert!(!tree.contains(a1));
    assert_eq!(tree.children(root).len(), 1);

    // Stale ids resolve to nothing, even once their slots are reused
    tree.attach_child(root, item("c"), "c").unwrap().unwrap();
    tree.attach_child(root, item("d"), "d").unwrap().unwrap();
    assert_eq!(tree.lifecycle_state(a), None);
    assert!(tree.attach_child(a, item("x"), "x").unwrap().is_none());
    assert!(tree.destroy(a1).is_ok());
    assert_eq!(tree.len(), 4);
}

#[test]
fn test_lifecycle_updates_are_observable() {
    let log = event_log();
    let mut delegate = delegate(&log);
    let root = delegate.on_create().unwrap();
    let mut updates = delegate.tree().lifecycle_updates(root).unwrap();
    assert_eq!(*updates.borrow_and_update(), PmLifecycleState::Created);

    delegate.on_foreground().unwrap();
    assert!(updates.has_changed().unwrap());
    assert_eq!(*updates.borrow_and_update(), PmLifecycleState::InForeground);

    delegate.on_destroy().unwrap();
    assert_eq!(*updates.borrow(), PmLifecycleState::Destroyed);
}

#[test]
fn test_failing_hook_is_reported_with_its_path() {
    let log = event_log();
    let mut delegate = delegate(&log);
    let root = delegate.on_create().unwrap();

    let err = delegate
        .tree_mut()
        .attach_child(root, Screen::Broken, "broken")
        .unwrap_err();
    match err {
        PmError::Hook { path, hook, source } => {
            assert_eq!(path.to_string(), "root/broken");
            assert_eq!(hook, "on_create");
            assert_eq!(source.to_string(), "broken screen");
        }
        other => panic!("unexpected error: {}", other),
    }
}

/// Opens an overlay whenever it goes to the background
struct ShellPm {
    log: EventLog,
}

impl PresentationModel<Screen> for ShellPm {
    fn on_background(&mut self, cx: &mut PmContext<'_, Screen>) -> anyhow::Result<()> {
        cx.attach_child(item("overlay"), "overlay")?;
        Ok(())
    }

    fn on_destroy(&mut self, cx: &mut PmContext<'_, Screen>) -> anyhow::Result<()> {
        self.log.borrow_mut().push(format!("{} on_destroy", cx.path()));
        Ok(())
    }
}

#[test]
fn test_child_attached_during_teardown_is_destroyed_first() {
    let log = event_log();
    let items = screen_factory(log.clone());
    let shell_log = log.clone();
    let factory = move |screen: &Screen| -> Box<dyn PresentationModel<Screen>> {
        match screen {
            Screen::Root => Box::new(ShellPm {
                log: shell_log.clone(),
            }),
            other => items(other),
        }
    };
    let mut delegate = PmDelegate::new(PmArgs::new(Screen::Root), factory);
    delegate.on_create().unwrap();
    delegate.on_foreground().unwrap();

    delegate.on_destroy().unwrap();

    assert_eq!(hooks(&log, "on_create"), vec!["root/overlay"]);
    assert_eq!(hooks(&log, "on_destroy"), vec!["root/overlay", "root"]);
    assert_eq!(delegate.tree().root(), None);
    assert!(delegate.tree().is_empty());
}
