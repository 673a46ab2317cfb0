//! Message bubbling and back handling

use super::test_utils::*;
use premo::{BackMessage, PmArgs, PmContext, PmDelegate, PresentationModel};

#[test]
fn test_unhandled_leaf_message_bubbles_to_root() {
    let log = event_log();
    let mut delegate = delegate(&log);
    let root = delegate.on_create().unwrap();
    let tree = delegate.tree_mut();
    let a = tree.attach_child(root, item("a"), "a").unwrap().unwrap();
    let leaf = tree.attach_child(a, item("leaf"), "leaf").unwrap().unwrap();

    assert!(tree.handle_message(leaf, &Ping("hello".to_string())));
    assert_eq!(tree.model::<RootPm>(root).unwrap().pings, vec!["hello"]);
}

#[test]
fn test_message_nobody_claims_is_unhandled() {
    let log = event_log();
    let mut delegate = delegate(&log);
    let root = delegate.on_create().unwrap();
    let tree = delegate.tree_mut();
    let leaf = tree.attach_child(root, item("leaf"), "leaf").unwrap().unwrap();

    assert!(!tree.handle_message(leaf, &Unclaimed));
    assert!(!tree.handle_message(root, &Unclaimed));
}

#[test]
fn test_non_bubbling_node_stops_propagation() {
    let log = event_log();
    let mut delegate = delegate(&log);
    let root = delegate.on_create().unwrap();
    let tree = delegate.tree_mut();
    let modal = tree.attach_child(root, item("modal"), "modal").unwrap().unwrap();
    let leaf = tree.attach_child(modal, item("leaf"), "leaf").unwrap().unwrap();
    tree.model_mut::<ItemPm>(modal).unwrap().bubbles = false;

    assert!(!tree.handle_message(leaf, &Ping("lost".to_string())));
    assert!(tree.model::<RootPm>(root).unwrap().pings.is_empty());
}

#[test]
fn test_back_message_from_child_reaches_container() {
    let log = event_log();
    let mut delegate = delegate(&log);
    let root = delegate.on_create().unwrap();
    let tree = delegate.tree_mut();
    let detail = tree.attach_child(root, item("detail"), "detail").unwrap().unwrap();
    tree.model_mut::<RootPm>(root).unwrap().active = Some("detail".to_string());

    assert!(tree.handle_message(detail, &BackMessage));
    assert_eq!(tree.model::<RootPm>(root).unwrap().active, None);

    // Nothing left to pop
    assert!(!tree.handle_message(detail, &BackMessage));
}

#[test]
fn test_back_without_active_child_falls_through_to_host() {
    let log = event_log();
    let mut delegate = delegate(&log);
    let root = delegate.on_create().unwrap();
    let tree = delegate.tree_mut();
    let a = tree.attach_child(root, item("a"), "a").unwrap().unwrap();
    let b = tree.attach_child(root, item("b"), "b").unwrap().unwrap();
    tree.model_mut::<ItemPm>(a).unwrap().consumes_back = true;
    tree.model_mut::<ItemPm>(b).unwrap().consumes_back = true;

    assert!(!delegate.handle_back());
    assert!(hooks(&log, "back").is_empty());
}

#[test]
fn test_back_routed_to_active_child_stops_propagation() {
    let log = event_log();
    let mut delegate = delegate(&log);
    let root = delegate.on_create().unwrap();
    let tree = delegate.tree_mut();
    tree.attach_child(root, item("a"), "a").unwrap().unwrap();
    let b = tree.attach_child(root, item("b"), "b").unwrap().unwrap();
    tree.model_mut::<ItemPm>(b).unwrap().consumes_back = true;
    tree.model_mut::<RootPm>(root).unwrap().active = Some("b".to_string());

    assert!(delegate.handle_back());
    assert_eq!(hooks(&log, "back"), vec!["root/b"]);
}

#[test]
fn test_back_declined_by_active_child_reaches_host() {
    let log = event_log();
    let mut delegate = delegate(&log);
    let root = delegate.on_create().unwrap();
    let tree = delegate.tree_mut();
    tree.attach_child(root, item("a"), "a").unwrap().unwrap();
    tree.model_mut::<RootPm>(root).unwrap().active = Some("a".to_string());

    assert!(!delegate.handle_back());
}

#[derive(Debug)]
struct Close;

/// Pops its "page" child on [`BackMessage`]
struct StackPm;

impl PresentationModel<Screen> for StackPm {
    fn on_create(&mut self, cx: &mut PmContext<'_, Screen>) -> anyhow::Result<()> {
        cx.on_message::<StackPm, BackMessage>(|_pm, cx, _back| {
            cx.detach_child("page").unwrap_or(false)
        });
        Ok(())
    }
}

/// Asks its container to go back when it receives [`Close`]
struct PagePm {
    log: EventLog,
}

impl PresentationModel<Screen> for PagePm {
    fn on_create(&mut self, cx: &mut PmContext<'_, Screen>) -> anyhow::Result<()> {
        cx.on_message::<PagePm, Close>(|_pm, cx, _close| cx.back());
        Ok(())
    }

    fn on_background(&mut self, cx: &mut PmContext<'_, Screen>) -> anyhow::Result<()> {
        self.log.borrow_mut().push(format!("{} on_background", cx.path()));
        Ok(())
    }

    fn on_destroy(&mut self, cx: &mut PmContext<'_, Screen>) -> anyhow::Result<()> {
        self.log.borrow_mut().push(format!("{} on_destroy", cx.path()));
        Ok(())
    }
}

fn stack_delegate(log: &EventLog) -> PmDelegate<Screen> {
    let log = log.clone();
    let factory = move |screen: &Screen| -> Box<dyn PresentationModel<Screen>> {
        match screen {
            Screen::Item { .. } => Box::new(PagePm { log: log.clone() }),
            _ => Box::new(StackPm),
        }
    };
    PmDelegate::new(PmArgs::new(Screen::Root), factory)
}

#[test]
fn test_page_closing_itself_is_torn_down_after_its_handler() {
    let log = event_log();
    let mut delegate = stack_delegate(&log);
    let root = delegate.on_create().unwrap();
    delegate.on_foreground().unwrap();
    let tree = delegate.tree_mut();
    let page = tree.attach_child(root, item("page"), "page").unwrap().unwrap();

    assert!(tree.handle_message(page, &Close));

    assert!(!tree.contains(page));
    assert!(tree.child(root, "page").is_none());
    assert_eq!(tree.len(), 1);
    assert_eq!(hooks(&log, "on_background"), vec!["root/page"]);
    assert_eq!(hooks(&log, "on_destroy"), vec!["root/page"]);

    // The tag is free again
    let next = tree.attach_child(root, item("next"), "page").unwrap().unwrap();
    assert_ne!(next, page);
}
