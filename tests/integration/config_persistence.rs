//! Config-driven persistence to a snapshot file

use super::test_utils::*;
use premo::{ConfigLoader, PersistenceConfig, PmArgs, PmDelegate, PmError, PremoConfig};
use tempfile::TempDir;

fn file_config(dir: &TempDir) -> PremoConfig {
    PremoConfig {
        persistence: PersistenceConfig {
            snapshot_path: Some(dir.path().join("state").join("snapshot.json")),
            pretty: true,
            ..PersistenceConfig::default()
        },
        ..PremoConfig::default()
    }
}

fn file_delegate(log: &EventLog, config: &PremoConfig) -> PmDelegate<Screen> {
    PmDelegate::from_config(
        PmArgs::new(Screen::Home),
        screen_factory(log.clone()),
        config,
    )
    .unwrap()
}

#[test]
fn test_tree_survives_process_restart_via_file() {
    let dir = TempDir::new().unwrap();
    let config = file_config(&dir);

    let mut first = file_delegate(&event_log(), &config);
    let root = first.on_create().unwrap();
    let tree = first.tree_mut();
    let counter = tree.child(root, "counter").unwrap();
    tree.model_mut::<CounterPm>(counter).unwrap().count = 3;
    first.on_save();
    first.on_destroy().unwrap();

    let path = config.persistence.snapshot_path().unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    // Pretty output spans several lines
    assert!(text.lines().count() > 1);
    assert!(!path.with_extension("json.tmp").exists());

    let mut second = file_delegate(&event_log(), &config);
    let root = second.on_create().unwrap();
    let tree = second.tree();
    let counter = tree.child(root, "counter").unwrap();
    assert_eq!(tree.model::<CounterPm>(counter).unwrap().count, 3);
}

#[test]
fn test_save_overwrites_previous_snapshot() {
    let dir = TempDir::new().unwrap();
    let config = file_config(&dir);

    let mut delegate = file_delegate(&event_log(), &config);
    let root = delegate.on_create().unwrap();
    delegate.on_save();
    delegate
        .tree_mut()
        .attach_child(root, item("extra"), "extra")
        .unwrap();
    delegate.on_save();

    let mut restored = file_delegate(&event_log(), &config);
    let root = restored.on_create().unwrap();
    assert!(restored.tree().child(root, "extra").is_some());
}

#[test]
fn test_disabled_persistence_from_project_file() {
    let project = TempDir::new().unwrap();
    std::fs::write(
        project.path().join("premo.toml"),
        "[persistence]\nenabled = false\n",
    )
    .unwrap();
    let config = ConfigLoader::new()
        .with_global_path(None)
        .with_env_prefix("PREMO_IT_DISABLED")
        .load(project.path())
        .unwrap();
    assert!(!config.persistence.enabled);

    let mut delegate = file_delegate(&event_log(), &config);
    delegate.on_create().unwrap();
    delegate.on_save();
    assert!(delegate.storage().read().unwrap().is_none());
}

#[test]
fn test_unwritable_snapshot_path_is_reported() {
    let dir = TempDir::new().unwrap();
    let config = file_config(&dir);

    let errors = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
    let sink = errors.clone();
    let mut delegate = file_delegate(&event_log(), &config)
        .with_error_handler(move |error: &PmError| sink.borrow_mut().push(error.is_recoverable()));
    delegate.on_create().unwrap();
    assert!(errors.borrow().is_empty());

    // A regular file where the snapshot directory should be
    std::fs::write(dir.path().join("state"), b"").unwrap();
    delegate.on_save();

    assert_eq!(*errors.borrow(), vec![true]);
    // The live tree is untouched
    assert_eq!(delegate.tree().len(), 2);
}
