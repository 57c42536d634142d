// tests/watch_mode.rs

mod common;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use common::*;
use tokio::sync::mpsc;
use treemirror::errors::Result as MirrorResult;
use treemirror::fs::mock::MockFileSystem;
use treemirror::fs::{EntryKind, FileSystem};
use treemirror::watch::{ChangeEvent, ChangeKind, ChangeSource, FsChange};
use treemirror::{Cancellation, ErrorAction, Mirror, MirrorConfig, MirrorError};

const SETTLE: Duration = Duration::from_millis(300);

/// Change source that records subscriptions and can refuse some of them.
#[derive(Clone, Default)]
struct ScriptedSource {
    subscribed: Arc<Mutex<Vec<PathBuf>>>,
    refuse: Option<PathBuf>,
}

impl ScriptedSource {
    fn subscribed(&self) -> Vec<PathBuf> {
        let mut dirs = self.subscribed.lock().unwrap().clone();
        dirs.sort();
        dirs.dedup();
        dirs
    }
}

impl ChangeSource for ScriptedSource {
    fn subscribe(&mut self, dir: &Path) -> MirrorResult<()> {
        if self.refuse.as_deref() == Some(dir) {
            return Err(MirrorError::Watcher(
                notify::Error::generic("subscription refused").add_path(dir.to_path_buf()),
            ));
        }
        self.subscribed.lock().unwrap().push(dir.to_path_buf());
        Ok(())
    }
}

/// Mock filesystem where listing one directory blocks for a while.
#[derive(Debug)]
struct SlowDir {
    inner: MockFileSystem,
    dir: PathBuf,
    delay: Duration,
}

impl FileSystem for SlowDir {
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        if path == self.dir {
            std::thread::sleep(self.delay);
        }
        self.inner.read_dir(path)
    }

    fn stat(&self, path: &Path) -> io::Result<EntryKind> {
        self.inner.stat(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        self.inner.create_dir_all(path)
    }

    fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path)
    }
}

fn mock_mirror(fs: &MockFileSystem, rec: &RecordingTransform) -> MirrorConfig {
    MirrorConfig::new("/in", "/out")
        .include(["**/*.jpg", "**/*.png"])
        .exclude(["temp/**"])
        .debounce(Duration::from_millis(20))
        .transform_with(Arc::new(rec.clone()))
        .filesystem(Arc::new(fs.clone()))
}

fn create(path: &str) -> ChangeEvent {
    Ok(FsChange::new(path, ChangeKind::Create))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn new_file_in_new_directory_is_transformed_once() {
    init_tracing();
    let tree = TreeBuilder::new().file("existing.jpg").build();
    let rec = RecordingTransform::new().writing_output();
    let mirror = Mirror::new(
        config_for(&tree, &["**/*.jpg"], &["temp/**"], &rec).debounce(Duration::from_millis(100)),
    )
    .expect("valid config");

    let cancel = Cancellation::new();
    let handle = tokio::spawn({
        let mirror = mirror.clone();
        let cancel = cancel.clone();
        async move { mirror.watch(&cancel).await }
    });

    tokio::time::sleep(SETTLE).await;
    tree.write("newdir/x.jpg", b"x");
    tree.write("temp/ignored.jpg", b"t");

    assert!(
        wait_until(Duration::from_secs(5), || rec.call_count() >= 1).await,
        "new file was not transformed"
    );
    // Give duplicate deliveries a chance to show up.
    tokio::time::sleep(SETTLE).await;

    cancel.cancel();
    let result = with_timeout(handle).await.expect("watch task");
    assert!(matches!(result, Err(MirrorError::Cancelled)), "{result:?}");

    assert_eq!(rec.inputs_relative_to(&tree.input), vec!["newdir/x.jpg"]);
    assert_eq!(tree.output_files(), vec!["newdir/x.jpg"]);
    assert_eq!(rec.in_flight(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn modified_file_is_transformed_again() {
    init_tracing();
    let tree = TreeBuilder::new().file("photo.jpg").build();
    let rec = RecordingTransform::new();
    let mirror = mirror_for(&tree, &["*.jpg"], &[], &rec);

    let cancel = Cancellation::new();
    let handle = tokio::spawn({
        let mirror = mirror.clone();
        let cancel = cancel.clone();
        async move { mirror.watch(&cancel).await }
    });

    tokio::time::sleep(SETTLE).await;
    assert_eq!(rec.call_count(), 0, "watch does not process existing files");

    tree.write("photo.jpg", b"edited");
    assert!(wait_until(Duration::from_secs(5), || rec.call_count() >= 1).await);

    cancel.cancel();
    let _ = with_timeout(handle).await;
    assert_eq!(rec.inputs_relative_to(&tree.input), vec!["photo.jpg"]);
}

#[tokio::test]
async fn scripted_events_drive_subscriptions_and_tasks() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_dir("/in/old");
    fs.add_dir("/in/temp/deep");
    // Never listed: the excluded directory is pruned, not descended.
    fs.deny_read_dir("/in/temp");

    let rec = RecordingTransform::new();
    let mirror = Mirror::new(mock_mirror(&fs, &rec)).expect("valid config");
    let source = ScriptedSource::default();
    let (tx, rx) = mpsc::unbounded_channel();

    let cancel = Cancellation::new();
    let handle = tokio::spawn({
        let mirror = mirror.clone();
        let cancel = cancel.clone();
        let source = source.clone();
        async move { mirror.watch_with(&cancel, source, rx).await }
    });

    assert!(wait_until(Duration::from_secs(2), || source.subscribed().len() == 2).await);
    assert_eq!(
        source.subscribed(),
        vec![PathBuf::from("/in"), PathBuf::from("/in/old")]
    );

    // A file written in two steps becomes one task.
    fs.add_file("/in/a.jpg");
    tx.send(create("/in/a.jpg")).unwrap();
    tx.send(Ok(FsChange::new("/in/a.jpg", ChangeKind::Modify))).unwrap();

    // A new directory that already holds a file.
    fs.add_file("/in/new/sub/b.png");
    tx.send(create("/in/new")).unwrap();

    // Ignored: removal, rename-away, excluded, unmatched, vanished.
    tx.send(Ok(FsChange::new("/in/old", ChangeKind::Remove))).unwrap();
    tx.send(Ok(FsChange::new("/in/a.jpg", ChangeKind::Rename))).unwrap();
    fs.add_file("/in/temp/c.jpg");
    tx.send(create("/in/temp/c.jpg")).unwrap();
    fs.add_file("/in/notes.txt");
    tx.send(create("/in/notes.txt")).unwrap();
    tx.send(create("/in/gone.jpg")).unwrap();

    assert!(wait_until(Duration::from_secs(2), || rec.call_count() >= 2).await);
    tokio::time::sleep(Duration::from_millis(100)).await;

    cancel.cancel();
    let result = with_timeout(handle).await.expect("watch task");
    assert!(matches!(result, Err(MirrorError::Cancelled)), "{result:?}");

    assert_eq!(
        rec.inputs_relative_to(Path::new("/in")),
        vec!["a.jpg", "new/sub/b.png"]
    );
    assert!(source.subscribed().contains(&PathBuf::from("/in/new/sub")));
    assert!(!source.subscribed().contains(&PathBuf::from("/in/temp")));
    assert!(fs.created_dirs().contains(&PathBuf::from("/out/new/sub")));
}

#[tokio::test]
async fn closed_event_stream_is_a_watcher_error() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_dir("/in");
    let rec = RecordingTransform::new();
    let mirror = Mirror::new(mock_mirror(&fs, &rec)).expect("valid config");

    let (tx, rx) = mpsc::unbounded_channel::<ChangeEvent>();
    drop(tx);

    let err = with_timeout(mirror.watch_with(&Cancellation::new(), ScriptedSource::default(), rx))
        .await
        .expect_err("closed stream");
    assert!(matches!(err, MirrorError::Watcher(_)), "{err:?}");
}

#[tokio::test]
async fn subscription_error_follows_error_callback() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_dir("/in/locked");
    fs.add_dir("/in/open");
    let rec = RecordingTransform::new();
    let source = ScriptedSource {
        refuse: Some(PathBuf::from("/in/locked")),
        ..Default::default()
    };

    // No callback: fatal.
    let strict = Mirror::new(mock_mirror(&fs, &rec)).expect("valid config");
    let (_tx, rx) = mpsc::unbounded_channel();
    let err = with_timeout(strict.watch_with(&Cancellation::new(), source.clone(), rx))
        .await
        .expect_err("refused subscription is fatal");
    assert!(matches!(err, MirrorError::Watcher(_)), "{err:?}");

    // Continue: the rest of the tree is still watched.
    let seen: Arc<Mutex<Vec<PathBuf>>> = Arc::default();
    let log = Arc::clone(&seen);
    let lenient = Mirror::new(mock_mirror(&fs, &rec).on_error(move |path: &Path, _| {
        log.lock().unwrap().push(path.to_path_buf());
        Ok(ErrorAction::Continue)
    }))
    .expect("valid config");

    let source = ScriptedSource {
        refuse: Some(PathBuf::from("/in/locked")),
        ..Default::default()
    };
    let (_tx, rx) = mpsc::unbounded_channel();
    let cancel = Cancellation::with_timeout(Duration::from_millis(200));
    let err = with_timeout(lenient.watch_with(&cancel, source.clone(), rx))
        .await
        .expect_err("ends at deadline");

    assert!(matches!(err, MirrorError::DeadlineExceeded), "{err:?}");
    assert_eq!(*seen.lock().unwrap(), vec![PathBuf::from("/in/locked")]);
    assert!(source.subscribed().contains(&PathBuf::from("/in/open")));
}

#[tokio::test]
async fn stream_error_without_callback_is_fatal() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_dir("/in");
    let rec = RecordingTransform::new();
    let mirror = Mirror::new(mock_mirror(&fs, &rec)).expect("valid config");

    let (tx, rx) = mpsc::unbounded_channel();
    tx.send(Err(notify::Error::generic("queue overflow"))).unwrap();

    let err = with_timeout(mirror.watch_with(&Cancellation::new(), ScriptedSource::default(), rx))
        .await
        .expect_err("stream error is fatal");
    assert!(matches!(err, MirrorError::Watcher(_)), "{err:?}");
    drop(tx);
}

#[tokio::test]
async fn transform_stop_ends_watch() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_dir("/in");
    let rec = RecordingTransform::new().stop_on_call(1);
    let mirror = Mirror::new(mock_mirror(&fs, &rec)).expect("valid config");

    let (tx, rx) = mpsc::unbounded_channel();
    fs.add_file("/in/a.jpg");
    tx.send(create("/in/a.jpg")).unwrap();

    let err = with_timeout(mirror.watch_with(&Cancellation::new(), ScriptedSource::default(), rx))
        .await
        .expect_err("stop is fatal");
    assert!(matches!(err, MirrorError::StoppedByCallback { .. }), "{err:?}");
    drop(tx);
}

#[tokio::test]
async fn directory_attribute_change_does_not_reprocess_its_files() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("/in/a.jpg");
    fs.add_file("/in/old/b.jpg");
    let rec = RecordingTransform::new();
    let mirror = Mirror::new(mock_mirror(&fs, &rec)).expect("valid config");
    let (tx, rx) = mpsc::unbounded_channel();

    let cancel = Cancellation::new();
    let handle = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            mirror
                .watch_with(&cancel, ScriptedSource::default(), rx)
                .await
        }
    });

    // chmod/touch on watched directories, root included.
    tx.send(Ok(FsChange::new("/in/old", ChangeKind::Modify))).unwrap();
    tx.send(Ok(FsChange::new("/in", ChangeKind::Modify))).unwrap();
    // A directory removed and recreated is new again.
    tx.send(Ok(FsChange::new("/in/old", ChangeKind::Remove))).unwrap();
    tx.send(create("/in/old")).unwrap();
    fs.add_file("/in/c.jpg");
    tx.send(create("/in/c.jpg")).unwrap();

    assert!(wait_until(Duration::from_secs(2), || rec.call_count() >= 2).await);
    tokio::time::sleep(Duration::from_millis(100)).await;

    cancel.cancel();
    let result = with_timeout(handle).await.expect("watch task");
    assert!(matches!(result, Err(MirrorError::Cancelled)), "{result:?}");
    assert_eq!(
        rec.inputs_relative_to(Path::new("/in")),
        vec!["c.jpg", "old/b.jpg"]
    );
}

#[tokio::test]
async fn buffered_events_join_the_batch_being_flushed() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("/in/a.jpg");
    let rec = RecordingTransform::new();
    let mirror = Mirror::new(mock_mirror(&fs, &rec).debounce(Duration::from_millis(1)))
        .expect("valid config");

    // A burst already waiting when the watch starts, long enough to outlast
    // the flush cap while it is being triaged.
    let (tx, rx) = mpsc::unbounded_channel();
    tx.send(create("/in/a.jpg")).unwrap();
    for _ in 0..200 {
        tx.send(Ok(FsChange::new("/in/a.jpg", ChangeKind::Modify))).unwrap();
    }

    let cancel = Cancellation::new();
    let handle = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            mirror
                .watch_with(&cancel, ScriptedSource::default(), rx)
                .await
        }
    });

    assert!(wait_until(Duration::from_secs(2), || rec.call_count() >= 1).await);
    tokio::time::sleep(Duration::from_millis(100)).await;

    cancel.cancel();
    let _ = with_timeout(handle).await;
    drop(tx);
    assert_eq!(rec.inputs_relative_to(Path::new("/in")), vec!["a.jpg"]);
}

#[tokio::test]
async fn scanning_a_new_directory_does_not_stall_the_runtime() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_dir("/in");
    let slow = SlowDir {
        inner: fs.clone(),
        dir: PathBuf::from("/in/big"),
        delay: Duration::from_millis(400),
    };
    let rec = RecordingTransform::new();
    let mirror = Mirror::new(mock_mirror(&fs, &rec).filesystem(Arc::new(slow)))
        .expect("valid config");
    let source = ScriptedSource::default();
    let (tx, rx) = mpsc::unbounded_channel();

    let cancel = Cancellation::new();
    let handle = tokio::spawn({
        let cancel = cancel.clone();
        let source = source.clone();
        async move { mirror.watch_with(&cancel, source, rx).await }
    });
    assert!(wait_until(Duration::from_secs(2), || !source.subscribed().is_empty()).await);
    // Let the initial scan of the root finish first.
    tokio::time::sleep(Duration::from_millis(100)).await;

    fs.add_file("/in/big/a.jpg");
    tx.send(create("/in/big")).unwrap();

    // This test runs on a single-threaded runtime: these timers only fire on
    // time if the listing happens off it.
    let started = Instant::now();
    for _ in 0..10 {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(
        started.elapsed() < Duration::from_millis(380),
        "runtime stalled for {:?}",
        started.elapsed()
    );

    assert!(wait_until(Duration::from_secs(2), || rec.call_count() >= 1).await);
    cancel.cancel();
    let result = with_timeout(handle).await.expect("watch task");
    assert!(matches!(result, Err(MirrorError::Cancelled)), "{result:?}");
    assert_eq!(rec.inputs_relative_to(Path::new("/in")), vec!["big/a.jpg"]);
}
