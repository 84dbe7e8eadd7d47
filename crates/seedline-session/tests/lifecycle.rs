use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use seedline_events::{EventEnvelope, EventListener, EventStream};
use seedline_session::{SessionError, SessionLifecycle, SessionParams, SessionRegistry, TorrentSession};
use seedline_test_support::fixtures::{MetainfoFixture, TempLayout, finished_status, progress_status};
use seedline_test_support::mocks::{EngineCall, FakeEngine};
use seedline_torrent_core::{AlertCategory, FileEntry, TorrentAlert};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use tokio_stream::StreamExt;

const WAIT: Duration = Duration::from_secs(1);

async fn next_kind(stream: &mut EventStream) -> &'static str {
    timeout(WAIT, stream.next())
        .await
        .expect("event timed out")
        .expect("stream closed")
        .event
        .kind()
}

const SETTLE: Duration = Duration::from_millis(50);

fn registry(engine: &Arc<FakeEngine>) -> SessionRegistry {
    SessionRegistry::new(engine.clone(), Handle::current())
}

/// Registered, started and finished session with its `.torrent`,
/// fast-resume and data files on disk. Returns the session and the
/// original `.torrent` path.
async fn seeding_session(
    layout: &TempLayout,
    engine: &Arc<FakeEngine>,
    name: &str,
) -> anyhow::Result<(Arc<TorrentSession>, PathBuf)> {
    let folders = layout.folders();
    let torrent = MetainfoFixture::single_file(name, 4).write_to(&folders.download_dir)?;
    fs::write(folders.download_path(name, ".fastresume"), b"resume")?;
    fs::write(folders.download_dir.join(name), b"data")?;

    let registry = registry(engine);
    let session = registry.create_session(SessionParams::from_torrent_file(&torrent))?;
    registry.register(&session).await?;
    session.start().await?;
    assert!(engine.push_status(&session.info_hash(), finished_status(4)));
    Ok((session, torrent))
}

#[tokio::test]
async fn torrent_file_session_runs_full_lifecycle() -> anyhow::Result<()> {
    let layout = TempLayout::new()?;
    let engine = Arc::new(FakeEngine::new(layout.folders()));
    let registry = registry(&engine);
    let fixture = MetainfoFixture::single_file("a.bin", 100).private(false);
    let torrent = fixture.write_to(&layout.folders().download_dir)?;

    let session = registry.create_session(SessionParams::from_torrent_file(&torrent))?;
    let (_, mut events) = session.subscribe();
    registry.register(&session).await?;
    session.start().await?;

    assert_eq!(session.info_hash(), fixture.info_hash());
    assert_eq!(session.tracker_url(), Some(MetainfoFixture::DEFAULT_TRACKER));
    assert!(!session.is_private());
    assert!(session.has_meta_data());
    assert_eq!(session.torrent_file(), torrent);

    assert!(engine.push_status(&fixture.info_hash(), progress_status(40, 100)));
    assert!(engine.push_status(&fixture.info_hash(), finished_status(100)));
    assert!(engine.push_alert(
        &fixture.info_hash(),
        TorrentAlert::new(AlertCategory::SaveResumeData)
    ));

    assert_eq!(next_kind(&mut events).await, "started");
    assert_eq!(next_kind(&mut events).await, "status_changed");
    assert_eq!(next_kind(&mut events).await, "completed");
    assert_eq!(next_kind(&mut events).await, "fast_resume_file_saved");

    let removed = registry.unregister(&fixture.info_hash()).await?;
    assert!(removed.is_some());
    assert_eq!(next_kind(&mut events).await, "stopped");
    assert_eq!(session.lifecycle(), SessionLifecycle::Stopped);
    assert!(engine.registration(&fixture.info_hash()).is_none());
    assert_eq!(
        engine.calls().first(),
        Some(&EngineCall::Register(fixture.info_hash()))
    );
    Ok(())
}

#[tokio::test]
async fn move_to_relocates_data_and_companions() -> anyhow::Result<()> {
    let layout = TempLayout::new()?;
    let folders = layout.folders();
    let engine = Arc::new(FakeEngine::new(folders.clone()));
    let registry = registry(&engine);
    let fixture = MetainfoFixture::single_file("clip.mkv", 4);
    let torrent = fixture.write_to(&folders.download_dir)?;
    let fast_resume = folders.download_path("clip.mkv", ".fastresume");
    fs::write(&fast_resume, b"resume")?;
    fs::write(folders.download_dir.join("clip.mkv"), b"data")?;

    let session = registry.create_session(SessionParams::from_torrent_file(&torrent))?;
    registry.register(&session).await?;
    session.start().await?;
    engine.push_status(&session.info_hash(), finished_status(4));

    let target = layout.root().join("library");
    session.move_to(&target).await?;

    assert_eq!(session.data_path(), target.join("clip.mkv"));
    assert_eq!(fs::read(target.join("clip.mkv"))?, b"data");
    assert_eq!(session.torrent_file(), folders.uploads_dir.join("clip.mkv.torrent"));
    assert_eq!(
        session.fast_resume_file(),
        folders.uploads_dir.join("clip.mkv.fastresume")
    );
    assert!(session.torrent_file().is_file());
    assert!(session.fast_resume_file().is_file());
    assert!(!torrent.exists());
    assert!(!fast_resume.exists());
    assert!(!folders.download_dir.join("clip.mkv").exists());
    Ok(())
}

#[tokio::test]
async fn move_failure_in_engine_leaves_bindings_untouched() -> anyhow::Result<()> {
    let layout = TempLayout::new()?;
    let engine = Arc::new(FakeEngine::new(layout.folders()));
    let session = registry(&engine).create_session(
        SessionParams::default()
            .with_name("show")
            .with_info_hash("cccccccccccccccccccccccccccccccccccccccc"),
    )?;
    session.update_status(finished_status(1));
    let before = session.data_path();

    engine.fail_next("move_torrent");
    let err = session
        .move_to(&layout.root().join("library"))
        .await
        .expect_err("engine refuses");
    assert!(matches!(
        err,
        SessionError::Engine {
            operation: "move_torrent",
            ..
        }
    ));
    assert_eq!(session.data_path(), before);
    Ok(())
}

#[tokio::test]
async fn external_torrent_file_is_copied_on_registration() -> anyhow::Result<()> {
    let layout = TempLayout::new()?;
    let folders = layout.folders();
    let engine = Arc::new(FakeEngine::new(folders.clone()));
    let registry = registry(&engine);
    let external = MetainfoFixture::single_file("iso", 9).write_to(&layout.root().join("inbox"))?;

    let session = registry.create_session(SessionParams::from_torrent_file(&external))?;
    registry.register(&session).await?;

    let managed = folders.download_path("iso", ".torrent");
    assert_eq!(session.torrent_file(), managed);
    assert!(managed.is_file());
    assert!(external.is_file());
    let registration = engine
        .registration(&session.info_hash())
        .expect("registered");
    assert_eq!(registration.torrent_file, managed);
    Ok(())
}

#[tokio::test]
async fn init_files_creates_placeholders_for_engine_entries() -> anyhow::Result<()> {
    let layout = TempLayout::new()?;
    let folders = layout.folders();
    let engine = Arc::new(FakeEngine::new(folders.clone()));
    engine.set_file_entries(vec![
        FileEntry::new(0, "album/cd1/01.flac", 7),
        FileEntry::new(1, "album/cover.jpg", 3),
        FileEntry::new(2, "../escape.bin", 1),
    ]);
    let session = registry(&engine).create_session(
        SessionParams::default()
            .with_name("album")
            .with_info_hash("dddddddddddddddddddddddddddddddddddddddd"),
    )?;
    fs::create_dir_all(folders.download_dir.join("album"))?;
    fs::write(folders.download_dir.join("album/cover.jpg"), b"jpg")?;

    let report = session.init_files().await?;

    assert_eq!((report.created, report.existing, report.failed), (1, 1, 1));
    assert!(folders.download_dir.join("album/cd1/01.flac").is_file());
    assert_eq!(fs::read(folders.download_dir.join("album/cover.jpg"))?, b"jpg");
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_snapshots_complete_exactly_once() -> anyhow::Result<()> {
    let layout = TempLayout::new()?;
    let engine = Arc::new(FakeEngine::new(layout.folders()));
    let session = registry(&engine).create_session(
        SessionParams::default()
            .with_name("race")
            .with_info_hash("eeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee"),
    )?;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let listener: Arc<dyn EventListener> = Arc::new(move |envelope: &EventEnvelope| {
        let _ = tx.send(envelope.event.kind());
    });
    session.add_listener(listener);

    let mut tasks = Vec::new();
    for worker in 0..8_u64 {
        let session: Arc<TorrentSession> = Arc::clone(&session);
        tasks.push(tokio::spawn(async move {
            for step in 0..25 {
                if (worker + step) % 10 == 0 {
                    session.update_status(finished_status(100));
                } else {
                    session.update_status(progress_status(step, 100));
                }
            }
        }));
    }
    for task in tasks {
        task.await?;
    }

    let mut completed = 0;
    for _ in 0..200 {
        let kind = timeout(WAIT, rx.recv()).await?.expect("listener alive");
        if kind == "completed" {
            completed += 1;
        }
    }
    assert_eq!(completed, 1);
    assert!(session.is_complete());
    Ok(())
}

#[tokio::test]
async fn stopped_sessions_are_pruned_and_reregistrable() -> anyhow::Result<()> {
    let layout = TempLayout::new()?;
    let engine = Arc::new(FakeEngine::new(layout.folders()));
    let registry = registry(&engine);
    let params = SessionParams::default()
        .with_name("again")
        .with_info_hash("ffffffffffffffffffffffffffffffffffffffff");

    let first = registry.create_session(params.clone())?;
    registry.register(&first).await?;
    first.start().await?;
    first.stop().await?;
    assert!(matches!(first.pause().await, Err(SessionError::Cancelled { .. })));
    assert_eq!(registry.prune_cancelled(), 1);

    let second = registry.create_session(params)?;
    registry.register(&second).await?;
    assert_eq!(registry.len(), 1);
    assert_eq!(engine.registration_count(), 1);
    Ok(())
}

#[tokio::test]
async fn stop_during_start_takes_effect_after_resume() -> anyhow::Result<()> {
    let layout = TempLayout::new()?;
    let engine = Arc::new(FakeEngine::new(layout.folders()));
    let session = registry(&engine).create_session(
        SessionParams::default()
            .with_name("gated")
            .with_info_hash("1111111111111111111111111111111111111111"),
    )?;
    let hash = session.info_hash();
    let (_, mut events) = session.subscribe();
    let gate = engine.hold("resume_torrent");

    let starting = tokio::spawn({
        let session = Arc::clone(&session);
        async move { session.start().await }
    });
    gate.entered().await;
    let stopping = tokio::spawn({
        let session = Arc::clone(&session);
        async move { session.stop().await }
    });
    sleep(SETTLE).await;
    assert!(!stopping.is_finished());
    assert!(!session.is_cancelled());

    gate.open();
    starting.await??;
    stopping.await??;

    assert_eq!(next_kind(&mut events).await, "started");
    assert_eq!(next_kind(&mut events).await, "stopped");
    assert_eq!(
        engine.calls(),
        vec![EngineCall::Resume(hash), EngineCall::Remove(hash)]
    );
    assert_eq!(session.lifecycle(), SessionLifecycle::Stopped);
    Ok(())
}

#[tokio::test]
async fn transitions_queued_behind_stop_are_cancelled() -> anyhow::Result<()> {
    let layout = TempLayout::new()?;
    let folders = layout.folders();
    let engine = Arc::new(FakeEngine::new(folders.clone()));
    let (session, torrent) = seeding_session(&layout, &engine, "track.flac").await?;
    let target = layout.root().join("library");
    let gate = engine.hold("remove_torrent");

    let stopping = tokio::spawn({
        let session = Arc::clone(&session);
        async move { session.stop().await }
    });
    gate.entered().await;
    let moving = tokio::spawn({
        let session = Arc::clone(&session);
        let target = target.clone();
        async move { session.move_to(&target).await }
    });
    let restarting = tokio::spawn({
        let session = Arc::clone(&session);
        async move { session.start().await }
    });
    sleep(SETTLE).await;
    assert!(!moving.is_finished());
    assert!(!restarting.is_finished());

    gate.open();
    stopping.await??;
    assert!(matches!(moving.await?, Err(SessionError::Cancelled { .. })));
    assert!(matches!(restarting.await?, Err(SessionError::Cancelled { .. })));

    assert_eq!(engine.count(|call| matches!(call, EngineCall::Move(..))), 0);
    assert_eq!(engine.count(|call| matches!(call, EngineCall::Resume(_))), 1);
    assert_eq!(session.torrent_file(), torrent);
    assert!(torrent.is_file());
    assert!(folders.download_dir.join("track.flac").is_file());
    assert!(!target.exists());
    Ok(())
}

#[tokio::test]
async fn stop_during_move_waits_for_relocation() -> anyhow::Result<()> {
    let layout = TempLayout::new()?;
    let folders = layout.folders();
    let engine = Arc::new(FakeEngine::new(folders.clone()));
    let (session, torrent) = seeding_session(&layout, &engine, "film.mkv").await?;
    let hash = session.info_hash();
    let target = layout.root().join("library");
    let gate = engine.hold("move_torrent");

    let moving = tokio::spawn({
        let session = Arc::clone(&session);
        let target = target.clone();
        async move { session.move_to(&target).await }
    });
    gate.entered().await;
    let stopping = tokio::spawn({
        let session = Arc::clone(&session);
        async move { session.stop().await }
    });
    sleep(SETTLE).await;
    assert!(!stopping.is_finished());
    assert!(!session.is_cancelled());

    gate.open();
    moving.await??;
    stopping.await??;

    assert!(session.is_cancelled());
    assert_eq!(session.data_path(), target.join("film.mkv"));
    assert_eq!(session.torrent_file(), folders.uploads_dir.join("film.mkv.torrent"));
    assert!(session.torrent_file().is_file());
    assert!(!torrent.exists());
    let calls = engine.calls();
    assert_eq!(
        calls[calls.len() - 2..],
        [EngineCall::Move(hash, target), EngineCall::Remove(hash)]
    );
    Ok(())
}
