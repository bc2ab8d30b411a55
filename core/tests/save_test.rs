//! `save` and debounced `quick_save`.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use gs_core::snapshot::format_timestamp;
use gs_core::local::MemoryKeyValueStore;
use gs_core::{PushSchedule, RemoteOutcome, SaveOutcome, StorageMode, SyncEngine};
use helpers::*;
use pretty_assertions::assert_eq;
use serde_json::json;

#[tokio::test]
async fn save_stamps_persists_and_pushes() {
	let harness = Harness::builder()
		.local(json!({ "students": [{ "id": "s1" }], "_lastModified": "2024-01-01T00:00:00Z" }))
		.start()
		.await;
	let mut snapshot = harness.engine.load().await;
	snapshot.students.push(json!({ "id": "s2" }));
	harness.clock.advance(ChronoDuration::seconds(30));

	let outcome = harness.engine.save(snapshot).await;

	let now = start_time() + ChronoDuration::seconds(30);
	assert!(outcome.persisted);
	assert_eq!(outcome.remote, RemoteOutcome::Pushed);
	assert_eq!(outcome.snapshot.last_modified, now);

	assert_eq!(harness.local_snapshot().await, Some(outcome.snapshot.clone()));
	let remote = harness.remote_snapshot().await.unwrap();
	assert_eq!(student_ids(&remote), vec!["s1", "s2"]);
	assert_eq!(remote.last_modified, now);

	assert_eq!(harness.last_sync_slot().await, Some(format_timestamp(now)));
	assert_eq!(harness.engine.status().last_sync, Some(now));
}

#[tokio::test]
async fn save_in_local_mode_stays_local() {
	let harness = Harness::builder().offline().start().await;
	assert_eq!(harness.engine.mode(), StorageMode::Local);

	let mut snapshot = harness.engine.load().await;
	snapshot.students.push(json!({ "id": "s1" }));
	let outcome = harness.engine.save(snapshot).await;

	assert_eq!(outcome.remote, RemoteOutcome::Skipped);
	assert_eq!(harness.remote_writes(), 0);
	assert_eq!(harness.last_sync_slot().await, None);
	assert_eq!(student_ids(&harness.local_snapshot().await.unwrap()), vec!["s1"]);
}

#[tokio::test]
async fn failing_remote_write_never_fails_save() {
	let harness = Harness::builder().start().await;
	harness.remote.fail_adds_to("students");

	let mut snapshot = harness.engine.load().await;
	snapshot.students.push(json!({ "id": "s1" }));
	let outcome = harness.engine.save(snapshot).await;

	assert!(matches!(outcome.remote, RemoteOutcome::Failed(_)));
	assert!(outcome.persisted);
	assert_eq!(student_ids(&harness.local_snapshot().await.unwrap()), vec!["s1"]);
	assert_eq!(harness.last_sync_slot().await, None);
	assert!(!harness.engine.status().sync_in_progress);
}

#[tokio::test(start_paused = true)]
async fn quick_save_burst_pushes_once_after_quiet_window() {
	let harness = Harness::builder().start().await;
	let mut snapshot = harness.engine.load().await;

	for i in 0..5 {
		snapshot.students.push(json!({ "id": format!("s{i}") }));
		harness.clock.advance(ChronoDuration::milliseconds(300));

		let outcome = harness.engine.quick_save(snapshot.clone()).await;

		assert_eq!(outcome.push, PushSchedule::Scheduled);
		assert!(outcome.persisted);
		assert_eq!(harness.local_snapshot().await, Some(outcome.snapshot));
		tokio::time::sleep(Duration::from_millis(300)).await;
	}
	assert_eq!(harness.remote_writes(), 0);

	// 300ms already elapsed since the last call
	tokio::time::sleep(DEBOUNCE - Duration::from_millis(301)).await;
	assert_eq!(harness.remote_writes(), 0);
	assert!(harness.engine.has_pending_push());

	tokio::time::sleep(Duration::from_millis(2)).await;
	assert_eq!(harness.remote_writes(), 1);

	let remote = harness.remote_snapshot().await.unwrap();
	assert_eq!(student_ids(&remote), vec!["s0", "s1", "s2", "s3", "s4"]);
	assert_eq!(remote.last_modified, start_time() + ChronoDuration::milliseconds(1500));

	tokio::time::sleep(DEBOUNCE * 3).await;
	assert_eq!(harness.remote_writes(), 1);
}

#[tokio::test(start_paused = true)]
async fn quick_save_offline_schedules_nothing() {
	let harness = Harness::builder().offline().start().await;
	let snapshot = harness.engine.load().await;

	let outcome = harness.engine.quick_save(snapshot).await;

	assert_eq!(outcome.push, PushSchedule::SkippedLocalMode);
	assert!(!harness.engine.has_pending_push());
	assert!(harness.local_snapshot().await.is_some());

	tokio::time::sleep(DEBOUNCE * 2).await;
	assert_eq!(harness.remote_writes(), 0);
}

#[tokio::test(start_paused = true)]
async fn flush_pending_waits_for_push() {
	let harness = Harness::builder().start().await;
	let mut snapshot = harness.engine.load().await;
	snapshot.students.push(json!({ "id": "s1" }));

	harness.engine.quick_save(snapshot).await;
	harness.engine.flush_pending().await;

	assert_eq!(harness.remote_writes(), 1);
	assert!(harness.last_sync_slot().await.is_some());
}

#[tokio::test(start_paused = true)]
async fn going_offline_before_window_drops_push() {
	let harness = Harness::builder().start().await;
	let snapshot = harness.engine.load().await;

	harness.engine.quick_save(snapshot).await;
	harness.engine.set_online(false).await;
	harness.engine.flush_pending().await;

	assert_eq!(harness.remote_writes(), 0);
}

/// Engine whose next full remote write is parked at the settings step
async fn engine_with_write_in_flight() -> (
	Arc<SyncEngine>,
	Arc<GatedDocumentStore>,
	tokio::task::JoinHandle<SaveOutcome>,
) {
	let store = Arc::new(GatedDocumentStore::new());
	let engine = SyncEngine::builder(Arc::new(MemoryKeyValueStore::new()))
		.remote(store.clone())
		.debounce(DEBOUNCE)
		.build();
	engine.init().await;

	let mut snapshot = engine.load().await;
	snapshot.students.push(json!({ "id": "s1" }));
	let saving = tokio::spawn({
		let engine = engine.clone();
		async move { engine.save(snapshot).await }
	});
	store.entered().await;

	(engine, store, saving)
}

#[tokio::test]
async fn status_reports_write_in_progress() {
	let (engine, store, saving) = engine_with_write_in_flight().await;

	assert!(engine.status().sync_in_progress);

	store.release();
	assert_eq!(saving.await.unwrap().remote, RemoteOutcome::Pushed);
	assert!(!engine.status().sync_in_progress);
}

#[tokio::test]
async fn quick_save_during_remote_write_schedules_nothing() {
	let (engine, store, saving) = engine_with_write_in_flight().await;
	let snapshot = engine.load().await;

	let outcome = engine.quick_save(snapshot).await;

	assert_eq!(outcome.push, PushSchedule::SkippedSyncInProgress);
	assert!(outcome.persisted);
	assert!(!engine.has_pending_push());

	store.release();
	saving.await.unwrap();
	assert!(!engine.has_pending_push());
}
