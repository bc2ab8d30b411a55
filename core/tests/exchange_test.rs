//! Backup export, shared export and import.

mod helpers;

use std::sync::Arc;

use gs_core::exchange::SHARED_FILE_NAME;
use gs_core::local::{KeyValueStore, MemoryKeyValueStore, SNAPSHOT_KEY};
use gs_core::remote::{MemoryDocumentStore, RemoteSnapshotStore};
use gs_core::{normalize, ImportError, SyncEngine};
use helpers::*;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tracing_test::traced_test;

fn sample() -> Value {
	json!({
		"students": [{ "id": "s1", "name": "Ada" }],
		"courses": [{ "id": "c1", "title": "Algebra" }],
		"enrollments": [{ "studentId": "s1", "courseId": "c1" }],
		"grades": { "s1_c1": { "quiz": [45, 48], "exam": 91 } },
		"groups": [{ "id": "g1" }],
		"weights": { "written": 50, "quiz": 50 },
		"_lastModified": "2024-03-01T09:30:00.000Z",
	})
}

#[tokio::test]
async fn backup_then_import_round_trips() {
	let source = Harness::builder().without_remote().local(sample()).start().await;
	let backup = source.engine.export_backup().await.unwrap();
	assert_eq!(backup.file_name, "student_grade_tracker_backup_2024-06-01.json");

	let target = Harness::builder().without_remote().start().await;
	let imported = target.engine.import(&backup.contents).await.unwrap();

	assert_eq!(imported, normalize(&sample()));
	assert_eq!(target.local_snapshot().await, Some(imported));
}

#[tokio::test]
async fn backup_files_can_be_written_and_imported_from_disk() {
	let tmp = tempfile::tempdir().unwrap();
	let source = Harness::builder().without_remote().local(sample()).start().await;

	let path = source
		.engine
		.export_backup()
		.await
		.unwrap()
		.write_to(tmp.path())
		.await
		.unwrap();

	let target = Harness::builder().without_remote().start().await;
	let imported = target.engine.import_file(&path).await.unwrap();
	assert_eq!(student_ids(&imported), vec!["s1"]);

	let missing = target.engine.import_file(&tmp.path().join("nope.json")).await;
	assert!(matches!(missing, Err(ImportError::Io(_))));
}

#[tokio::test]
async fn invalid_import_leaves_local_untouched() {
	let harness = Harness::builder().without_remote().local(sample()).start().await;
	let before = harness.local_text().await;

	for contents in ["{}", "not json at all", r#"{"students": []}"#] {
		assert!(harness.engine.import(contents).await.is_err(), "{contents}");
	}

	assert!(matches!(
		harness.engine.import("{}").await,
		Err(ImportError::InvalidFile)
	));
	assert_eq!(harness.local_text().await, before);
}

#[tokio::test]
async fn import_in_remote_mode_pushes() {
	let harness = Harness::builder().start().await;

	let imported = harness
		.engine
		.import(&sample().to_string())
		.await
		.unwrap();

	assert_eq!(harness.remote_writes(), 1);
	let remote = harness.remote_snapshot().await.unwrap();
	assert_eq!(remote.students, imported.students);
	assert_eq!(remote.last_modified, imported.last_modified);
}

#[tokio::test]
async fn shared_export_is_a_usable_shared_data_file() {
	let harness = Harness::builder().without_remote().local(sample()).start().await;

	let shared = harness.engine.export_shared().await.unwrap();
	assert_eq!(shared.file_name, SHARED_FILE_NAME);

	let value: Value = serde_json::from_str(&shared.contents).unwrap();
	assert!(value.get("groups").is_none());
	assert_eq!(value["_lastModified"], json!("2024-06-01T12:00:00.000Z"));
	assert_eq!(value["grades"], sample()["grades"]);

	// a fresh install picks it up through the fallback path
	let student = Harness::builder().without_remote().shared(value).start().await;
	assert_eq!(student_ids(&student.engine.load().await), vec!["s1"]);
}

#[tokio::test]
#[traced_test]
async fn full_local_storage_does_not_block_import() {
	let kv = Arc::new(MemoryKeyValueStore::with_quota(64));
	let remote = Arc::new(MemoryDocumentStore::new());
	let engine = SyncEngine::builder(kv.clone()).remote(remote.clone()).build();
	engine.init().await;

	let imported = engine
		.import(r#"{"courses": [], "students": [{"id": "s1"}]}"#)
		.await
		.unwrap();

	assert_eq!(student_ids(&imported), vec!["s1"]);
	assert_eq!(kv.get(SNAPSHOT_KEY).await.unwrap(), None);
	assert!(logs_contain("Failed to write imported snapshot locally"));

	let pushed = RemoteSnapshotStore::new(remote).read_all().await.unwrap().unwrap();
	assert_eq!(student_ids(&normalize(&pushed)), vec!["s1"]);
}
