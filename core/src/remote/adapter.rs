use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use serde_json::{json, Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{DocumentStore, RemoteError};
use crate::snapshot::{
	format_timestamp, Snapshot, GRADES, GRADING_SCALE, HPS, LAST_MODIFIED,
	SEQUENCE_COLLECTIONS, WEIGHTS,
};

pub const SETTINGS_COLLECTION: &str = "settings";
pub const GRADES_COLLECTION: &str = GRADES;

/// Settings document carrying the snapshot's modification time
pub const META_SETTING: &str = "meta";

/// Field of a grade document holding its key in the `grades` mapping
const GRADE_KEY_FIELD: &str = "id";

/// Field of the `gradingScale` settings document wrapping the band list
const SCALE_FIELD: &str = "scale";

/// Maps snapshots onto a [`DocumentStore`].
///
/// Writes replace remote contents wholesale: every existing document of a
/// collection is deleted, then every record of the snapshot is inserted. This
/// is not atomic, a failure part way leaves the remote in whatever state the
/// completed steps produced.
pub struct RemoteSnapshotStore {
	backend: Arc<dyn DocumentStore>,
	write_lock: Mutex<()>,
	writers: AtomicUsize,
}

/// Keeps the writer count raised for as long as it lives
struct WriteGuard<'a>(&'a AtomicUsize);

impl<'a> WriteGuard<'a> {
	fn enter(writers: &'a AtomicUsize) -> Self {
		writers.fetch_add(1, Ordering::SeqCst);
		Self(writers)
	}
}

impl Drop for WriteGuard<'_> {
	fn drop(&mut self) {
		self.0.fetch_sub(1, Ordering::SeqCst);
	}
}

impl RemoteSnapshotStore {
	pub fn new(backend: Arc<dyn DocumentStore>) -> Self {
		Self {
			backend,
			write_lock: Mutex::new(()),
			writers: AtomicUsize::new(0),
		}
	}

	pub fn backend(&self) -> &Arc<dyn DocumentStore> {
		&self.backend
	}

	pub async fn initialize(&self) -> Result<(), RemoteError> {
		self.backend.initialize().await
	}

	/// Whether a [`write_all`](Self::write_all) is running or waiting to run
	pub fn is_syncing(&self) -> bool {
		self.writers.load(Ordering::SeqCst) > 0
	}

	/// Assemble a raw snapshot from the remote contents.
	///
	/// Returns `Ok(None)` when the remote holds nothing at all. The result is
	/// not normalized.
	pub async fn read_all(&self) -> Result<Option<Value>, RemoteError> {
		let mut out = Map::new();
		let mut found = false;

		for name in SEQUENCE_COLLECTIONS {
			let docs = self.backend.list(name).await?;
			found |= !docs.is_empty();
			out.insert(
				name.to_string(),
				Value::Array(docs.into_iter().map(|doc| Value::Object(doc.data)).collect()),
			);
		}

		let mut grades = Map::new();
		for doc in self.backend.list(GRADES_COLLECTION).await? {
			found = true;
			let mut data = doc.data;
			let key = match data.remove(GRADE_KEY_FIELD) {
				Some(Value::String(key)) => key,
				Some(Value::Number(key)) => key.to_string(),
				_ => {
					warn!(document = %doc.id, "Skipping grade document without an id");
					continue;
				}
			};
			grades.insert(key, Value::Object(data));
		}
		out.insert(GRADES.to_string(), Value::Object(grades));

		for key in [HPS, WEIGHTS] {
			if let Some(data) = self.backend.get_setting(key).await? {
				found = true;
				out.insert(key.to_string(), Value::Object(data));
			}
		}

		if let Some(mut data) = self.backend.get_setting(GRADING_SCALE).await? {
			found = true;
			if let Some(scale) = data.remove(SCALE_FIELD) {
				out.insert(GRADING_SCALE.to_string(), scale);
			}
		}

		if let Some(mut data) = self.backend.get_setting(META_SETTING).await? {
			found = true;
			if let Some(at) = data.remove(LAST_MODIFIED) {
				out.insert(LAST_MODIFIED.to_string(), at);
			}
		}

		if !found {
			debug!("Remote store is empty");
			return Ok(None);
		}

		Ok(Some(Value::Object(out)))
	}

	/// Replace the remote contents with `snapshot`.
	///
	/// Only one write runs at a time; later callers wait for the lock. The
	/// first failing step aborts the rest.
	pub async fn write_all(&self, snapshot: &Snapshot) -> Result<(), RemoteError> {
		let _syncing = WriteGuard::enter(&self.writers);
		let _lock = self.write_lock.lock().await;

		for name in SEQUENCE_COLLECTIONS {
			let records = snapshot.collection(name).unwrap_or_default();
			let docs = records
				.iter()
				.filter_map(|record| match record {
					Value::Object(data) => Some(data.clone()),
					_ => {
						warn!(collection = %name, "Skipping record that is not an object");
						None
					}
				})
				.collect::<Vec<_>>();

			self.replace_collection(name, &docs).await?;
		}

		let grades = snapshot
			.grades
			.iter()
			.filter_map(|(key, record)| match record {
				Value::Object(data) => {
					let mut doc = data.clone();
					doc.insert(GRADE_KEY_FIELD.to_string(), Value::String(key.clone()));
					Some(doc)
				}
				_ => {
					warn!(grade = %key, "Skipping grade that is not an object");
					None
				}
			})
			.collect::<Vec<_>>();
		self.replace_collection(GRADES_COLLECTION, &grades).await?;

		self.backend.set_setting(HPS, &snapshot.hps).await?;
		self.backend.set_setting(WEIGHTS, &snapshot.weights).await?;
		self.backend
			.set_setting(GRADING_SCALE, &single(SCALE_FIELD, Value::Array(snapshot.grading_scale.clone())))
			.await?;
		self.backend
			.set_setting(
				META_SETTING,
				&single(LAST_MODIFIED, json!(format_timestamp(snapshot.last_modified))),
			)
			.await?;

		info!(
			students = snapshot.students.len(),
			grades = grades.len(),
			"Snapshot written to remote store"
		);
		Ok(())
	}

	async fn replace_collection(
		&self,
		collection: &str,
		docs: &[Map<String, Value>],
	) -> Result<(), RemoteError> {
		let existing = self.backend.list(collection).await?;

		let deleted = existing.len();
		first_error(
			join_all(
				existing
					.iter()
					.map(|doc| self.backend.delete(collection, &doc.id)),
			)
			.await,
		)?;

		first_error(join_all(docs.iter().map(|doc| self.backend.add(collection, doc))).await)?;

		debug!(
			collection = %collection,
			deleted,
			inserted = docs.len(),
			"Collection replaced"
		);
		Ok(())
	}
}

fn single(key: &str, value: Value) -> Map<String, Value> {
	let mut map = Map::new();
	map.insert(key.to_string(), value);
	map
}

fn first_error<T>(results: Vec<Result<T, RemoteError>>) -> Result<(), RemoteError> {
	results.into_iter().try_for_each(|res| res.map(|_| ()))
}
