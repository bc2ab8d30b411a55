//! Engine harness over in-memory stores and a fake clock.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use gs_core::local::{KeyValueStore, MemoryKeyValueStore, LAST_SYNC_KEY, SNAPSHOT_KEY};
use gs_core::remote::{
	DocumentStore, MemoryDocumentStore, RemoteError, RemoteSnapshotStore, StoredDocument,
	META_SETTING,
};
use gs_core::shared_data::{SharedDataError, SharedDataSource};
use gs_core::time_source::FakeClock;
use gs_core::{normalize, Snapshot, SyncEngine};
use serde_json::{Map, Value};
use tokio::sync::{Notify, Semaphore};

pub const DEBOUNCE: Duration = Duration::from_secs(2);

pub fn start_time() -> DateTime<Utc> {
	Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

/// Shared data served from memory, counting fetches
#[derive(Default)]
pub struct StaticSharedData {
	data: Option<Value>,
	fetches: AtomicUsize,
}

impl StaticSharedData {
	pub fn new(data: Option<Value>) -> Self {
		Self {
			data,
			fetches: AtomicUsize::new(0),
		}
	}

	pub fn fetches(&self) -> usize {
		self.fetches.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl SharedDataSource for StaticSharedData {
	async fn fetch(&self) -> Result<Option<Value>, SharedDataError> {
		self.fetches.fetch_add(1, Ordering::SeqCst);
		Ok(self.data.clone())
	}
}

/// Memory store whose settings writes park until [`release`](Self::release),
/// holding a full remote write in flight
pub struct GatedDocumentStore {
	inner: MemoryDocumentStore,
	gate: Semaphore,
	entered: Notify,
}

impl GatedDocumentStore {
	pub fn new() -> Self {
		Self {
			inner: MemoryDocumentStore::new(),
			gate: Semaphore::new(0),
			entered: Notify::new(),
		}
	}

	/// Wait until a write has reached the gate
	pub async fn entered(&self) {
		self.entered.notified().await;
	}

	pub fn release(&self) {
		self.gate.add_permits(Semaphore::MAX_PERMITS / 2);
	}
}

#[async_trait]
impl DocumentStore for GatedDocumentStore {
	async fn list(&self, collection: &str) -> Result<Vec<StoredDocument>, RemoteError> {
		self.inner.list(collection).await
	}

	async fn add(&self, collection: &str, data: &Map<String, Value>) -> Result<String, RemoteError> {
		self.inner.add(collection, data).await
	}

	async fn delete(&self, collection: &str, id: &str) -> Result<(), RemoteError> {
		self.inner.delete(collection, id).await
	}

	async fn get_setting(&self, key: &str) -> Result<Option<Map<String, Value>>, RemoteError> {
		self.inner.get_setting(key).await
	}

	async fn set_setting(&self, key: &str, data: &Map<String, Value>) -> Result<(), RemoteError> {
		self.entered.notify_one();
		let _permit = self
			.gate
			.acquire()
			.await
			.map_err(|e| RemoteError::Unavailable(e.to_string()))?;
		self.inner.set_setting(key, data).await
	}
}

pub struct HarnessBuilder {
	online: bool,
	remote_configured: bool,
	remote_reachable: bool,
	local: Option<String>,
	remote: Option<Value>,
	shared: Option<Value>,
}

impl HarnessBuilder {
	pub fn offline(mut self) -> Self {
		self.online = false;
		self
	}

	pub fn without_remote(mut self) -> Self {
		self.remote_configured = false;
		self
	}

	/// Configured remote that fails to initialize
	pub fn unreachable_remote(mut self) -> Self {
		self.remote_reachable = false;
		self
	}

	pub fn local(mut self, raw: Value) -> Self {
		self.local = Some(raw.to_string());
		self
	}

	/// Store arbitrary text in the local snapshot slot
	pub fn local_text(mut self, text: &str) -> Self {
		self.local = Some(text.to_string());
		self
	}

	pub fn remote(mut self, raw: Value) -> Self {
		self.remote = Some(raw);
		self
	}

	pub fn shared(mut self, raw: Value) -> Self {
		self.shared = Some(raw);
		self
	}

	/// Seed the stores and build an engine, without initializing it
	pub async fn build(self) -> Harness {
		let kv = Arc::new(MemoryKeyValueStore::new());
		if let Some(text) = &self.local {
			kv.set(SNAPSHOT_KEY, text).await.unwrap();
		}

		let remote = Arc::new(MemoryDocumentStore::new());
		if let Some(raw) = &self.remote {
			RemoteSnapshotStore::new(remote.clone())
				.write_all(&normalize(raw))
				.await
				.unwrap();
		}
		remote.set_available(self.remote_reachable);

		let shared = Arc::new(StaticSharedData::new(self.shared));
		let clock = FakeClock::new(start_time());

		let mut builder = SyncEngine::builder(kv.clone())
			.shared_data(shared.clone())
			.clock(Arc::new(clock.clone()))
			.online(self.online)
			.debounce(DEBOUNCE);
		if self.remote_configured {
			builder = builder.remote(remote.clone());
		}

		Harness {
			engine: builder.build(),
			kv,
			remote,
			shared,
			clock,
			seeded_remote_writes: usize::from(self.remote.is_some()),
		}
	}

	pub async fn start(self) -> Harness {
		let harness = self.build().await;
		harness.engine.init().await;
		harness
	}
}

pub struct Harness {
	pub engine: Arc<SyncEngine>,
	pub kv: Arc<MemoryKeyValueStore>,
	pub remote: Arc<MemoryDocumentStore>,
	pub shared: Arc<StaticSharedData>,
	pub clock: FakeClock,
	seeded_remote_writes: usize,
}

impl Harness {
	pub fn builder() -> HarnessBuilder {
		HarnessBuilder {
			online: true,
			remote_configured: true,
			remote_reachable: true,
			local: None,
			remote: None,
			shared: None,
		}
	}

	/// Snapshot currently in the local slot, normalized
	pub async fn local_snapshot(&self) -> Option<Snapshot> {
		let text = self.kv.get(SNAPSHOT_KEY).await.unwrap()?;
		Some(normalize(&serde_json::from_str(&text).unwrap()))
	}

	pub async fn local_text(&self) -> Option<String> {
		self.kv.get(SNAPSHOT_KEY).await.unwrap()
	}

	pub async fn last_sync_slot(&self) -> Option<String> {
		self.kv.get(LAST_SYNC_KEY).await.unwrap()
	}

	/// Snapshot currently held by the remote store, normalized
	pub async fn remote_snapshot(&self) -> Option<Snapshot> {
		RemoteSnapshotStore::new(self.remote.clone())
			.read_all()
			.await
			.unwrap()
			.map(|raw| normalize(&raw))
	}

	/// Completed full remote writes made by the engine
	pub fn remote_writes(&self) -> usize {
		self.remote.setting_writes(META_SETTING) - self.seeded_remote_writes
	}
}

/// Ids of the student records of `snapshot`
pub fn student_ids(snapshot: &Snapshot) -> Vec<String> {
	snapshot
		.students
		.iter()
		.map(|student| student["id"].as_str().unwrap_or_default().to_string())
		.collect()
}
