//! The sync engine.
//!
//! Owns the connectivity state and decides, for every load and save, which of
//! the local cache and the remote store is authoritative. Remote and storage
//! failures never surface as errors: they are logged and reported through the
//! returned outcome, and the local copy is always kept usable.

use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::config::{SyncConfig, DEFAULT_DEBOUNCE_MS};
use crate::connectivity::{
	ConnectivityMonitor, RemoteAvailability, StatusBadge, StorageMode,
	TransitionAction, UnavailableReason,
};
use crate::debounce::Debouncer;
use crate::event::{SyncEvent, SyncEventBus};
use crate::local::{FileKeyValueStore, KeyValueStore, LocalStore};
use crate::merge::{merge, MergeWinner};
use crate::normalize::{normalize, normalize_opt};
use crate::remote::{DocumentStore, FirestoreStore, RemoteError, RemoteSnapshotStore};
use crate::shared_data::{self, SharedDataSource};
use crate::snapshot::Snapshot;
use crate::time_source::{Clock, SystemClock};

/// Where the snapshot returned by [`SyncEngine::load`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadSource {
	Local,
	Remote,
	Shared,
	/// Nothing anywhere, every field defaulted
	Defaults,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Loaded {
	pub snapshot: Snapshot,
	pub source: LoadSource,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RemoteOutcome {
	/// Not in remote mode
	Skipped,
	Pushed,
	Failed(RemoteError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SaveOutcome {
	/// The snapshot as saved, with its new timestamp
	pub snapshot: Snapshot,
	/// Whether the local write succeeded
	pub persisted: bool,
	pub remote: RemoteOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushSchedule {
	Scheduled,
	SkippedLocalMode,
	SkippedSyncInProgress,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuickSaveOutcome {
	pub snapshot: Snapshot,
	pub persisted: bool,
	pub push: PushSchedule,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
	/// Not in remote mode
	Skipped,
	/// Neither side has data
	NothingToSync,
	AdoptedRemote,
	PushedLocal,
	Merged { winner: MergeWinner },
	Failed(RemoteError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncStatus {
	pub online: bool,
	pub remote: RemoteAvailability,
	pub mode: StorageMode,
	pub badge: StatusBadge,
	pub last_sync: Option<DateTime<Utc>>,
	pub sync_in_progress: bool,
}

pub struct SyncEngine {
	local: LocalStore,
	remote: Option<RemoteSnapshotStore>,
	shared: Option<Arc<dyn SharedDataSource>>,
	monitor: ConnectivityMonitor,
	clock: Arc<dyn Clock>,
	events: SyncEventBus,
	debouncer: Debouncer,
	last_sync: RwLock<Option<DateTime<Utc>>>,
}

pub struct SyncEngineBuilder {
	local: Arc<dyn KeyValueStore>,
	remote: Option<Arc<dyn DocumentStore>>,
	shared: Option<Arc<dyn SharedDataSource>>,
	clock: Arc<dyn Clock>,
	events: SyncEventBus,
	online: bool,
	debounce: Duration,
}

impl SyncEngineBuilder {
	pub fn remote(mut self, store: Arc<dyn DocumentStore>) -> Self {
		self.remote = Some(store);
		self
	}

	pub fn shared_data(mut self, source: Arc<dyn SharedDataSource>) -> Self {
		self.shared = Some(source);
		self
	}

	pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;
		self
	}

	pub fn events(mut self, events: SyncEventBus) -> Self {
		self.events = events;
		self
	}

	/// Connectivity assumed until the first notification
	pub fn online(mut self, online: bool) -> Self {
		self.online = online;
		self
	}

	pub fn debounce(mut self, window: Duration) -> Self {
		self.debounce = window;
		self
	}

	pub fn build(self) -> Arc<SyncEngine> {
		Arc::new(SyncEngine {
			local: LocalStore::new(self.local),
			remote: self.remote.map(RemoteSnapshotStore::new),
			shared: self.shared,
			monitor: ConnectivityMonitor::new(self.online),
			clock: self.clock,
			events: self.events,
			debouncer: Debouncer::new(self.debounce),
			last_sync: RwLock::new(None),
		})
	}
}

impl SyncEngine {
	pub fn builder(local: Arc<dyn KeyValueStore>) -> SyncEngineBuilder {
		SyncEngineBuilder {
			local,
			remote: None,
			shared: None,
			clock: Arc::new(SystemClock),
			events: SyncEventBus::new(),
			online: true,
			debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
		}
	}

	/// Engine wired to the file store, Firestore and shared data file named in
	/// `config`
	pub fn from_config(config: &SyncConfig) -> Arc<Self> {
		let mut builder = Self::builder(Arc::new(FileKeyValueStore::new(config.store_dir())))
			.online(config.start_online)
			.debounce(config.debounce_window());

		if let Some(remote) = &config.remote {
			builder = builder.remote(Arc::new(FirestoreStore::from_config(remote)));
		}

		if let Some(location) = &config.shared_data_url {
			builder = builder.shared_data(shared_data::from_location(location, &config.data_dir));
		}

		builder.build()
	}

	/// Restore the last sync time and try to bring up the remote store.
	#[instrument(skip(self))]
	pub async fn init(&self) -> SyncStatus {
		let last_sync = self.local.read_last_sync().await;
		*self.last_sync.write() = last_sync;

		let availability = match &self.remote {
			None => RemoteAvailability::Unavailable(UnavailableReason::NotConfigured),
			Some(remote) => match remote.initialize().await {
				Ok(()) => RemoteAvailability::Available,
				Err(e) => {
					warn!(error = %e, "Remote store unavailable");
					RemoteAvailability::Unavailable(UnavailableReason::InitFailed(e.to_string()))
				}
			},
		};

		let transition = self.monitor.set_remote(availability);
		let state = self.monitor.state();
		self.events.emit(SyncEvent::ModeChanged {
			previous: transition.previous,
			current: transition.current,
			badge: state.badge(),
		});

		info!(mode = %transition.current, remote = %state.remote, "Sync engine initialized");
		self.status()
	}

	pub fn status(&self) -> SyncStatus {
		let state = self.monitor.state();

		SyncStatus {
			online: state.online,
			mode: state.mode(),
			badge: state.badge(),
			remote: state.remote,
			last_sync: *self.last_sync.read(),
			sync_in_progress: self.is_syncing(),
		}
	}

	pub fn mode(&self) -> StorageMode {
		self.monitor.mode()
	}

	pub fn events(&self) -> &SyncEventBus {
		&self.events
	}

	pub fn local(&self) -> &LocalStore {
		&self.local
	}

	pub(crate) fn now(&self) -> DateTime<Utc> {
		self.clock.now()
	}

	fn is_syncing(&self) -> bool {
		self.remote.as_ref().is_some_and(RemoteSnapshotStore::is_syncing)
	}

	/// Load the current snapshot. See [`load_detailed`](Self::load_detailed).
	pub async fn load(&self) -> Snapshot {
		self.load_detailed().await.snapshot
	}

	/// Load the current snapshot and report where it came from.
	///
	/// Starts from the local cache. In remote mode a strictly newer remote copy
	/// replaces it. If the result has no students, the shared data file is
	/// tried and adopted when it has at least one. Whatever was adopted from
	/// elsewhere is written back to the local cache.
	#[instrument(skip(self))]
	pub async fn load_detailed(&self) -> Loaded {
		let local_raw = self.local.read().await;
		let mut source = if local_raw.is_some() {
			LoadSource::Local
		} else {
			LoadSource::Defaults
		};
		let mut snapshot = normalize_opt(local_raw.as_ref());

		if let Some(remote) = self.remote_if_active() {
			match remote.read_all().await {
				Ok(Some(raw)) => {
					let mut remote_snapshot = normalize(&raw);
					if remote_snapshot.last_modified > snapshot.last_modified {
						debug!(
							local = %snapshot.last_modified,
							remote = %remote_snapshot.last_modified,
							"Remote copy is newer"
						);
						remote_snapshot.extra = snapshot.extra;
						snapshot = remote_snapshot;
						source = LoadSource::Remote;
					}
				}
				Ok(None) => debug!("Remote store is empty"),
				Err(e) => warn!(error = %e, "Failed to read remote store"),
			}
		}

		if !snapshot.has_students() {
			if let Some(shared) = self.load_shared().await {
				snapshot = shared;
				source = LoadSource::Shared;
			}
		}

		if matches!(source, LoadSource::Remote | LoadSource::Shared) {
			if let Err(e) = self.local.write(&snapshot).await {
				warn!(error = %e, "Failed to persist loaded snapshot");
			}
		}

		info!(source = ?source, students = snapshot.students.len(), "Snapshot loaded");
		self.events.emit(SyncEvent::SnapshotLoaded {
			source,
			students: snapshot.students.len(),
		});

		Loaded { snapshot, source }
	}

	async fn load_shared(&self) -> Option<Snapshot> {
		let shared = self.shared.as_ref()?;

		match shared.fetch().await {
			Ok(Some(raw)) => {
				let snapshot = normalize(&raw);
				if snapshot.has_students() {
					Some(snapshot)
				} else {
					debug!("Shared data has no students");
					None
				}
			}
			Ok(None) => None,
			Err(e) => {
				debug!(error = %e, "Shared data not available");
				None
			}
		}
	}

	/// Stamp and persist `snapshot`, then push it in remote mode.
	#[instrument(skip_all)]
	pub async fn save(&self, mut snapshot: Snapshot) -> SaveOutcome {
		snapshot.stamp(self.clock.now());
		let persisted = self.persist(&snapshot).await;
		let remote = self.push_remote(&snapshot).await;

		SaveOutcome {
			snapshot,
			persisted,
			remote,
		}
	}

	/// Stamp and persist `snapshot`, and in remote mode schedule a debounced
	/// push. Each call restarts the quiet window; only the last snapshot of a
	/// burst is pushed.
	pub async fn quick_save(self: &Arc<Self>, mut snapshot: Snapshot) -> QuickSaveOutcome {
		snapshot.stamp(self.clock.now());
		let persisted = self.persist(&snapshot).await;

		let push = if self.mode() != StorageMode::Remote {
			PushSchedule::SkippedLocalMode
		} else if self.is_syncing() {
			debug!("Sync in progress, not scheduling a push");
			PushSchedule::SkippedSyncInProgress
		} else {
			let engine: Weak<Self> = Arc::downgrade(self);
			let pending = snapshot.clone();
			self.debouncer.schedule(async move {
				if let Some(engine) = engine.upgrade() {
					engine.push_remote(&pending).await;
				}
			});
			PushSchedule::Scheduled
		};

		QuickSaveOutcome {
			snapshot,
			persisted,
			push,
		}
	}

	/// Wait for a debounced push scheduled by [`quick_save`](Self::quick_save)
	pub async fn flush_pending(&self) {
		self.debouncer.flush().await;
	}

	pub fn has_pending_push(&self) -> bool {
		self.debouncer.is_pending()
	}

	/// Write `snapshot` to the remote store as-is, if in remote mode.
	pub async fn push_remote(&self, snapshot: &Snapshot) -> RemoteOutcome {
		let Some(remote) = self.remote_if_active() else {
			return RemoteOutcome::Skipped;
		};

		match remote.write_all(snapshot).await {
			Ok(()) => {
				self.record_sync().await;
				self.events.emit(SyncEvent::RemotePushed {
					last_modified: snapshot.last_modified,
				});
				RemoteOutcome::Pushed
			}
			Err(e) => {
				warn!(error = %e, "Failed to push snapshot to remote store");
				RemoteOutcome::Failed(e)
			}
		}
	}

	/// Reconcile local and remote in both directions.
	#[instrument(skip(self))]
	pub async fn sync_all(&self) -> SyncOutcome {
		let Some(remote) = self.remote_if_active() else {
			return SyncOutcome::Skipped;
		};

		let local_raw = self.local.read().await;
		let remote_raw = match remote.read_all().await {
			Ok(raw) => raw,
			Err(e) => {
				warn!(error = %e, "Failed to read remote store");
				return SyncOutcome::Failed(e);
			}
		};

		let outcome = match (local_raw, remote_raw) {
			(None, None) => {
				debug!("Nothing to sync");
				return SyncOutcome::NothingToSync;
			}
			(None, Some(remote_raw)) => {
				self.persist(&normalize(&remote_raw)).await;
				SyncOutcome::AdoptedRemote
			}
			(Some(local_raw), None) => {
				if let Err(e) = remote.write_all(&normalize(&local_raw)).await {
					warn!(error = %e, "Failed to push local snapshot");
					return SyncOutcome::Failed(e);
				}
				SyncOutcome::PushedLocal
			}
			(Some(local_raw), Some(remote_raw)) => {
				let (merged, winner) = merge(
					&normalize(&local_raw),
					&normalize(&remote_raw),
					self.clock.now(),
				);
				self.persist(&merged).await;
				if let Err(e) = remote.write_all(&merged).await {
					warn!(error = %e, "Failed to push merged snapshot");
					return SyncOutcome::Failed(e);
				}
				SyncOutcome::Merged { winner }
			}
		};

		let at = self.record_sync().await;
		self.events.emit(SyncEvent::SyncCompleted { at });
		info!(outcome = ?outcome, "Sync completed");
		outcome
	}

	/// Feed an online/offline notification, running a full sync when the
	/// transition asks for one.
	pub async fn set_online(&self, online: bool) -> Option<SyncOutcome> {
		let before = self.monitor.state();
		let transition = self.monitor.set_online(online);
		let after = self.monitor.state();

		if before != after {
			self.events.emit(SyncEvent::ModeChanged {
				previous: transition.previous,
				current: transition.current,
				badge: after.badge(),
			});
		}

		match transition.action {
			TransitionAction::SyncAll => Some(self.sync_all().await),
			TransitionAction::None => None,
		}
	}

	fn remote_if_active(&self) -> Option<&RemoteSnapshotStore> {
		if self.mode() == StorageMode::Remote {
			self.remote.as_ref()
		} else {
			None
		}
	}

	async fn persist(&self, snapshot: &Snapshot) -> bool {
		match self.local.write(snapshot).await {
			Ok(()) => true,
			Err(e) => {
				warn!(error = %e, "Failed to write local snapshot");
				false
			}
		}
	}

	async fn record_sync(&self) -> DateTime<Utc> {
		let at = self.clock.now();
		*self.last_sync.write() = Some(at);

		if let Err(e) = self.local.write_last_sync(at).await {
			warn!(error = %e, "Failed to persist last sync time");
		}
		at
	}
}
