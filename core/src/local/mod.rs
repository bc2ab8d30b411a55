//! Local persistence of the snapshot and the last-sync time.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use crate::snapshot::{format_timestamp, parse_timestamp, Snapshot};

mod file;
mod memory;

pub use file::FileKeyValueStore;
pub use memory::MemoryKeyValueStore;

/// Slot holding the serialized snapshot
pub const SNAPSHOT_KEY: &str = "academic_grade_system_v1";

/// Slot holding the time of the last successful remote sync
pub const LAST_SYNC_KEY: &str = "academic_last_sync";

#[derive(thiserror::Error, Debug)]
pub enum LocalStoreError {
	#[error("io error: {0}")]
	Io(#[from] std::io::Error),
	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
	#[error("storage quota exceeded: need {needed} bytes, limit is {limit}")]
	QuotaExceeded { needed: usize, limit: usize },
	#[error("invalid storage key: {0:?}")]
	InvalidKey(String),
}

/// Durable string slots addressed by key
#[async_trait]
pub trait KeyValueStore: Send + Sync {
	async fn get(&self, key: &str) -> Result<Option<String>, LocalStoreError>;

	/// Store `value` under `key`, replacing whatever was there
	async fn set(&self, key: &str, value: &str) -> Result<(), LocalStoreError>;

	/// Removing a missing key is not an error
	async fn remove(&self, key: &str) -> Result<(), LocalStoreError>;
}

/// Snapshot cache on top of a [`KeyValueStore`]
#[derive(Clone)]
pub struct LocalStore {
	backend: Arc<dyn KeyValueStore>,
}

impl LocalStore {
	pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
		Self { backend }
	}

	/// The stored snapshot, un-normalized.
	///
	/// Absent, unreadable and malformed slots all read as `None`.
	pub async fn read(&self) -> Option<Value> {
		let raw = match self.backend.get(SNAPSHOT_KEY).await {
			Ok(Some(raw)) => raw,
			Ok(None) => return None,
			Err(e) => {
				warn!(error = %e, "Failed to read local snapshot");
				return None;
			}
		};

		match serde_json::from_str::<Value>(&raw) {
			Ok(value @ Value::Object(_)) => Some(value),
			Ok(_) => {
				warn!("Local snapshot is not a JSON object, ignoring it");
				None
			}
			Err(e) => {
				warn!(error = %e, "Local snapshot is malformed, ignoring it");
				None
			}
		}
	}

	/// Persist `snapshot`, overwriting the previous one
	pub async fn write(&self, snapshot: &Snapshot) -> Result<(), LocalStoreError> {
		let json = serde_json::to_string(snapshot)?;
		self.backend.set(SNAPSHOT_KEY, &json).await?;
		debug!(bytes = json.len(), "Local snapshot written");
		Ok(())
	}

	pub async fn clear(&self) -> Result<(), LocalStoreError> {
		self.backend.remove(SNAPSHOT_KEY).await
	}

	pub async fn read_last_sync(&self) -> Option<DateTime<Utc>> {
		match self.backend.get(LAST_SYNC_KEY).await {
			Ok(Some(raw)) => {
				let parsed = parse_timestamp(&raw);
				if parsed.is_none() {
					warn!(value = %raw, "Ignoring malformed last sync time");
				}
				parsed
			}
			Ok(None) => None,
			Err(e) => {
				warn!(error = %e, "Failed to read last sync time");
				None
			}
		}
	}

	pub async fn write_last_sync(&self, at: DateTime<Utc>) -> Result<(), LocalStoreError> {
		self.backend.set(LAST_SYNC_KEY, &format_timestamp(at)).await
	}
}
