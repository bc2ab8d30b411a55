use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{KeyValueStore, LocalStoreError};

/// Volatile [`KeyValueStore`], optionally capped to a total size in bytes
/// the way browser storage is.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
	slots: Mutex<HashMap<String, String>>,
	quota: Option<usize>,
}

impl MemoryKeyValueStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_quota(limit: usize) -> Self {
		Self {
			slots: Mutex::default(),
			quota: Some(limit),
		}
	}

	pub fn len(&self) -> usize {
		self.slots.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.slots.lock().is_empty()
	}
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
	async fn get(&self, key: &str) -> Result<Option<String>, LocalStoreError> {
		Ok(self.slots.lock().get(key).cloned())
	}

	async fn set(&self, key: &str, value: &str) -> Result<(), LocalStoreError> {
		let mut slots = self.slots.lock();

		if let Some(limit) = self.quota {
			let needed = slots
				.iter()
				.filter(|(k, _)| k.as_str() != key)
				.map(|(k, v)| k.len() + v.len())
				.sum::<usize>()
				+ key.len() + value.len();

			if needed > limit {
				return Err(LocalStoreError::QuotaExceeded { needed, limit });
			}
		}

		slots.insert(key.to_string(), value.to_string());
		Ok(())
	}

	async fn remove(&self, key: &str) -> Result<(), LocalStoreError> {
		self.slots.lock().remove(key);
		Ok(())
	}
}
