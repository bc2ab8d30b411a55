use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::{DocumentStore, RemoteError, StoredDocument};

/// Mutating call made against a [`MemoryDocumentStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
	Add { collection: String },
	Delete { collection: String },
	SetSetting { key: String },
}

#[derive(Debug)]
struct State {
	collections: HashMap<String, Vec<StoredDocument>>,
	settings: HashMap<String, Map<String, Value>>,
	journal: Vec<StoreOp>,
	failing_adds: HashSet<String>,
	available: bool,
}

/// In-process [`DocumentStore`].
///
/// Keeps documents in insertion order and journals every mutation. Failures
/// can be injected per collection or for the whole store.
#[derive(Debug)]
pub struct MemoryDocumentStore {
	state: Mutex<State>,
}

impl Default for MemoryDocumentStore {
	fn default() -> Self {
		Self::new()
	}
}

impl MemoryDocumentStore {
	pub fn new() -> Self {
		Self {
			state: Mutex::new(State {
				collections: HashMap::new(),
				settings: HashMap::new(),
				journal: Vec::new(),
				failing_adds: HashSet::new(),
				available: true,
			}),
		}
	}

	pub fn documents(&self, collection: &str) -> Vec<StoredDocument> {
		self.state
			.lock()
			.collections
			.get(collection)
			.cloned()
			.unwrap_or_default()
	}

	pub fn setting(&self, key: &str) -> Option<Map<String, Value>> {
		self.state.lock().settings.get(key).cloned()
	}

	pub fn journal(&self) -> Vec<StoreOp> {
		self.state.lock().journal.clone()
	}

	/// Number of times the settings document `key` was written
	pub fn setting_writes(&self, key: &str) -> usize {
		self.state
			.lock()
			.journal
			.iter()
			.filter(|op| matches!(op, StoreOp::SetSetting { key: k } if k == key))
			.count()
	}

	/// Make every later `add` to `collection` fail
	pub fn fail_adds_to(&self, collection: &str) {
		self.state.lock().failing_adds.insert(collection.to_string());
	}

	pub fn clear_failures(&self) {
		self.state.lock().failing_adds.clear();
	}

	/// Toggle reachability. An unavailable store fails every call.
	pub fn set_available(&self, available: bool) {
		self.state.lock().available = available;
	}

	fn check(state: &State) -> Result<(), RemoteError> {
		if state.available {
			Ok(())
		} else {
			Err(RemoteError::Unavailable("memory store switched off".to_string()))
		}
	}
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
	async fn initialize(&self) -> Result<(), RemoteError> {
		Self::check(&self.state.lock())
	}

	async fn list(&self, collection: &str) -> Result<Vec<StoredDocument>, RemoteError> {
		let state = self.state.lock();
		Self::check(&state)?;
		Ok(state.collections.get(collection).cloned().unwrap_or_default())
	}

	async fn add(&self, collection: &str, data: &Map<String, Value>) -> Result<String, RemoteError> {
		let mut state = self.state.lock();
		Self::check(&state)?;
		state.journal.push(StoreOp::Add {
			collection: collection.to_string(),
		});

		if state.failing_adds.contains(collection) {
			return Err(RemoteError::Request(format!("injected failure adding to {collection}")));
		}

		let id = Uuid::new_v4().to_string();
		state
			.collections
			.entry(collection.to_string())
			.or_default()
			.push(StoredDocument {
				id: id.clone(),
				data: data.clone(),
			});
		Ok(id)
	}

	async fn delete(&self, collection: &str, id: &str) -> Result<(), RemoteError> {
		let mut state = self.state.lock();
		Self::check(&state)?;
		state.journal.push(StoreOp::Delete {
			collection: collection.to_string(),
		});

		if let Some(docs) = state.collections.get_mut(collection) {
			docs.retain(|doc| doc.id != id);
		}
		Ok(())
	}

	async fn get_setting(&self, key: &str) -> Result<Option<Map<String, Value>>, RemoteError> {
		let state = self.state.lock();
		Self::check(&state)?;
		Ok(state.settings.get(key).cloned())
	}

	async fn set_setting(&self, key: &str, data: &Map<String, Value>) -> Result<(), RemoteError> {
		let mut state = self.state.lock();
		Self::check(&state)?;
		state.journal.push(StoreOp::SetSetting { key: key.to_string() });
		state.settings.insert(key.to_string(), data.clone());
		Ok(())
	}
}
