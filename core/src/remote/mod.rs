//! Remote document store access.
//!
//! The store is modelled as named collections of schemaless documents plus a
//! `settings` collection of named documents. [`DocumentStore`] is that
//! contract; [`RemoteSnapshotStore`] maps a whole snapshot onto it.

use async_trait::async_trait;
use serde_json::{Map, Value};

mod adapter;
mod firestore;
mod memory;

pub use adapter::{RemoteSnapshotStore, GRADES_COLLECTION, META_SETTING, SETTINGS_COLLECTION};
pub use firestore::FirestoreStore;
pub use memory::{MemoryDocumentStore, StoreOp};

/// A document as enumerated from a collection
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
	/// Store-specific handle, only meaningful to [`DocumentStore::delete`]
	pub id: String,
	pub data: Map<String, Value>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
	#[error("remote store unavailable: {0}")]
	Unavailable(String),
	#[error("remote request failed: {0}")]
	Request(String),
	#[error("invalid remote data: {0}")]
	InvalidData(String),
}

impl From<gs_cloud_api::Error> for RemoteError {
	fn from(e: gs_cloud_api::Error) -> Self {
		Self::Request(e.0)
	}
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
	/// Check the store can be reached. Called once when the engine starts.
	async fn initialize(&self) -> Result<(), RemoteError> {
		Ok(())
	}

	/// Every document of `collection`, in store order
	async fn list(&self, collection: &str) -> Result<Vec<StoredDocument>, RemoteError>;

	/// Insert a document under a store-assigned id, returning that id
	async fn add(&self, collection: &str, data: &Map<String, Value>) -> Result<String, RemoteError>;

	async fn delete(&self, collection: &str, id: &str) -> Result<(), RemoteError>;

	/// Fetch a document of the `settings` collection
	async fn get_setting(&self, key: &str) -> Result<Option<Map<String, Value>>, RemoteError>;

	/// Create or fully overwrite a document of the `settings` collection
	async fn set_setting(&self, key: &str, data: &Map<String, Value>) -> Result<(), RemoteError>;
}
