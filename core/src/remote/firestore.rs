use async_trait::async_trait;
use gs_cloud_api::{documents, RequestConfig};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use super::{DocumentStore, RemoteError, StoredDocument};
use crate::config::RemoteConfig;

const SETTINGS: &str = "settings";

/// [`DocumentStore`] backed by the Firestore REST API.
///
/// Document handles are the fully qualified resource names returned by the
/// server.
#[derive(Debug, Clone)]
pub struct FirestoreStore {
	config: RequestConfig,
}

impl FirestoreStore {
	pub fn new(config: RequestConfig) -> Self {
		Self { config }
	}

	pub fn from_config(remote: &RemoteConfig) -> Self {
		let mut config = RequestConfig::new(remote.project_id.clone(), remote.api_key.clone());
		if let Some(base_url) = &remote.base_url {
			config.api_url = base_url.clone();
		}
		Self { config }
	}
}

#[async_trait]
impl DocumentStore for FirestoreStore {
	#[instrument(skip(self), fields(project = %self.config.project_id), err)]
	async fn initialize(&self) -> Result<(), RemoteError> {
		if self.config.project_id.trim().is_empty() {
			return Err(RemoteError::Unavailable("no project id configured".to_string()));
		}

		// a missing settings document still proves the store is reachable
		documents::get(&self.config, SETTINGS, "hps")
			.await
			.map(|_| ())
			.map_err(|e| RemoteError::Unavailable(e.0))
	}

	async fn list(&self, collection: &str) -> Result<Vec<StoredDocument>, RemoteError> {
		let docs = documents::list(&self.config, collection).await?;
		debug!(collection = %collection, count = docs.len(), "Listed documents");

		Ok(docs
			.into_iter()
			.map(|doc| StoredDocument {
				id: doc.name,
				data: doc.fields,
			})
			.collect())
	}

	async fn add(&self, collection: &str, data: &Map<String, Value>) -> Result<String, RemoteError> {
		Ok(documents::add(&self.config, collection, data).await?.name)
	}

	async fn delete(&self, _collection: &str, id: &str) -> Result<(), RemoteError> {
		documents::delete(&self.config, id).await.map_err(Into::into)
	}

	async fn get_setting(&self, key: &str) -> Result<Option<Map<String, Value>>, RemoteError> {
		Ok(documents::get(&self.config, SETTINGS, key)
			.await?
			.map(|doc| doc.fields))
	}

	async fn set_setting(&self, key: &str, data: &Map<String, Value>) -> Result<(), RemoteError> {
		documents::set(&self.config, SETTINGS, key, data)
			.await
			.map_err(Into::into)
	}
}
