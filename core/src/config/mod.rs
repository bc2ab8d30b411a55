//! Configuration management

use anyhow::Result;
use serde::{Deserialize, Serialize};

pub mod app_config;

pub use app_config::{SyncConfig, DEFAULT_DEBOUNCE_MS, DEFAULT_SHARED_DATA_URL};

/// Schema versioning for persisted configuration
pub trait Migrate {
	fn current_version(&self) -> u32;

	fn target_version() -> u32
	where
		Self: Sized;

	fn migrate(&mut self) -> Result<()>;
}

/// Connection details for the remote document store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
	/// Project hosting the document database
	pub project_id: String,

	/// Optional API key appended to every request
	#[serde(default)]
	pub api_key: Option<String>,

	/// Override for the REST endpoint (emulators, proxies)
	#[serde(default)]
	pub base_url: Option<String>,
}
