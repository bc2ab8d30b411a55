//! Sync configuration

use super::{Migrate, RemoteConfig};
use anyhow::{anyhow, Result};
use gs_config::default_data_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

const CONFIG_FILE: &str = "gradesync.json";

/// Quiet window for coalescing `quick_save` pushes
pub const DEFAULT_DEBOUNCE_MS: u64 = 2_000;

/// Relative location of the shared, student-facing data file
pub const DEFAULT_SHARED_DATA_URL: &str = "data.json";

/// Main sync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
	/// Config schema version
	pub version: u32,

	/// Data directory path
	pub data_dir: PathBuf,

	/// Logging level
	pub log_level: String,

	/// Connectivity assumed at startup, before any online/offline notification
	#[serde(default = "default_true")]
	pub start_online: bool,

	/// Quiet window for debounced remote pushes, in milliseconds
	#[serde(default = "default_debounce_ms")]
	pub debounce_ms: u64,

	/// Where the fallback shared data file lives.
	///
	/// `http(s)://` URLs are fetched with a GET, anything else is treated as a
	/// path relative to the data directory.
	#[serde(default)]
	pub shared_data_url: Option<String>,

	/// Remote document store, absent for local-only operation
	#[serde(default)]
	pub remote: Option<RemoteConfig>,
}

fn default_true() -> bool {
	true
}

fn default_debounce_ms() -> u64 {
	DEFAULT_DEBOUNCE_MS
}

impl SyncConfig {
	/// Load configuration from the default location
	pub fn load() -> Result<Self> {
		let data_dir = default_data_dir()?;
		Self::load_from(&data_dir)
	}

	/// Load configuration from a specific data directory
	pub fn load_from(data_dir: &Path) -> Result<Self> {
		let config_path = data_dir.join(CONFIG_FILE);

		if config_path.exists() {
			info!("Loading config from {:?}", config_path);
			let json = fs::read_to_string(&config_path)?;
			let mut config: SyncConfig = serde_json::from_str(&json)?;

			// Apply migrations if needed
			if config.version < Self::target_version() {
				info!(
					"Migrating config from v{} to v{}",
					config.version,
					Self::target_version()
				);
				config.migrate()?;
				config.save()?;
			}

			Ok(config)
		} else {
			warn!("No config found, creating default at {:?}", config_path);
			let config = Self::default_with_dir(data_dir.to_path_buf());
			config.save()?;
			Ok(config)
		}
	}

	/// Load or create configuration
	pub fn load_or_create(data_dir: &Path) -> Result<Self> {
		Self::load_from(data_dir).or_else(|e| {
			warn!(error = %e, "Unreadable config, replacing with defaults");
			let config = Self::default_with_dir(data_dir.to_path_buf());
			config.save()?;
			Ok(config)
		})
	}

	/// Create default configuration with specific data directory
	pub fn default_with_dir(data_dir: PathBuf) -> Self {
		Self {
			version: Self::target_version(),
			data_dir,
			log_level: "info".to_string(),
			start_online: true,
			debounce_ms: DEFAULT_DEBOUNCE_MS,
			shared_data_url: Some(DEFAULT_SHARED_DATA_URL.to_string()),
			remote: None,
		}
	}

	/// Save configuration to disk
	pub fn save(&self) -> Result<()> {
		// Ensure directory exists
		fs::create_dir_all(&self.data_dir)?;

		let config_path = self.data_dir.join(CONFIG_FILE);
		let json = serde_json::to_string_pretty(self)?;
		fs::write(&config_path, json)?;
		info!("Saved config to {:?}", config_path);
		Ok(())
	}

	/// Get the path for logs directory
	pub fn logs_dir(&self) -> PathBuf {
		self.data_dir.join("logs")
	}

	/// Get the directory holding the local key-value slots
	pub fn store_dir(&self) -> PathBuf {
		self.data_dir.join("store")
	}

	pub fn debounce_window(&self) -> Duration {
		Duration::from_millis(self.debounce_ms)
	}

	/// Ensure all required directories exist
	pub fn ensure_directories(&self) -> Result<()> {
		fs::create_dir_all(&self.data_dir)?;
		fs::create_dir_all(self.logs_dir())?;
		fs::create_dir_all(self.store_dir())?;
		Ok(())
	}
}

impl Default for SyncConfig {
	fn default() -> Self {
		let data_dir = default_data_dir().unwrap_or_else(|_| PathBuf::from("."));
		Self::default_with_dir(data_dir)
	}
}

impl Migrate for SyncConfig {
	fn current_version(&self) -> u32 {
		self.version
	}

	fn target_version() -> u32 {
		1
	}

	fn migrate(&mut self) -> Result<()> {
		match self.version {
			1 => Ok(()),
			v => Err(anyhow!("Unknown config version: {}", v)),
		}
	}
}
