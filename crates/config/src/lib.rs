use anyhow::{anyhow, Result};
use std::env;
use std::fs;
use std::path::PathBuf;

/// Environment variable that overrides the platform data directory
pub const DATA_DIR_ENV: &str = "GRADESYNC_DATA_DIR";

/// Platform-specific data directory resolution
pub fn default_data_dir() -> Result<PathBuf> {
	if let Some(dir) = env::var_os(DATA_DIR_ENV) {
		let dir = PathBuf::from(dir);
		fs::create_dir_all(&dir)?;
		return Ok(dir);
	}

	#[cfg(target_os = "macos")]
	let dir = dirs::data_dir()
		.ok_or_else(|| anyhow!("Could not determine data directory"))?
		.join("gradesync");

	#[cfg(target_os = "windows")]
	let dir = dirs::data_dir()
		.ok_or_else(|| anyhow!("Could not determine data directory"))?
		.join("GradeSync");

	#[cfg(target_os = "linux")]
	let dir = dirs::data_local_dir()
		.ok_or_else(|| anyhow!("Could not determine data directory"))?
		.join("gradesync");

	#[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
	let dir = dirs::data_dir()
		.ok_or_else(|| anyhow!("Could not determine data directory"))?
		.join("gradesync");

	// Create directory if it doesn't exist
	fs::create_dir_all(&dir)?;

	Ok(dir)
}
