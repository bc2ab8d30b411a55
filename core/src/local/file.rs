use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::trace;

use super::{KeyValueStore, LocalStoreError};

/// [`KeyValueStore`] keeping one `{key}.json` file per slot in a directory.
///
/// Writes go to a sibling temporary file that is renamed over the slot, so a
/// crash mid-write leaves the previous value intact.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
	dir: PathBuf,
}

impl FileKeyValueStore {
	pub fn new(dir: impl Into<PathBuf>) -> Self {
		Self { dir: dir.into() }
	}

	pub fn dir(&self) -> &Path {
		&self.dir
	}

	fn slot_path(&self, key: &str) -> Result<PathBuf, LocalStoreError> {
		let valid = !key.is_empty()
			&& key
				.chars()
				.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

		if !valid {
			return Err(LocalStoreError::InvalidKey(key.to_string()));
		}

		Ok(self.dir.join(format!("{key}.json")))
	}
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
	async fn get(&self, key: &str) -> Result<Option<String>, LocalStoreError> {
		match fs::read_to_string(self.slot_path(key)?).await {
			Ok(contents) => Ok(Some(contents)),
			Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
			Err(e) => Err(e.into()),
		}
	}

	async fn set(&self, key: &str, value: &str) -> Result<(), LocalStoreError> {
		let path = self.slot_path(key)?;
		let tmp = path.with_extension("json.tmp");

		fs::create_dir_all(&self.dir).await?;
		fs::write(&tmp, value).await?;
		fs::rename(&tmp, &path).await?;

		trace!(?path, bytes = value.len(), "Slot written");
		Ok(())
	}

	async fn remove(&self, key: &str) -> Result<(), LocalStoreError> {
		match fs::remove_file(self.slot_path(key)?).await {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
			Err(e) => Err(e.into()),
		}
	}
}
