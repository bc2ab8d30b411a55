//! The shared, student-facing data file used as a fallback when no local or
//! remote data has any students.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

#[derive(thiserror::Error, Debug)]
pub enum SharedDataError {
	#[error("http error: {0}")]
	Http(#[from] reqwest::Error),
	#[error("io error: {0}")]
	Io(#[from] std::io::Error),
	#[error("invalid shared data: {0}")]
	Parse(#[from] serde_json::Error),
}

#[async_trait]
pub trait SharedDataSource: Send + Sync {
	/// The shared data, or `None` when there is none to be had
	async fn fetch(&self) -> Result<Option<Value>, SharedDataError>;
}

/// Shared data served over HTTP. Any status other than 200 is a miss.
#[derive(Debug, Clone)]
pub struct HttpSharedData {
	client: reqwest::Client,
	url: String,
}

impl HttpSharedData {
	pub fn new(url: impl Into<String>) -> Self {
		Self {
			client: reqwest::Client::new(),
			url: url.into(),
		}
	}
}

#[async_trait]
impl SharedDataSource for HttpSharedData {
	async fn fetch(&self) -> Result<Option<Value>, SharedDataError> {
		let res = self.client.get(&self.url).send().await?;

		if res.status() != reqwest::StatusCode::OK {
			debug!(url = %self.url, status = %res.status(), "No shared data");
			return Ok(None);
		}

		let body = res.bytes().await?;
		Ok(Some(serde_json::from_slice(&body)?))
	}
}

/// Shared data read from a file. A missing file is a miss.
#[derive(Debug, Clone)]
pub struct FileSharedData {
	path: PathBuf,
}

impl FileSharedData {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}
}

#[async_trait]
impl SharedDataSource for FileSharedData {
	async fn fetch(&self) -> Result<Option<Value>, SharedDataError> {
		match tokio::fs::read(&self.path).await {
			Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
			Err(e) if e.kind() == ErrorKind::NotFound => {
				debug!(path = ?self.path, "No shared data");
				Ok(None)
			}
			Err(e) => Err(e.into()),
		}
	}
}

/// Pick a source for `location`: `http(s)://` URLs are fetched, anything else
/// is a path relative to `base_dir`.
pub fn from_location(location: &str, base_dir: &Path) -> Arc<dyn SharedDataSource> {
	if location.starts_with("http://") || location.starts_with("https://") {
		Arc::new(HttpSharedData::new(location))
	} else {
		Arc::new(FileSharedData::new(base_dir.join(location)))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[tokio::test]
	async fn file_source_reads_and_misses() {
		let tmp = tempfile::tempdir().unwrap();
		let source = from_location("data.json", tmp.path());

		assert!(source.fetch().await.unwrap().is_none());

		std::fs::write(tmp.path().join("data.json"), r#"{"students":[{"id":"s1"}]}"#).unwrap();
		assert_eq!(
			source.fetch().await.unwrap(),
			Some(json!({ "students": [{ "id": "s1" }] }))
		);
	}

	#[tokio::test]
	async fn file_source_reports_garbage() {
		let tmp = tempfile::tempdir().unwrap();
		std::fs::write(tmp.path().join("data.json"), "<html>").unwrap();

		let source = FileSharedData::new(tmp.path().join("data.json"));

		assert!(matches!(source.fetch().await, Err(SharedDataError::Parse(_))));
	}
}
