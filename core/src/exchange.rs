//! Backup export, shared-data export and backup import.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::{info, instrument, warn};

use crate::engine::{RemoteOutcome, SyncEngine};
use crate::normalize::{normalize, normalize_opt};
use crate::snapshot::{
	format_timestamp, Snapshot, ASSESSMENTS, COURSES, ENROLLMENTS, GRADES,
	GRADING_SCALE, HPS, LAST_MODIFIED, STUDENTS, WEIGHTS,
};

/// File name the shared export is published under
pub const SHARED_FILE_NAME: &str = "data.json";

#[derive(thiserror::Error, Debug)]
pub enum ImportError {
	#[error("invalid backup file: missing courses or students")]
	InvalidFile,
	#[error("backup file is not valid JSON: {0}")]
	Parse(#[from] serde_json::Error),
	#[error("failed to read backup file: {0}")]
	Io(#[from] std::io::Error),
}

/// A file ready to be handed to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
	pub file_name: String,
	pub contents: String,
}

impl ExportFile {
	/// Write the file into `dir`, returning its path
	pub async fn write_to(&self, dir: &Path) -> std::io::Result<PathBuf> {
		tokio::fs::create_dir_all(dir).await?;
		let path = dir.join(&self.file_name);
		tokio::fs::write(&path, &self.contents).await?;
		Ok(path)
	}
}

pub fn backup_file_name(at: DateTime<Utc>) -> String {
	format!("student_grade_tracker_backup_{}.json", at.format("%Y-%m-%d"))
}

/// Student-facing subset of a snapshot, stamped with `now`
pub fn shared_projection(snapshot: &Snapshot, now: DateTime<Utc>) -> Value {
	let mut out = Map::new();
	out.insert(STUDENTS.into(), Value::Array(snapshot.students.clone()));
	out.insert(COURSES.into(), Value::Array(snapshot.courses.clone()));
	out.insert(ENROLLMENTS.into(), Value::Array(snapshot.enrollments.clone()));
	out.insert(GRADES.into(), Value::Object(snapshot.grades.clone()));
	out.insert(ASSESSMENTS.into(), Value::Array(snapshot.assessments.clone()));
	out.insert(HPS.into(), Value::Object(snapshot.hps.clone()));
	out.insert(WEIGHTS.into(), Value::Object(snapshot.weights.clone()));
	out.insert(GRADING_SCALE.into(), Value::Array(snapshot.grading_scale.clone()));
	out.insert(LAST_MODIFIED.into(), Value::String(format_timestamp(now)));
	Value::Object(out)
}

/// Parse and check a backup, returning it normalized.
///
/// A backup must at least carry `courses` and `students`. Empty collections
/// are fine; `null`, `false`, `0` and `""` count as missing.
pub fn validate_import(contents: &str) -> Result<Snapshot, ImportError> {
	let raw: Value = serde_json::from_str(contents)?;

	let present = |key: &str| match raw.get(key) {
		None | Some(Value::Null) | Some(Value::Bool(false)) => false,
		Some(Value::Number(n)) => n.as_f64() != Some(0.0),
		Some(Value::String(s)) => !s.is_empty(),
		Some(_) => true,
	};
	if !present(COURSES) || !present(STUDENTS) {
		return Err(ImportError::InvalidFile);
	}

	Ok(normalize(&raw))
}

impl SyncEngine {
	/// Full backup of the local snapshot
	pub async fn export_backup(&self) -> Result<ExportFile, serde_json::Error> {
		let snapshot = normalize_opt(self.local().read().await.as_ref());

		Ok(ExportFile {
			file_name: backup_file_name(self.now()),
			contents: serde_json::to_string_pretty(&snapshot)?,
		})
	}

	/// Student-facing `data.json`, suitable as a shared data source
	pub async fn export_shared(&self) -> Result<ExportFile, serde_json::Error> {
		let snapshot = normalize_opt(self.local().read().await.as_ref());

		Ok(ExportFile {
			file_name: SHARED_FILE_NAME.to_string(),
			contents: serde_json::to_string_pretty(&shared_projection(&snapshot, self.now()))?,
		})
	}

	/// Replace the local snapshot with a backup, and push it in remote mode.
	///
	/// The backup's own timestamp is kept. Invalid backups leave everything
	/// untouched; a failed local write is logged and the push still runs.
	#[instrument(skip_all, fields(bytes = contents.len()))]
	pub async fn import(&self, contents: &str) -> Result<Snapshot, ImportError> {
		let snapshot = validate_import(contents)?;

		if let Err(e) = self.local().write(&snapshot).await {
			warn!(error = %e, "Failed to write imported snapshot locally");
		}
		info!(students = snapshot.students.len(), "Backup imported");

		if let RemoteOutcome::Failed(e) = self.push_remote(&snapshot).await {
			warn!(error = %e, "Imported data was not pushed to the remote store");
		}

		Ok(snapshot)
	}

	pub async fn import_file(&self, path: &Path) -> Result<Snapshot, ImportError> {
		let contents = tokio::fs::read_to_string(path).await?;
		self.import(&contents).await
	}
}
