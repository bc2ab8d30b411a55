//! The synchronized data set and its wire shape.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

pub const COURSES: &str = "courses";
pub const STUDENTS: &str = "students";
pub const ENROLLMENTS: &str = "enrollments";
pub const ASSESSMENTS: &str = "assessments";
pub const GROUPS: &str = "groups";
pub const GRADES: &str = "grades";
pub const HPS: &str = "hps";
pub const WEIGHTS: &str = "weights";
pub const GRADING_SCALE: &str = "gradingScale";
pub const LAST_MODIFIED: &str = "_lastModified";

/// Record collections stored as ordered sequences, in wire order
pub const SEQUENCE_COLLECTIONS: [&str; 5] = [COURSES, STUDENTS, ENROLLMENTS, ASSESSMENTS, GROUPS];

/// Every top-level field the snapshot knows about
pub const KNOWN_FIELDS: [&str; 10] = [
	COURSES,
	STUDENTS,
	ENROLLMENTS,
	GRADES,
	ASSESSMENTS,
	GROUPS,
	HPS,
	WEIGHTS,
	GRADING_SCALE,
	LAST_MODIFIED,
];

/// Complete application data set exchanged between the local cache and the
/// remote store.
///
/// Records inside the collections are opaque to the sync layer. Top-level
/// fields the layer does not know about are kept in `extra` so they survive a
/// load/save cycle untouched.
///
/// Always build one through [`crate::normalize`], which guarantees every field
/// is present with the right shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
	pub courses: Vec<Value>,
	pub students: Vec<Value>,
	pub enrollments: Vec<Value>,
	pub grades: Map<String, Value>,
	pub assessments: Vec<Value>,
	pub groups: Vec<Value>,
	pub hps: Map<String, Value>,
	pub weights: Map<String, Value>,
	/// Bands as entered by the user, evaluated in order. Kept verbatim.
	pub grading_scale: Vec<Value>,
	pub last_modified: DateTime<Utc>,
	pub extra: Map<String, Value>,
}

impl Snapshot {
	/// Records of one of the [`SEQUENCE_COLLECTIONS`]
	pub fn collection(&self, name: &str) -> Option<&[Value]> {
		match name {
			COURSES => Some(&self.courses),
			STUDENTS => Some(&self.students),
			ENROLLMENTS => Some(&self.enrollments),
			ASSESSMENTS => Some(&self.assessments),
			GROUPS => Some(&self.groups),
			_ => None,
		}
	}

	pub fn has_students(&self) -> bool {
		!self.students.is_empty()
	}

	/// Overwrite the modification time, as every save does.
	pub fn stamp(&mut self, now: DateTime<Utc>) {
		self.last_modified = now.trunc_subsecs(3);
	}

	/// JSON form of the snapshot, in the same layout the local cache stores.
	pub fn to_value(&self) -> Value {
		let mut out = Map::new();
		out.insert(COURSES.into(), Value::Array(self.courses.clone()));
		out.insert(STUDENTS.into(), Value::Array(self.students.clone()));
		out.insert(ENROLLMENTS.into(), Value::Array(self.enrollments.clone()));
		out.insert(GRADES.into(), Value::Object(self.grades.clone()));
		out.insert(ASSESSMENTS.into(), Value::Array(self.assessments.clone()));
		out.insert(GROUPS.into(), Value::Array(self.groups.clone()));
		out.insert(HPS.into(), Value::Object(self.hps.clone()));
		out.insert(WEIGHTS.into(), Value::Object(self.weights.clone()));
		out.insert(GRADING_SCALE.into(), Value::Array(self.grading_scale.clone()));
		out.insert(LAST_MODIFIED.into(), Value::String(format_timestamp(self.last_modified)));

		for (key, value) in &self.extra {
			out.entry(key.clone()).or_insert_with(|| value.clone());
		}

		Value::Object(out)
	}
}

impl Serialize for Snapshot {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		self.to_value().serialize(serializer)
	}
}

/// Format a timestamp the way browsers' `toISOString` does:
/// millisecond precision and a `Z` suffix.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
	at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse an ISO-8601 / RFC 3339 timestamp, truncated to milliseconds.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
	DateTime::parse_from_rfc3339(raw.trim())
		.ok()
		.map(|at| at.with_timezone(&Utc).trunc_subsecs(3))
}

/// Modification time of a raw snapshot. Missing or unreadable timestamps
/// count as the Unix epoch, so they lose every comparison.
pub fn timestamp_of(raw: &Value) -> DateTime<Utc> {
	raw.get(LAST_MODIFIED)
		.and_then(Value::as_str)
		.and_then(parse_timestamp)
		.unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}
