//! Snapshot normalization.
//!
//! Whatever comes out of the local cache, the remote store, the shared data
//! file or an import goes through [`normalize`] before anyone else sees it.

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};

use crate::snapshot::{
	parse_timestamp, Snapshot, ASSESSMENTS, COURSES, ENROLLMENTS, GRADES, GRADING_SCALE,
	GROUPS, HPS, KNOWN_FIELDS, LAST_MODIFIED, STUDENTS, WEIGHTS,
};

/// Default highest possible score per assessment category
pub fn default_hps() -> Map<String, Value> {
	let Value::Object(map) = json!({ "quiz": 50, "pt": 100, "project": 100, "exam": 100 }) else {
		unreachable!("object literal")
	};
	map
}

/// Default category weights, in percent
pub fn default_weights() -> Map<String, Value> {
	let Value::Object(map) = json!({ "written": 40, "quiz": 20, "pt": 30, "project": 10 }) else {
		unreachable!("object literal")
	};
	map
}

pub fn default_grading_scale() -> Vec<Value> {
	[
		(95, 100, "A"),
		(90, 94, "A-"),
		(85, 89, "B+"),
		(80, 84, "B"),
		(75, 79, "B-"),
		(70, 74, "C+"),
		(65, 69, "C"),
		(60, 64, "C-"),
		(55, 59, "D"),
		(0, 54, "F"),
	]
	.into_iter()
	.map(|(min, max, label)| json!({ "min": min, "max": max, "label": label }))
	.collect()
}

/// Bring any JSON value into the full snapshot shape.
///
/// Total and pure: fields that are missing, `null` or of the wrong container
/// type are replaced with their defaults, everything else is copied. The input
/// is never modified, and `normalize(&normalize(x).to_value()) == normalize(x)`.
pub fn normalize(raw: &Value) -> Snapshot {
	let empty = Map::new();
	let obj = raw.as_object().unwrap_or(&empty);

	Snapshot {
		courses: sequence(obj, COURSES),
		students: sequence(obj, STUDENTS),
		enrollments: sequence(obj, ENROLLMENTS),
		grades: mapping(obj, GRADES).unwrap_or_default(),
		assessments: sequence(obj, ASSESSMENTS),
		groups: sequence(obj, GROUPS),
		hps: mapping(obj, HPS).unwrap_or_else(default_hps),
		weights: mapping(obj, WEIGHTS).unwrap_or_else(default_weights),
		grading_scale: match obj.get(GRADING_SCALE) {
			Some(Value::Array(bands)) => bands.clone(),
			_ => default_grading_scale(),
		},
		last_modified: obj
			.get(LAST_MODIFIED)
			.and_then(Value::as_str)
			.and_then(parse_timestamp)
			.unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
		extra: obj
			.iter()
			.filter(|(key, _)| !KNOWN_FIELDS.contains(&key.as_str()))
			.map(|(key, value)| (key.clone(), value.clone()))
			.collect(),
	}
}

/// [`normalize`] for a snapshot that may not exist at all
pub fn normalize_opt(raw: Option<&Value>) -> Snapshot {
	normalize(raw.unwrap_or(&Value::Null))
}

fn sequence(obj: &Map<String, Value>, key: &str) -> Vec<Value> {
	match obj.get(key) {
		Some(Value::Array(records)) => records.clone(),
		_ => Vec::new(),
	}
}

fn mapping(obj: &Map<String, Value>, key: &str) -> Option<Map<String, Value>> {
	match obj.get(key) {
		Some(Value::Object(map)) => Some(map.clone()),
		_ => None,
	}
}
