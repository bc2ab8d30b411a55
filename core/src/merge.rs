//! Last-write-wins reconciliation of two snapshots.

use chrono::{DateTime, Duration, Utc};

use crate::snapshot::Snapshot;

/// Which side's content a merge kept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeWinner {
	Local,
	Remote,
}

/// Reconcile two normalized snapshots.
///
/// Whole-snapshot last-write-wins: when `remote` was modified strictly later
/// than `local`, every field of `remote` replaces the matching field of a copy
/// of `local`. Unknown fields only present locally survive. Ties keep local.
/// The result is stamped with `now`, or one millisecond past the newer input
/// when `now` is not later than both.
pub fn merge(local: &Snapshot, remote: &Snapshot, now: DateTime<Utc>) -> (Snapshot, MergeWinner) {
	let (mut merged, winner) = if remote.last_modified > local.last_modified {
		let mut merged = remote.clone();
		let mut extra = local.extra.clone();
		extra.extend(remote.extra.clone());
		merged.extra = extra;
		(merged, MergeWinner::Remote)
	} else {
		(local.clone(), MergeWinner::Local)
	};

	let newest = local.last_modified.max(remote.last_modified);
	merged.stamp(now.max(newest + Duration::milliseconds(1)));
	(merged, winner)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::normalize;
	use chrono::TimeZone;
	use pretty_assertions::assert_eq;
	use serde_json::json;

	fn at(day: u32) -> DateTime<Utc> {
		Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
	}

	fn snapshot(day: u32, student: &str) -> Snapshot {
		let mut snapshot = normalize(&json!({ "students": [{ "id": student }] }));
		snapshot.last_modified = at(day);
		snapshot
	}

	#[test]
	fn newer_remote_wins() {
		let local = snapshot(1, "local");
		let remote = snapshot(2, "remote");

		let (merged, winner) = merge(&local, &remote, at(10));

		assert_eq!(winner, MergeWinner::Remote);
		assert_eq!(merged.students, remote.students);
		assert_eq!(merged.last_modified, at(10));
	}

	#[test]
	fn newer_or_equal_local_wins() {
		let remote = snapshot(2, "remote");

		for day in [2, 3] {
			let local = snapshot(day, "local");
			let (merged, winner) = merge(&local, &remote, at(10));

			assert_eq!(winner, MergeWinner::Local);
			assert_eq!(merged.students, local.students);
		}
	}

	#[test]
	fn merged_timestamp_is_fresh() {
		let local = snapshot(1, "local");
		let remote = snapshot(2, "remote");
		let now = Utc.with_ymd_and_hms(2024, 1, 5, 12, 30, 15).unwrap();

		let (merged, _) = merge(&local, &remote, now);

		assert_ne!(merged.last_modified, local.last_modified);
		assert_ne!(merged.last_modified, remote.last_modified);
		assert_eq!(merged.last_modified, now);
	}

	#[test]
	fn merged_timestamp_moves_past_inputs_within_same_millisecond() {
		let local = snapshot(3, "local");
		let remote = snapshot(2, "remote");

		let (merged, winner) = merge(&local, &remote, at(3));

		assert_eq!(winner, MergeWinner::Local);
		assert_eq!(merged.last_modified, at(3) + Duration::milliseconds(1));
		assert!(merged.last_modified > local.last_modified);
	}

	#[test]
	fn local_only_fields_survive_remote_win() {
		let mut local = snapshot(1, "local");
		local.extra.insert("theme".into(), json!("dark"));
		local.extra.insert("locale".into(), json!("en"));
		let mut remote = snapshot(2, "remote");
		remote.extra.insert("locale".into(), json!("fil"));

		let (merged, _) = merge(&local, &remote, at(10));

		assert_eq!(merged.extra["theme"], json!("dark"));
		assert_eq!(merged.extra["locale"], json!("fil"));
	}
}
