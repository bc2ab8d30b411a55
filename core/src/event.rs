//! Broadcast of sync state changes to observers.
//!
//! Observers are optional and never block the engine: events emitted with no
//! subscriber are dropped.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

use crate::connectivity::{StatusBadge, StorageMode};
use crate::engine::LoadSource;

const CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct SyncEventBus {
	sender: broadcast::Sender<SyncEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncEvent {
	/// Storage mode or its badge changed
	ModeChanged {
		previous: StorageMode,
		current: StorageMode,
		badge: StatusBadge,
	},

	/// `load` settled on a snapshot
	SnapshotLoaded { source: LoadSource, students: usize },

	/// A full snapshot was written to the remote store
	RemotePushed { last_modified: DateTime<Utc> },

	/// A two-way sync finished
	SyncCompleted { at: DateTime<Utc> },
}

impl SyncEvent {
	pub fn event_type(&self) -> &'static str {
		match self {
			Self::ModeChanged { .. } => "ModeChanged",
			Self::SnapshotLoaded { .. } => "SnapshotLoaded",
			Self::RemotePushed { .. } => "RemotePushed",
			Self::SyncCompleted { .. } => "SyncCompleted",
		}
	}
}

impl SyncEventBus {
	pub fn new() -> Self {
		Self::with_capacity(CAPACITY)
	}

	pub fn with_capacity(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	/// Emit an event to all subscribers
	///
	/// Returns the number of active subscribers that received the event.
	pub fn emit(&self, event: SyncEvent) -> usize {
		let event_type = event.event_type();

		match self.sender.send(event) {
			Ok(count) => {
				trace!(event_type, subscribers = count, "Sync event emitted");
				count
			}
			Err(_) => {
				trace!(event_type, "Sync event emitted but no subscribers");
				0
			}
		}
	}

	pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
		self.sender.subscribe()
	}

	pub fn subscriber_count(&self) -> usize {
		self.sender.receiver_count()
	}
}

impl Default for SyncEventBus {
	fn default() -> Self {
		Self::new()
	}
}
