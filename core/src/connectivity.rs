//! Connectivity tracking and the derived storage mode.
//!
//! The monitor never polls and never calls back into the engine. Each
//! notification returns a [`Transition`] describing what changed and what the
//! caller has to do about it.

use std::fmt;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info};

/// Where writes go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
	/// Local cache only
	Local,
	/// Local cache and remote store
	Remote,
}

impl fmt::Display for StorageMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Local => "local",
			Self::Remote => "remote",
		})
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnavailableReason {
	/// No remote store was configured
	NotConfigured,
	/// The remote store could not be initialized
	InitFailed(String),
}

impl fmt::Display for UnavailableReason {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::NotConfigured => f.write_str("not_configured"),
			Self::InitFailed(msg) => write!(f, "init_failed: {msg}"),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum RemoteAvailability {
	Available,
	Unavailable(UnavailableReason),
}

impl RemoteAvailability {
	pub fn is_available(&self) -> bool {
		matches!(self, Self::Available)
	}
}

impl fmt::Display for RemoteAvailability {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Available => f.write_str("available"),
			Self::Unavailable(reason) => write!(f, "unavailable ({reason})"),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectivityState {
	pub online: bool,
	pub remote: RemoteAvailability,
}

impl ConnectivityState {
	pub fn mode(&self) -> StorageMode {
		if self.online && self.remote.is_available() {
			StorageMode::Remote
		} else {
			StorageMode::Local
		}
	}

	pub fn badge(&self) -> StatusBadge {
		StatusBadge::from(self)
	}
}

/// Work the engine must do after a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionAction {
	None,
	/// Reconcile local and remote in both directions
	SyncAll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
	pub previous: StorageMode,
	pub current: StorageMode,
	pub action: TransitionAction,
}

impl Transition {
	pub fn mode_changed(&self) -> bool {
		self.previous != self.current
	}
}

/// User-facing summary of the sync state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StatusBadge {
	CloudSynced,
	Offline,
	LocalOnly,
}

impl From<&ConnectivityState> for StatusBadge {
	fn from(state: &ConnectivityState) -> Self {
		match (state.mode(), state.online) {
			(StorageMode::Remote, _) => Self::CloudSynced,
			(StorageMode::Local, false) => Self::Offline,
			(StorageMode::Local, true) => Self::LocalOnly,
		}
	}
}

impl fmt::Display for StatusBadge {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::CloudSynced => "Cloud Synced",
			Self::Offline => "Offline",
			Self::LocalOnly => "Local Only",
		})
	}
}

#[derive(Debug)]
pub struct ConnectivityMonitor {
	state: RwLock<ConnectivityState>,
}

impl ConnectivityMonitor {
	/// Remote availability starts out as not configured until
	/// [`set_remote`](Self::set_remote) says otherwise.
	pub fn new(online: bool) -> Self {
		Self {
			state: RwLock::new(ConnectivityState {
				online,
				remote: RemoteAvailability::Unavailable(UnavailableReason::NotConfigured),
			}),
		}
	}

	pub fn state(&self) -> ConnectivityState {
		self.state.read().clone()
	}

	pub fn mode(&self) -> StorageMode {
		self.state.read().mode()
	}

	pub fn is_online(&self) -> bool {
		self.state.read().online
	}

	/// Feed an online/offline notification.
	///
	/// Going online with the remote available asks for a full sync. Repeated
	/// notifications of the current state are no-ops.
	pub fn set_online(&self, online: bool) -> Transition {
		let mut state = self.state.write();
		let previous = state.mode();
		let was_online = state.online;

		state.online = online;
		let current = state.mode();

		let action = if online && !was_online && state.remote.is_available() {
			TransitionAction::SyncAll
		} else {
			TransitionAction::None
		};

		if was_online != online {
			info!(online, mode = %current, "Connectivity changed");
		}

		Transition {
			previous,
			current,
			action,
		}
	}

	/// Record the outcome of a remote initialization attempt
	pub fn set_remote(&self, remote: RemoteAvailability) -> Transition {
		let mut state = self.state.write();
		let previous = state.mode();

		debug!(remote = %remote, "Remote availability updated");
		state.remote = remote;

		Transition {
			previous,
			current: state.mode(),
			action: TransitionAction::None,
		}
	}
}
