#![warn(
	clippy::all,
	clippy::pedantic,
	clippy::correctness,
	clippy::perf,
	clippy::style,
	clippy::suspicious,
	clippy::complexity,
	clippy::nursery,
	clippy::unwrap_used,
	unused_qualifications,
	rust_2018_idioms,
	trivial_casts,
	trivial_numeric_casts,
	unused_allocation,
	clippy::unnecessary_cast,
	clippy::cast_lossless,
	clippy::cast_possible_truncation,
	clippy::cast_possible_wrap,
	clippy::cast_precision_loss,
	clippy::cast_sign_loss,
	clippy::dbg_macro,
	clippy::deprecated_cfg_attr,
	clippy::separated_literal_suffix,
	deprecated
)]
#![forbid(deprecated_in_future)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

//! Client-side synchronization of grade tracker data between a local cache
//! and an optional remote document store.

pub mod config;
pub mod connectivity;
pub mod debounce;
pub mod engine;
pub mod event;
pub mod exchange;
pub mod local;
pub mod logging;
pub mod merge;
pub mod normalize;
pub mod remote;
pub mod shared_data;
pub mod snapshot;
pub mod time_source;

pub use config::SyncConfig;
pub use connectivity::{
	ConnectivityMonitor, RemoteAvailability, StatusBadge, StorageMode, Transition,
	TransitionAction, UnavailableReason,
};
pub use engine::{
	LoadSource, Loaded, PushSchedule, QuickSaveOutcome, RemoteOutcome, SaveOutcome, SyncEngine,
	SyncEngineBuilder, SyncOutcome, SyncStatus,
};
pub use event::{SyncEvent, SyncEventBus};
pub use exchange::{ExportFile, ImportError};
pub use merge::{merge, MergeWinner};
pub use normalize::{normalize, normalize_opt};
pub use snapshot::Snapshot;
