//! Trailing-edge debouncing of async actions.

use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{trace, warn};

/// Runs only the last scheduled action, once `window` has passed without a
/// newer one being scheduled.
///
/// An action that has started running is never cancelled by a later
/// [`schedule`](Self::schedule) or [`cancel`](Self::cancel); only its timer is.
#[derive(Debug)]
pub struct Debouncer {
	window: Duration,
	pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
	pub fn new(window: Duration) -> Self {
		Self {
			window,
			pending: Mutex::new(None),
		}
	}

	pub fn window(&self) -> Duration {
		self.window
	}

	/// Schedule `action`, replacing any action still waiting for its timer
	pub fn schedule<F>(&self, action: F)
	where
		F: Future<Output = ()> + Send + 'static,
	{
		let window = self.window;
		let timer = tokio::spawn(async move {
			tokio::time::sleep(window).await;
			if let Err(e) = tokio::spawn(action).await {
				warn!(error = %e, "Debounced action panicked");
			}
		});

		if let Some(previous) = self.pending.lock().replace(timer) {
			previous.abort();
			trace!("Debounce timer reset");
		}
	}

	/// Drop the waiting action, if any. Returns whether one was waiting.
	pub fn cancel(&self) -> bool {
		match self.pending.lock().take() {
			Some(timer) => {
				let waiting = !timer.is_finished();
				timer.abort();
				waiting
			}
			None => false,
		}
	}

	pub fn is_pending(&self) -> bool {
		self.pending
			.lock()
			.as_ref()
			.is_some_and(|timer| !timer.is_finished())
	}

	/// Wait for the scheduled action, timer included, to complete
	pub async fn flush(&self) {
		let timer = self.pending.lock().take();
		if let Some(timer) = timer {
			// an aborted timer is not an error worth surfacing here
			let _ = timer.await;
		}
	}
}

impl Drop for Debouncer {
	fn drop(&mut self) {
		if let Some(timer) = self.pending.get_mut().take() {
			timer.abort();
		}
	}
}
