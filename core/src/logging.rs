use std::path::Path;
use std::sync::Once;

use anyhow::{anyhow, Result};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE: &str = "gradesync.log";

/// Install the global subscriber: stderr plus a daily-rotated file under
/// `{data_dir}/logs`. `RUST_LOG` takes precedence over `level`.
///
/// Only the first call does anything.
pub fn init_logging(data_dir: &Path, level: &str) -> Result<()> {
	static INIT: Once = Once::new();
	let mut result = Ok(());

	INIT.call_once(|| {
		let logs_dir = data_dir.join("logs");
		if let Err(e) = std::fs::create_dir_all(&logs_dir) {
			result = Err(anyhow!("Failed to create logs directory: {e}"));
			return;
		}

		let default_filter = format!("gs_core={level},gs_cli={level},gs_cloud_api={level}");
		let file_appender = RollingFileAppender::new(Rotation::DAILY, logs_dir, LOG_FILE);

		if let Err(e) = tracing_subscriber::registry()
			.with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
			.with(fmt::layer().with_target(true).with_writer(std::io::stderr))
			.with(
				fmt::layer()
					.with_target(true)
					.with_thread_ids(true)
					.with_ansi(false)
					.with_writer(file_appender),
			)
			.try_init()
		{
			result = Err(anyhow!("Failed to initialize tracing: {e}"));
		}
	});

	result
}
