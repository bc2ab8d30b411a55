use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use gs_core::local::FileKeyValueStore;
use gs_core::logging::init_logging;
use gs_core::remote::MemoryDocumentStore;
use gs_core::shared_data;
use gs_core::{
	RemoteOutcome, SaveOutcome, Snapshot, SyncConfig, SyncEngine, SyncOutcome, SyncStatus,
};
use tracing::debug;

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
	Human,
	Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum RemoteKind {
	/// Firestore project from the config file
	Firestore,
	/// Throwaway in-process store
	Memory,
	/// Local cache only
	None,
}

#[derive(Parser, Debug)]
#[command(name = "gradesync", about = "Grade tracker data sync")]
struct Cli {
	/// Path to the data directory
	#[arg(long, env = gs_config::DATA_DIR_ENV)]
	data_dir: Option<PathBuf>,

	/// Start as if the network were down
	#[arg(long)]
	offline: bool,

	/// Remote store to use, defaults to firestore when one is configured
	#[arg(long, value_enum)]
	remote: Option<RemoteKind>,

	/// Output format
	#[arg(long, value_enum, default_value = "human")]
	format: OutputFormat,

	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
	/// Connectivity, storage mode and last sync
	Status,
	/// Load the current snapshot
	Load,
	/// Reconcile local and remote data
	Sync,
	/// Load and save again, refreshing the modification time
	Touch,
	/// Export a backup or the shared data file
	Export {
		/// Export the student-facing data.json instead of a full backup
		#[arg(long)]
		shared: bool,
		/// Directory to write into
		#[arg(long)]
		dest: Option<PathBuf>,
	},
	/// Replace local data with a backup file
	Import { file: PathBuf },
	/// Delete the local snapshot
	Reset,
}

fn build_engine(config: &SyncConfig, remote: RemoteKind) -> Result<Arc<SyncEngine>> {
	match remote {
		RemoteKind::Firestore => {
			if config.remote.is_none() {
				bail!(
					"no remote store configured in {}",
					config.data_dir.join("gradesync.json").display()
				);
			}
			Ok(SyncEngine::from_config(config))
		}
		RemoteKind::Memory => {
			let mut builder =
				SyncEngine::builder(Arc::new(FileKeyValueStore::new(config.store_dir())))
					.remote(Arc::new(MemoryDocumentStore::new()))
					.online(config.start_online)
					.debounce(config.debounce_window());
			if let Some(location) = &config.shared_data_url {
				builder = builder.shared_data(shared_data::from_location(location, &config.data_dir));
			}
			Ok(builder.build())
		}
		RemoteKind::None => {
			let config = SyncConfig {
				remote: None,
				..config.clone()
			};
			Ok(SyncEngine::from_config(&config))
		}
	}
}

fn print_status(status: &SyncStatus) {
	println!("Status: {}", status.badge);
	println!("Mode: {}", status.mode);
	println!("Online: {}", if status.online { "yes" } else { "no" });
	println!("Remote: {}", status.remote);
	match status.last_sync {
		Some(at) => println!("Last sync: {}", at.to_rfc3339()),
		None => println!("Last sync: never"),
	}
	if status.sync_in_progress {
		println!("A sync is in progress");
	}
}

fn print_summary(snapshot: &Snapshot) {
	println!(
		"{} students, {} courses, {} enrollments, {} grades, {} assessments, {} groups",
		snapshot.students.len(),
		snapshot.courses.len(),
		snapshot.enrollments.len(),
		snapshot.grades.len(),
		snapshot.assessments.len(),
		snapshot.groups.len(),
	);
	println!("Last modified: {}", snapshot.last_modified.to_rfc3339());
}

fn describe_remote(outcome: &RemoteOutcome) -> String {
	match outcome {
		RemoteOutcome::Skipped => "not pushed (local mode)".to_string(),
		RemoteOutcome::Pushed => "pushed to remote".to_string(),
		RemoteOutcome::Failed(e) => format!("remote push failed: {e}"),
	}
}

fn describe_sync(outcome: &SyncOutcome) -> String {
	match outcome {
		SyncOutcome::Skipped => "Not in remote mode, nothing synced".to_string(),
		SyncOutcome::NothingToSync => "No data on either side".to_string(),
		SyncOutcome::AdoptedRemote => "Adopted remote data locally".to_string(),
		SyncOutcome::PushedLocal => "Pushed local data to remote".to_string(),
		SyncOutcome::Merged { winner } => format!("Merged, {winner:?} copy was newer"),
		SyncOutcome::Failed(e) => format!("Sync failed: {e}"),
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();
	let data_dir = match cli.data_dir {
		Some(dir) => dir,
		None => gs_config::default_data_dir()?,
	};

	let mut config = SyncConfig::load_or_create(&data_dir)?;
	config.ensure_directories()?;
	init_logging(&config.data_dir, &config.log_level)?;

	if cli.offline {
		config.start_online = false;
	}

	let remote = cli.remote.unwrap_or(if config.remote.is_some() {
		RemoteKind::Firestore
	} else {
		RemoteKind::None
	});
	debug!(?remote, data_dir = ?config.data_dir, "Starting");

	let engine = build_engine(&config, remote)?;
	let status = engine.init().await;

	match cli.command {
		Commands::Status => match cli.format {
			OutputFormat::Human => print_status(&status),
			OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&status)?),
		},
		Commands::Load => {
			let loaded = engine.load_detailed().await;
			match cli.format {
				OutputFormat::Human => {
					println!("Loaded from {:?}", loaded.source);
					print_summary(&loaded.snapshot);
				}
				OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&loaded.snapshot)?),
			}
		}
		Commands::Sync => {
			let outcome = engine.sync_all().await;
			println!("{}", describe_sync(&outcome));
		}
		Commands::Touch => {
			let snapshot = engine.load().await;
			let SaveOutcome {
				snapshot,
				persisted,
				remote,
			} = engine.save(snapshot).await;

			if !persisted {
				bail!("failed to write the local snapshot, see logs");
			}
			println!("Saved locally, {}", describe_remote(&remote));
			print_summary(&snapshot);
		}
		Commands::Export { shared, dest } => {
			let file = if shared {
				engine.export_shared().await?
			} else {
				engine.export_backup().await?
			};
			let dest = match dest {
				Some(dest) => dest,
				None => std::env::current_dir()?,
			};
			let path = file
				.write_to(&dest)
				.await
				.with_context(|| format!("failed to write export to {}", dest.display()))?;
			println!("Exported to {}", path.display());
		}
		Commands::Import { file } => {
			let snapshot = engine
				.import_file(&file)
				.await
				.with_context(|| format!("failed to import {}", file.display()))?;
			println!("Imported {}", file.display());
			print_summary(&snapshot);
		}
		Commands::Reset => {
			engine.local().clear().await?;
			println!("Local data removed");
		}
	}

	engine.flush_pending().await;
	Ok(())
}
