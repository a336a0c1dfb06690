pub mod worker;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use augment_service::AugmentService;
use augment_storage::db::Db;

#[derive(Debug, Parser)]
#[command(
	version = augment_cli::VERSION,
	rename_all = "kebab",
	styles = augment_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = augment_config::load(&args.config)?;
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();

	let db = Db::connect(&config.storage.postgres).await?;

	db.ensure_schema().await?;

	let state = worker::WorkerState {
		db: db.clone(),
		settings: config.worker.clone(),
		service: AugmentService::new(config, db),
	};

	worker::run_worker(state).await
}
