use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = augment_worker::Args::parse();

	augment_worker::run(args).await
}
