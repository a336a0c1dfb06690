use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = augment_api::Args::parse();

	augment_api::run(args).await
}
