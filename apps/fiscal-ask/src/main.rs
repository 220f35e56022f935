use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = fiscal_ask::Args::parse();

	fiscal_ask::run(args).await
}
