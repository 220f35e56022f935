use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use fiscal_service::{AskRequest, AskResponse, FiscalService};

#[derive(Debug, Parser)]
#[command(
	version = fiscal_cli::VERSION,
	rename_all = "kebab",
	styles = fiscal_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[arg(long, short = 'q', value_name = "TEXT")]
	pub query: String,
	/// Overrides `retrieval.top_k` for this question.
	#[arg(long, value_name = "N")]
	pub top_k: Option<u32>,
	/// Overrides `rerank.top_n` for this question.
	#[arg(long, value_name = "N")]
	pub top_n: Option<u32>,
	/// Restricts retrieval to these financial years. Repeatable.
	#[arg(long = "year", value_name = "YEAR")]
	pub years: Vec<i32>,
}
impl Args {
	pub fn ask_request(&self) -> AskRequest {
		AskRequest {
			query: self.query.clone(),
			top_k: self.top_k,
			top_n: self.top_n,
			requested_years: (!self.years.is_empty()).then(|| self.years.clone()),
		}
	}
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = fiscal_config::load(&args.config)?;

	init_tracing(&config)?;

	let service = FiscalService::new(config)?;

	service.ensure_ready().await?;

	let response = match service.ask(args.ask_request()).await {
		Ok(response) => response,
		Err(err) => {
			tracing::error!(error = %err, "Question failed.");

			return Err(err.into());
		},
	};

	println!("{}", render(&response));
	println!("{}", serde_json::to_string_pretty(&response.trace)?);

	Ok(())
}

pub fn render(response: &AskResponse) -> String {
	let states =
		response.state_history.iter().map(|state| state.as_str()).collect::<Vec<_>>().join(" -> ");
	let band = response.band.map(|band| band.as_str()).unwrap_or("n/a");
	let mut out = format!(
		"confidence: {:.2} ({band})\nstates: {states}\nreason: {}\n\n{}\n",
		response.confidence,
		response.final_reason.as_str(),
		response.answer,
	);

	if let Some(note) = &response.applicability_note {
		out.push_str(&format!("\napplicability: {note}"));
	}
	if let Some(note) = &response.uncertainty_note {
		out.push_str(&format!("\nuncertainty: {note}"));
	}

	out
}

fn init_tracing(config: &fiscal_config::Config) -> color_eyre::Result<()> {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

	Ok(())
}
