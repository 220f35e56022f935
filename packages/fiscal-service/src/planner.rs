use serde_json::Value;

use fiscal_domain::year_intent::{self, YearIntent};

use crate::{
	Coherence, Error, ExecutionPlan, FiscalService, PlanRequest, PlanStep, QueryPair, Result,
	RetrieveParams, prompts,
};

/// The planner model's verdict on one query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlannerOutput {
	pub revised_query: String,
	pub coherence: Coherence,
	pub coherence_reason: Option<String>,
}

pub fn parse_planner_output(raw: &str) -> Result<PlannerOutput> {
	let json: Value = serde_json::from_str(prompts::strip_code_fence(raw)).map_err(|err| {
		Error::InvalidResponse { message: format!("Planner output is not valid JSON: {err}") }
	})?;

	if !json.is_object() {
		return Err(Error::InvalidResponse {
			message: "Planner output must be a JSON object.".to_string(),
		});
	}

	let coherence = Coherence::from_label(json_text(&json, "coherence").as_deref().unwrap_or(""));
	let coherence_reason = json_text(&json, "coherence_reason").filter(|reason| !reason.is_empty());
	let revised_query = json_text(&json, "revised_query").unwrap_or_default();

	Ok(PlannerOutput { revised_query, coherence, coherence_reason })
}

fn json_text(json: &Value, key: &str) -> Option<String> {
	match json.get(key)? {
		Value::String(text) => Some(text.trim().to_string()),
		Value::Null => None,
		other => Some(other.to_string()),
	}
}

/// Assembles the single-pass plan once the planner model has answered.
///
/// An empty revision is an error for coherent queries and falls back to the original text for
/// incoherent ones. Explicitly requested years override the years found in the text.
pub fn assemble_plan(
	request: &PlanRequest,
	output: PlannerOutput,
	current_fiscal_year: i32,
	recent_year_window: u32,
) -> Result<ExecutionPlan> {
	let original_query = request.query.trim().to_string();
	let revised_query = match (output.revised_query.is_empty(), output.coherence) {
		(false, _) => output.revised_query,
		(true, Coherence::Incoherent) => original_query.clone(),
		(true, Coherence::Coherent) =>
			return Err(Error::InvalidResponse {
				message: "Planner returned an empty revised_query.".to_string(),
			}),
	};
	let inferred =
		year_intent::infer_year_intent(&original_query, &revised_query, current_fiscal_year);
	let year_intent = match request.requested_years.as_deref() {
		Some(years) if !years.is_empty() =>
			YearIntent::explicit(years.iter().copied(), inferred.broad_horizon),
		_ => inferred,
	};
	let pair = QueryPair { original_query: original_query.clone(), revised_query: revised_query.clone() };
	let steps = vec![
		PlanStep::Retrieve(RetrieveParams {
			original_query: original_query.clone(),
			revised_query: revised_query.clone(),
			year_intent: year_intent.clone(),
			recent_year_window,
		}),
		PlanStep::Rerank(pair.clone()),
		PlanStep::Synthesize(pair.clone()),
		PlanStep::Reflect(pair),
	];

	Ok(ExecutionPlan {
		original_query,
		revised_query,
		coherence: output.coherence,
		coherence_reason: output.coherence_reason,
		year_intent,
		top_k: request.top_k,
		top_n: request.top_n,
		steps,
	})
}

impl FiscalService {
	pub async fn build_plan(&self, request: &PlanRequest) -> Result<ExecutionPlan> {
		let cfg = &self.cfg;
		let original_query = request.query.trim();
		let payload = serde_json::json!({
			"original_query": original_query,
			"current_revised_query": original_query,
		});
		let messages = prompts::planner_messages(&payload);
		let raw = self.providers.generation.complete(&cfg.providers.planner, &messages).await?;
		let output = parse_planner_output(&raw)?;
		let plan = assemble_plan(request, output, self.current_fiscal_year(), cfg.recency.window)?;

		tracing::info!(
			coherence = plan.coherence.as_str(),
			year_mode = plan.year_intent.mode.as_str(),
			years = ?plan.year_intent.years,
			broad_horizon = plan.year_intent.broad_horizon,
			"Plan built."
		);

		Ok(plan)
	}
}
