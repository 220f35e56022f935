//! Single-pass, confidence-gated orchestration.
//!
//! A run moves from `executing` to exactly one terminal state. Incoherent queries are rejected
//! before execution and record only `fail`. Guardrail blocks end in `fail` with the guardrail's
//! own safe reply; every confidence band ends in `success`.

use serde::Serialize;

use fiscal_config::Config;
use fiscal_domain::confidence::{ConfidenceBand, ConfidenceThresholds};

use crate::{
	BoxFuture, Coherence, Error, EvidenceHit, ExecutionPlan, FiscalService, OrchestrationState,
	PlanRequest, Reflection, Result, RetrieveParams, TransitionReason,
	trace::{self, CoherenceEvent, GuardrailEvent, OrchestrationTrace, TraceStep},
};

pub const INCOHERENT_QUERY_REPLY: &str = "Sorry, I couldn't interpret the query clearly. Please restate your goal and include a financial year scope (for example: 'Summarize FY2025 productivity measures for SMEs').";

pub trait PlanBuilder
where
	Self: Send + Sync,
{
	fn plan<'a>(&'a self, request: &'a PlanRequest) -> BoxFuture<'a, Result<ExecutionPlan>>;
}

pub trait Specialists
where
	Self: Send + Sync,
{
	fn retrieve<'a>(
		&'a self,
		query: &'a str,
		top_k: u32,
		params: &'a RetrieveParams,
	) -> BoxFuture<'a, Result<Vec<EvidenceHit>>>;

	fn rerank<'a>(
		&'a self,
		query: &'a str,
		hits: Vec<EvidenceHit>,
		top_n: u32,
	) -> BoxFuture<'a, Result<Vec<EvidenceHit>>>;

	fn synthesize<'a>(
		&'a self,
		original_query: &'a str,
		revised_query: &'a str,
		hits: &'a [EvidenceHit],
	) -> BoxFuture<'a, Result<String>>;

	fn reflect<'a>(
		&'a self,
		original_query: &'a str,
		revised_query: &'a str,
		answer: &'a str,
		hits: &'a [EvidenceHit],
	) -> BoxFuture<'a, Result<Reflection>>;
}

#[derive(Clone, Debug, Serialize)]
pub struct OrchestrationResult {
	pub answer: String,
	pub confidence: f32,
	pub band: Option<ConfidenceBand>,
	pub state_history: Vec<OrchestrationState>,
	pub final_reason: TransitionReason,
	pub reflection: Option<Reflection>,
	pub evidence: Vec<EvidenceHit>,
	pub trace: OrchestrationTrace,
}

struct Execution {
	retrieved: usize,
	hits: Vec<EvidenceHit>,
	answer: String,
	reflection: Reflection,
}

pub struct Manager {
	thresholds: ConfidenceThresholds,
	policy_hash: String,
}
impl Manager {
	pub fn new(cfg: &Config) -> Self {
		Self {
			thresholds: ConfidenceThresholds::from(&cfg.confidence),
			policy_hash: trace::policy_hash(cfg),
		}
	}

	pub fn with_thresholds(thresholds: ConfidenceThresholds, policy_hash: String) -> Self {
		Self { thresholds, policy_hash }
	}

	/// Runs one request. Upstream failures propagate; guardrail blocks and incoherent queries
	/// resolve to a `fail` result.
	pub async fn run(
		&self,
		request: &PlanRequest,
		planner: &dyn PlanBuilder,
		specialists: &dyn Specialists,
	) -> Result<OrchestrationResult> {
		let mut trace = OrchestrationTrace::new(self.policy_hash.clone());
		let plan = planner.plan(request).await?;

		if plan.coherence == Coherence::Incoherent {
			return Ok(reject_incoherent(plan, trace));
		}

		trace.plan = Some(plan.clone());

		let mut state_history = vec![OrchestrationState::Executing];

		match execute(&plan, specialists).await {
			Ok(execution) => {
				let confidence = execution.reflection.confidence;
				let band = self.thresholds.band(confidence);
				let reason = band_transition(band);

				trace.steps.push(TraceStep {
					state: OrchestrationState::Executing,
					original_query: plan.original_query.clone(),
					revised_query: plan.revised_query.clone(),
					retrieved: execution.retrieved,
					reranked: execution.hits.len(),
					answer_preview: trace::answer_preview(&execution.answer),
					reflection: execution.reflection.clone(),
					retrieve_params: plan.retrieve_params().cloned(),
				});
				trace.finish(OrchestrationState::Success, reason);
				state_history.push(OrchestrationState::Success);

				tracing::info!(
					trace_id = %trace.trace_id,
					band = band.as_str(),
					confidence,
					reason = reason.as_str(),
					"Run finished."
				);

				let answer = terminal_answer(
					OrchestrationState::Success,
					reason,
					false,
					execution.answer,
				);

				Ok(OrchestrationResult {
					answer,
					confidence,
					band: Some(band),
					state_history,
					final_reason: reason,
					reflection: Some(execution.reflection),
					evidence: execution.hits,
					trace,
				})
			},
			Err(Error::Guardrail(violation)) => {
				trace.guardrail_event =
					Some(GuardrailEvent { stage: violation.stage.clone(), reason: violation.reason });
				trace.finish(OrchestrationState::Fail, TransitionReason::GuardrailBlock);
				state_history.push(OrchestrationState::Fail);

				tracing::warn!(
					trace_id = %trace.trace_id,
					stage = %violation.stage,
					"Run blocked by guardrail."
				);

				let answer = terminal_answer(
					OrchestrationState::Fail,
					TransitionReason::GuardrailBlock,
					true,
					violation.safe_reply,
				);

				Ok(OrchestrationResult {
					answer,
					confidence: 0.0,
					band: None,
					state_history,
					final_reason: TransitionReason::GuardrailBlock,
					reflection: None,
					evidence: Vec::new(),
					trace,
				})
			},
			Err(err) => Err(err),
		}
	}
}

async fn execute(plan: &ExecutionPlan, specialists: &dyn Specialists) -> Result<Execution> {
	let params = plan.retrieve_params().ok_or_else(|| Error::InvalidRequest {
		message: "Execution plan has no retrieve step.".to_string(),
	})?;
	let query = plan.revised_query.as_str();
	let retrieved = specialists.retrieve(query, plan.top_k, params).await?;
	let retrieved_count = retrieved.len();
	let hits = specialists.rerank(query, retrieved, plan.top_n).await?;
	let answer = specialists.synthesize(&plan.original_query, query, &hits).await?;
	let reflection = specialists.reflect(&plan.original_query, query, &answer, &hits).await?;

	Ok(Execution { retrieved: retrieved_count, hits, answer, reflection })
}

fn reject_incoherent(plan: ExecutionPlan, mut trace: OrchestrationTrace) -> OrchestrationResult {
	trace.coherence = Some(CoherenceEvent {
		label: Coherence::Incoherent.as_str().to_string(),
		reason: plan.coherence_reason.clone(),
	});
	trace.plan = Some(plan);
	trace.finish(OrchestrationState::Fail, TransitionReason::IncoherentQuery);

	tracing::info!(trace_id = %trace.trace_id, "Incoherent query rejected.");

	OrchestrationResult {
		answer: INCOHERENT_QUERY_REPLY.to_string(),
		confidence: 0.0,
		band: None,
		state_history: vec![OrchestrationState::Fail],
		final_reason: TransitionReason::IncoherentQuery,
		reflection: None,
		evidence: Vec::new(),
		trace,
	}
}

pub fn band_transition(band: ConfidenceBand) -> TransitionReason {
	match band {
		ConfidenceBand::High => TransitionReason::ConfidenceHigh,
		ConfidenceBand::Medium => TransitionReason::ConfidenceMediumCaveated,
		ConfidenceBand::Low => TransitionReason::ConfidenceLowPartial,
		ConfidenceBand::VeryLow => TransitionReason::ConfidenceTooLowClarify,
	}
}

/// Final answer text. A guardrail block keeps its safe reply; any other `fail` gets the polite
/// fallback naming the reason.
pub fn terminal_answer(
	state: OrchestrationState,
	reason: TransitionReason,
	guardrail_event: bool,
	answer: String,
) -> String {
	if guardrail_event || state != OrchestrationState::Fail {
		return answer;
	}

	polite_fallback(reason)
}

pub fn polite_fallback(reason: TransitionReason) -> String {
	format!(
		"Sorry, I can't answer this confidently yet. Reason: {}. Please clarify the objective and narrow the financial year scope (for example: 'FY2025 productivity support for SMEs').",
		reason.as_str()
	)
}

impl PlanBuilder for FiscalService {
	fn plan<'a>(&'a self, request: &'a PlanRequest) -> BoxFuture<'a, Result<ExecutionPlan>> {
		Box::pin(self.build_plan(request))
	}
}

impl Specialists for FiscalService {
	fn retrieve<'a>(
		&'a self,
		query: &'a str,
		top_k: u32,
		params: &'a RetrieveParams,
	) -> BoxFuture<'a, Result<Vec<EvidenceHit>>> {
		Box::pin(self.retrieve_evidence(query, top_k, params))
	}

	fn rerank<'a>(
		&'a self,
		query: &'a str,
		hits: Vec<EvidenceHit>,
		top_n: u32,
	) -> BoxFuture<'a, Result<Vec<EvidenceHit>>> {
		Box::pin(self.rerank_evidence(query, hits, top_n))
	}

	fn synthesize<'a>(
		&'a self,
		original_query: &'a str,
		revised_query: &'a str,
		hits: &'a [EvidenceHit],
	) -> BoxFuture<'a, Result<String>> {
		Box::pin(self.synthesize_answer(original_query, revised_query, hits))
	}

	fn reflect<'a>(
		&'a self,
		original_query: &'a str,
		revised_query: &'a str,
		answer: &'a str,
		hits: &'a [EvidenceHit],
	) -> BoxFuture<'a, Result<Reflection>> {
		Box::pin(self.reflect_answer(original_query, revised_query, answer, hits))
	}
}
