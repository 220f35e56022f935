//! Request-level entry point: validation, the prompt-injection gate, and per-request overrides.

use serde::{Deserialize, Serialize};

use fiscal_domain::{confidence::ConfidenceBand, injection};

use crate::{
	Error, EvidenceHit, FiscalService, OrchestrationState, PlanRequest, Result, TransitionReason,
	manager::{Manager, OrchestrationResult},
	trace::{self, InjectionEvent, OrchestrationTrace},
};

pub const INJECTION_REFUSAL: &str = "Sorry, I can't process that request because it appears to contain instruction or security override patterns. Please rephrase your question as a normal budget query.";

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct AskRequest {
	pub query: String,
	#[serde(default)]
	pub top_k: Option<u32>,
	#[serde(default)]
	pub top_n: Option<u32>,
	#[serde(default)]
	pub requested_years: Option<Vec<i32>>,
}

#[derive(Clone, Debug, Serialize)]
pub struct AskResponse {
	pub answer: String,
	pub confidence: f32,
	pub band: Option<ConfidenceBand>,
	pub state_history: Vec<OrchestrationState>,
	pub final_reason: TransitionReason,
	pub applicability_note: Option<String>,
	pub uncertainty_note: Option<String>,
	pub evidence: Vec<EvidenceHit>,
	pub trace: OrchestrationTrace,
}
impl From<OrchestrationResult> for AskResponse {
	fn from(result: OrchestrationResult) -> Self {
		let (applicability_note, uncertainty_note) = match result.reflection {
			Some(reflection) =>
				(Some(reflection.applicability_note), Some(reflection.uncertainty_note)),
			None => (None, None),
		};

		Self {
			answer: result.answer,
			confidence: result.confidence,
			band: result.band,
			state_history: result.state_history,
			final_reason: result.final_reason,
			applicability_note,
			uncertainty_note,
			evidence: result.evidence,
			trace: result.trace,
		}
	}
}

impl FiscalService {
	pub async fn ask(&self, req: AskRequest) -> Result<AskResponse> {
		let query = req.query.trim();

		if query.is_empty() {
			return Err(Error::InvalidRequest { message: "query must be non-empty.".to_string() });
		}
		if req.top_k == Some(0) {
			return Err(Error::InvalidRequest { message: "top_k must be greater than zero.".to_string() });
		}
		if req.top_n == Some(0) {
			return Err(Error::InvalidRequest { message: "top_n must be greater than zero.".to_string() });
		}
		if self.cfg.security.prompt_injection_check {
			let assessment = injection::assess_prompt_injection(query);

			if assessment.blocked {
				return Ok(self.refuse_injection(assessment.matched_rules));
			}
		}

		let request = PlanRequest {
			query: query.to_string(),
			top_k: req.top_k.unwrap_or(self.cfg.retrieval.top_k),
			top_n: req.top_n.unwrap_or(self.cfg.rerank.top_n),
			requested_years: req.requested_years,
		};
		let result = Manager::new(&self.cfg).run(&request, self, self).await?;

		Ok(result.into())
	}

	fn refuse_injection(&self, matched_rules: Vec<&'static str>) -> AskResponse {
		let mut trace = OrchestrationTrace::new(trace::policy_hash(&self.cfg));

		trace.injection = Some(InjectionEvent {
			matched_rules: matched_rules.iter().map(|rule| rule.to_string()).collect(),
		});
		trace.finish(OrchestrationState::Fail, TransitionReason::PromptInjectionDetected);

		tracing::warn!(
			trace_id = %trace.trace_id,
			rules = ?matched_rules,
			"Prompt injection blocked."
		);

		AskResponse {
			answer: INJECTION_REFUSAL.to_string(),
			confidence: 0.0,
			band: None,
			state_history: vec![OrchestrationState::Fail],
			final_reason: TransitionReason::PromptInjectionDetected,
			applicability_note: None,
			uncertainty_note: None,
			evidence: Vec::new(),
			trace,
		}
	}
}
