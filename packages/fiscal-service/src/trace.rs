use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	ExecutionPlan, OrchestrationState, Reflection, RetrieveParams, TransitionReason,
};
use fiscal_config::Config;

pub const ANSWER_PREVIEW_CHARS: usize = 200;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TraceStep {
	pub state: OrchestrationState,
	pub original_query: String,
	pub revised_query: String,
	pub retrieved: usize,
	pub reranked: usize,
	pub answer_preview: String,
	pub reflection: Reflection,
	pub retrieve_params: Option<RetrieveParams>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceTransition {
	pub to: OrchestrationState,
	pub reason: TransitionReason,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardrailEvent {
	pub stage: String,
	pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoherenceEvent {
	pub label: String,
	pub reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectionEvent {
	pub matched_rules: Vec<String>,
}

/// Per-request audit record. Never shared between requests.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrchestrationTrace {
	pub trace_id: Uuid,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	pub policy_hash: String,
	pub plan: Option<ExecutionPlan>,
	pub steps: Vec<TraceStep>,
	pub transitions: Vec<TraceTransition>,
	pub final_state: Option<OrchestrationState>,
	pub final_reason: Option<TransitionReason>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub guardrail_event: Option<GuardrailEvent>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub coherence: Option<CoherenceEvent>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub injection: Option<InjectionEvent>,
}
impl OrchestrationTrace {
	pub fn new(policy_hash: String) -> Self {
		Self {
			trace_id: Uuid::new_v4(),
			created_at: OffsetDateTime::now_utc(),
			policy_hash,
			plan: None,
			steps: Vec::new(),
			transitions: Vec::new(),
			final_state: None,
			final_reason: None,
			guardrail_event: None,
			coherence: None,
			injection: None,
		}
	}

	pub fn finish(&mut self, state: OrchestrationState, reason: TransitionReason) {
		self.transitions.push(TraceTransition { to: state, reason });

		self.final_state = Some(state);
		self.final_reason = Some(reason);
	}
}

/// First [`ANSWER_PREVIEW_CHARS`] characters of an answer.
pub fn answer_preview(answer: &str) -> String {
	answer.chars().take(ANSWER_PREVIEW_CHARS).collect()
}

/// The ranking and banding settings that shape an answer.
pub fn policy_snapshot(cfg: &Config) -> Value {
	serde_json::json!({
		"recency": {
			"window": cfg.recency.window,
			"latest_fiscal_year": cfg.recency.latest_fiscal_year,
		},
		"retrieval": {
			"top_k": cfg.retrieval.top_k,
			"fy_filtering_enabled": cfg.retrieval.fy_filtering_enabled,
			"recency_boost": cfg.retrieval.recency_boost,
			"fusion_strategy": cfg.retrieval.fusion_strategy,
			"rrf_k": cfg.retrieval.rrf_k,
		},
		"rerank": {
			"top_n": cfg.rerank.top_n,
			"candidate_limit": cfg.rerank.candidate_limit,
			"recency_boost": cfg.rerank.recency_boost,
		},
		"confidence": {
			"strong": cfg.confidence.strong,
			"medium": cfg.confidence.medium,
			"low": cfg.confidence.low,
			"very_low": cfg.confidence.very_low,
		},
	})
}

pub fn policy_hash(cfg: &Config) -> String {
	let raw = policy_snapshot(cfg).to_string();

	blake3::hash(raw.as_bytes()).to_hex().to_string()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn preview_counts_characters_not_bytes() {
		let answer = "é".repeat(250);
		let preview = answer_preview(&answer);

		assert_eq!(preview.chars().count(), ANSWER_PREVIEW_CHARS);
		assert_eq!(answer_preview("short"), "short");
	}

	#[test]
	fn finish_records_terminal_transition() {
		let mut trace = OrchestrationTrace::new("hash".to_string());

		trace.finish(OrchestrationState::Success, TransitionReason::ConfidenceHigh);

		assert_eq!(trace.transitions.len(), 1);
		assert_eq!(trace.final_state, Some(OrchestrationState::Success));
		assert_eq!(trace.final_reason, Some(TransitionReason::ConfidenceHigh));
	}

	#[test]
	fn trace_serializes_timestamp_as_rfc3339() {
		let trace = OrchestrationTrace::new("hash".to_string());
		let json = serde_json::to_value(&trace).expect("Failed to serialize trace.");
		let created_at = json["created_at"].as_str().expect("Missing created_at.");

		assert!(created_at.contains('T'));
		assert!(json.get("guardrail_event").is_none());

		let decoded: OrchestrationTrace =
			serde_json::from_value(json).expect("Failed to decode trace.");

		assert_eq!(decoded.trace_id, trace.trace_id);
	}
}
