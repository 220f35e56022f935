use serde::{Deserialize, Serialize};

use fiscal_domain::year_intent::YearIntent;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalSource {
	Dense,
	Sparse,
}
impl RetrievalSource {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Dense => "dense",
			Self::Sparse => "sparse",
		}
	}
}

/// How a hit was found and scored, kept for auditing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
	pub retrieval_sources: Vec<RetrievalSource>,
	pub dense_rank: Option<u32>,
	pub dense_score: Option<f32>,
	pub sparse_rank: Option<u32>,
	pub sparse_score: Option<f32>,
	pub rrf_score: f32,
	pub retrieval_recency_boost: f32,
	pub merged_score: f32,
	pub year_expr: Option<String>,
	pub fused_rank: Option<u32>,
	pub rerank_raw_score: Option<f32>,
	pub rerank_recency_boost: Option<f32>,
}
impl Provenance {
	pub fn best_rank(&self) -> u32 {
		self.dense_rank.into_iter().chain(self.sparse_rank).min().unwrap_or(u32::MAX)
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvidenceHit {
	pub chunk_id: String,
	pub source_path: String,
	pub text: String,
	pub score: f32,
	pub doc_type: Option<String>,
	pub financial_year: Option<i32>,
	pub provenance: Provenance,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Coherence {
	Coherent,
	Incoherent,
}
impl Coherence {
	/// Only an exact `incoherent` label (case-insensitive) rejects a query.
	pub fn from_label(label: &str) -> Self {
		if label.trim().eq_ignore_ascii_case("incoherent") {
			Self::Incoherent
		} else {
			Self::Coherent
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Coherent => "coherent",
			Self::Incoherent => "incoherent",
		}
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetrieveParams {
	pub original_query: String,
	pub revised_query: String,
	pub year_intent: YearIntent,
	pub recent_year_window: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPair {
	pub original_query: String,
	pub revised_query: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", content = "params", rename_all = "snake_case")]
pub enum PlanStep {
	Retrieve(RetrieveParams),
	Rerank(QueryPair),
	Synthesize(QueryPair),
	Reflect(QueryPair),
}
impl PlanStep {
	pub fn name(&self) -> &'static str {
		match self {
			Self::Retrieve(_) => "retrieve",
			Self::Rerank(_) => "rerank",
			Self::Synthesize(_) => "synthesize",
			Self::Reflect(_) => "reflect",
		}
	}
}

/// Single-pass plan. Built once per request and never mutated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPlan {
	pub original_query: String,
	pub revised_query: String,
	pub coherence: Coherence,
	pub coherence_reason: Option<String>,
	pub year_intent: YearIntent,
	pub top_k: u32,
	pub top_n: u32,
	pub steps: Vec<PlanStep>,
}
impl ExecutionPlan {
	pub fn retrieve_params(&self) -> Option<&RetrieveParams> {
		self.steps.iter().find_map(|step| match step {
			PlanStep::Retrieve(params) => Some(params),
			_ => None,
		})
	}
}

/// Inputs the planner needs for one request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanRequest {
	pub query: String,
	pub top_k: u32,
	pub top_n: u32,
	pub requested_years: Option<Vec<i32>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReflectionReason {
	Ok,
	LowCoverage,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reflection {
	pub reason: ReflectionReason,
	pub confidence: f32,
	pub comments: String,
	pub applicability_note: String,
	pub uncertainty_note: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestrationState {
	Executing,
	Success,
	Fail,
}
impl OrchestrationState {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Executing => "executing",
			Self::Success => "success",
			Self::Fail => "fail",
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionReason {
	ConfidenceHigh,
	ConfidenceMediumCaveated,
	ConfidenceLowPartial,
	ConfidenceTooLowClarify,
	GuardrailBlock,
	IncoherentQuery,
	PromptInjectionDetected,
}
impl TransitionReason {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::ConfidenceHigh => "confidence_high",
			Self::ConfidenceMediumCaveated => "confidence_medium_caveated",
			Self::ConfidenceLowPartial => "confidence_low_partial",
			Self::ConfidenceTooLowClarify => "confidence_too_low_clarify",
			Self::GuardrailBlock => "guardrail_block",
			Self::IncoherentQuery => "incoherent_query",
			Self::PromptInjectionDetected => "prompt_injection_detected",
		}
	}
}
