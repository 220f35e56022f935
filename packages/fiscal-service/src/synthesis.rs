use serde_json::Value;

use crate::{
	Error, EvidenceHit, FiscalService, Result,
	guardrails::{GuardrailStage, Guardrails},
	prompts,
};

/// Evidence passed to the answer model is capped at this many hits.
pub const MAX_EVIDENCE_HITS: usize = 8;

pub fn evidence_payload(hits: &[EvidenceHit]) -> Value {
	Value::Array(
		hits.iter()
			.take(MAX_EVIDENCE_HITS)
			.map(|hit| {
				serde_json::json!({
					"source_path": hit.source_path,
					"financial_year": hit.financial_year,
					"text": hit.text,
					"score": hit.score,
				})
			})
			.collect(),
	)
}

impl FiscalService {
	pub async fn synthesize_answer(
		&self,
		original_query: &str,
		revised_query: &str,
		hits: &[EvidenceHit],
	) -> Result<String> {
		let cfg = &self.cfg;
		let messages =
			prompts::synthesis_messages(original_query, revised_query, &evidence_payload(hits));
		let raw = self.providers.generation.complete(&cfg.providers.synthesis, &messages).await?;
		let answer = raw.trim();

		if answer.is_empty() {
			return Err(Error::InvalidResponse {
				message: "Synthesis returned an empty answer.".to_string(),
			});
		}

		Guardrails::new(&cfg.providers.guardrails, self.providers.guardrail.as_ref())
			.guard_output(GuardrailStage::Synthesize, answer)
			.await
	}
}
