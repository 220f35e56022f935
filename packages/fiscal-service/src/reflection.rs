use serde_json::Value;

use fiscal_domain::confidence;

use crate::{
	Error, EvidenceHit, FiscalService, Reflection, ReflectionReason, Result,
	guardrails::{GuardrailStage, Guardrails},
	prompts,
};

pub const DEFAULT_APPLICABILITY_NOTE: &str = "Applicability is unclear from available evidence.";
pub const DEFAULT_UNCERTAINTY_NOTE: &str = "Evidence is incomplete; verify scope and year details.";

/// Parses the reflection verdict. Unknown reasons become `low_coverage`; confidence is clamped
/// into [0, 1]; blank notes get defaults.
pub fn parse_reflection(raw: &str) -> Result<Reflection> {
	let json: Value = serde_json::from_str(prompts::strip_code_fence(raw)).map_err(|err| {
		Error::InvalidResponse { message: format!("Reflection output is not valid JSON: {err}") }
	})?;

	if !json.is_object() {
		return Err(Error::InvalidResponse {
			message: "Reflection output must be a JSON object.".to_string(),
		});
	}

	let reason = match json.get("reason") {
		None => ReflectionReason::Ok,
		Some(Value::String(text)) if text.trim() == "ok" => ReflectionReason::Ok,
		Some(_) => ReflectionReason::LowCoverage,
	};
	let confidence = match json.get("confidence") {
		None | Some(Value::Null) => 0.0,
		Some(Value::Number(number)) => number.as_f64().unwrap_or_default() as f32,
		Some(Value::String(text)) => text.trim().parse::<f32>().map_err(|_| Error::InvalidResponse {
			message: format!("Reflection confidence {text:?} is not a number."),
		})?,
		Some(other) =>
			return Err(Error::InvalidResponse {
				message: format!("Reflection confidence {other} is not a number."),
			}),
	};
	let applicability_note = note(&json, "applicability_note", DEFAULT_APPLICABILITY_NOTE);
	let uncertainty_note = note(&json, "uncertainty_note", DEFAULT_UNCERTAINTY_NOTE);

	Ok(Reflection {
		reason,
		confidence: confidence::clamp_confidence(confidence),
		comments: format!("{applicability_note} {uncertainty_note}"),
		applicability_note,
		uncertainty_note,
	})
}

fn note(json: &Value, key: &str, default: &str) -> String {
	json.get(key)
		.and_then(Value::as_str)
		.map(str::trim)
		.filter(|text| !text.is_empty())
		.unwrap_or(default)
		.to_string()
}

impl FiscalService {
	pub async fn reflect_answer(
		&self,
		original_query: &str,
		revised_query: &str,
		answer: &str,
		hits: &[EvidenceHit],
	) -> Result<Reflection> {
		let cfg = &self.cfg;
		let messages =
			prompts::reflection_messages(original_query, revised_query, answer, hits.len());
		let raw = self.providers.generation.complete(&cfg.providers.reflection, &messages).await?;
		let guarded = Guardrails::new(&cfg.providers.guardrails, self.providers.guardrail.as_ref())
			.guard_output(GuardrailStage::Reflect, raw.trim())
			.await?;

		parse_reflection(&guarded)
	}
}
