use color_eyre::{Result, eyre};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardrailVerdict {
	pub passed: bool,
	#[serde(default)]
	pub reason: Option<String>,
}

/// Validates `text` at pipeline `stage` against the safety service.
pub async fn check(
	cfg: &fiscal_config::GuardrailProviderConfig,
	stage: &str,
	text: &str,
) -> Result<GuardrailVerdict> {
	let client = crate::http_client(cfg.timeout_ms)?;
	let body = serde_json::json!({ "stage": stage, "text": text });
	let res = client
		.post(crate::endpoint(&cfg.api_base, &cfg.path))
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_guardrail_response(json)
}

fn parse_guardrail_response(json: Value) -> Result<GuardrailVerdict> {
	if json.get("passed").and_then(|v| v.as_bool()).is_none() {
		return Err(eyre::eyre!("Guardrail response is missing passed flag."));
	}

	Ok(serde_json::from_value(json)?)
}
