use fiscal_config::GuardrailProviderConfig;

use crate::{Error, GuardrailProvider, GuardrailViolation, Result};

pub const POLICY_BLOCK_SAFE_REPLY: &str = "block_safe_reply";
pub const VALIDATION_FAILED: &str = "guardrails_validation_failed";

const INPUT_SAFE_REPLY: &str = "Sorry, I can't process that request as written because it did not pass our safety checks. Please remove sensitive personal details or harmful language and try again.";
const OUTPUT_SAFE_REPLY: &str =
	"Sorry, I can't provide that response safely. Please rephrase your request with non-sensitive details.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardrailStage {
	Input,
	Synthesize,
	Reflect,
}
impl GuardrailStage {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Input => "input",
			Self::Synthesize => "synthesize",
			Self::Reflect => "reflect",
		}
	}

	pub fn safe_reply(self) -> &'static str {
		match self {
			Self::Input => INPUT_SAFE_REPLY,
			Self::Synthesize | Self::Reflect => OUTPUT_SAFE_REPLY,
		}
	}
}

/// Input and output safety checks with the configured block/allow policies.
pub struct Guardrails<'a> {
	cfg: &'a GuardrailProviderConfig,
	provider: &'a dyn GuardrailProvider,
}
impl<'a> Guardrails<'a> {
	pub fn new(cfg: &'a GuardrailProviderConfig, provider: &'a dyn GuardrailProvider) -> Self {
		Self { cfg, provider }
	}

	pub async fn guard_input(&self, text: &str) -> Result<String> {
		self.run(GuardrailStage::Input, &self.cfg.input_policy, text).await
	}

	pub async fn guard_output(&self, stage: GuardrailStage, text: &str) -> Result<String> {
		self.run(stage, &self.cfg.output_policy, text).await
	}

	async fn run(&self, stage: GuardrailStage, policy: &str, text: &str) -> Result<String> {
		if !self.cfg.enabled {
			return Ok(text.to_string());
		}

		let blocking = policy == POLICY_BLOCK_SAFE_REPLY;

		match self.provider.check(self.cfg, stage.as_str(), text).await {
			Ok(verdict) if verdict.passed => Ok(text.to_string()),
			Ok(verdict) => {
				let reason = verdict.reason.unwrap_or_else(|| VALIDATION_FAILED.to_string());

				if !blocking {
					tracing::warn!(
						stage = stage.as_str(),
						reason = %reason,
						"Guardrail flagged text; policy allows it."
					);

					return Ok(text.to_string());
				}

				Err(violation(stage, reason))
			},
			Err(err) => {
				if !blocking {
					tracing::warn!(
						stage = stage.as_str(),
						error = %err,
						"Guardrail check failed; policy allows it."
					);

					return Ok(text.to_string());
				}

				Err(violation(stage, format!("{VALIDATION_FAILED}:{err}")))
			},
		}
	}
}

fn violation(stage: GuardrailStage, reason: String) -> Error {
	tracing::warn!(stage = stage.as_str(), reason = %reason, "Guardrail blocked text.");

	Error::Guardrail(GuardrailViolation {
		stage: stage.as_str().to_string(),
		reason,
		safe_reply: stage.safe_reply().to_string(),
	})
}
