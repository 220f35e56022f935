mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Confidence, Config, EmbeddingProviderConfig, GuardrailProviderConfig, Lexical,
	LlmProviderConfig, ProviderConfig, Providers, Qdrant, Recency, Rerank, Retrieval, Security,
	Service, Storage,
};

use std::{fs, path::Path};

pub const SUPPORTED_FUSION_STRATEGIES: [&str; 1] = ["rrf"];
pub const GUARDRAIL_POLICIES: [&str; 2] = ["block_safe_reply", "allow"];
/// Upper bound for `recency.window`, in fiscal years.
pub const MAX_RECENCY_WINDOW: u32 = 100;

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	parse(&raw).map_err(|err| match err {
		Error::ParseConfig { source, .. } => Error::ParseConfig { path: path.to_path_buf(), source },
		other => other,
	})
}

pub fn parse(raw: &str) -> Result<Config> {
	let mut cfg: Config = toml::from_str(raw)
		.map_err(|err| Error::ParseConfig { path: Default::default(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.storage.qdrant.collection.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.qdrant.collection must be non-empty.".to_string(),
		});
	}
	if cfg.storage.qdrant.vector_dim == 0 {
		return Err(Error::Validation {
			message: "storage.qdrant.vector_dim must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.storage.qdrant.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.qdrant.vector_dim."
				.to_string(),
		});
	}
	if cfg.lexical.artifact_path.trim().is_empty() {
		return Err(Error::Validation {
			message: "lexical.artifact_path must be non-empty.".to_string(),
		});
	}

	for (path, value) in [("lexical.k1", cfg.lexical.k1), ("lexical.b", cfg.lexical.b)] {
		if !value.is_finite() || value < 0.0 {
			return Err(Error::Validation {
				message: format!("{path} must be a finite number, zero or greater."),
			});
		}
	}

	for (path, value) in [
		("recency.window", cfg.recency.window),
		("retrieval.top_k", cfg.retrieval.top_k),
		("retrieval.rrf_k", cfg.retrieval.rrf_k),
		("rerank.top_n", cfg.rerank.top_n),
		("rerank.candidate_limit", cfg.rerank.candidate_limit),
	] {
		if value == 0 {
			return Err(Error::Validation { message: format!("{path} must be greater than zero.") });
		}
	}

	if cfg.recency.window > MAX_RECENCY_WINDOW {
		return Err(Error::Validation {
			message: format!("recency.window must be at most {MAX_RECENCY_WINDOW}."),
		});
	}
	if let Some(year) = cfg.recency.latest_fiscal_year
		&& year <= 0
	{
		return Err(Error::Validation {
			message: "recency.latest_fiscal_year must be greater than zero.".to_string(),
		});
	}
	if !SUPPORTED_FUSION_STRATEGIES.contains(&cfg.retrieval.fusion_strategy.as_str()) {
		return Err(Error::Validation {
			message: format!(
				"retrieval.fusion_strategy must be one of: rrf. Got {}.",
				cfg.retrieval.fusion_strategy
			),
		});
	}

	for (path, value) in [
		("retrieval.recency_boost", cfg.retrieval.recency_boost),
		("rerank.recency_boost", cfg.rerank.recency_boost),
		("confidence.strong", cfg.confidence.strong),
		("confidence.medium", cfg.confidence.medium),
		("confidence.low", cfg.confidence.low),
		("confidence.very_low", cfg.confidence.very_low),
	] {
		if !value.is_finite() {
			return Err(Error::Validation { message: format!("{path} must be a finite number.") });
		}
		if !(0.0..=1.0).contains(&value) {
			return Err(Error::Validation {
				message: format!("{path} must be in the range 0.0-1.0."),
			});
		}
	}

	let confidence = &cfg.confidence;

	if !(confidence.very_low < confidence.low
		&& confidence.low < confidence.medium
		&& confidence.medium < confidence.strong)
	{
		return Err(Error::Validation {
			message: "confidence thresholds must satisfy very_low < low < medium < strong."
				.to_string(),
		});
	}

	for (label, llm) in [
		("planner", &cfg.providers.planner),
		("synthesis", &cfg.providers.synthesis),
		("reflection", &cfg.providers.reflection),
	] {
		if !llm.temperature.is_finite() || !(0.0..=2.0).contains(&llm.temperature) {
			return Err(Error::Validation {
				message: format!("providers.{label}.temperature must be in the range 0.0-2.0."),
			});
		}
	}

	for (label, base, key) in [
		("embedding", &cfg.providers.embedding.api_base, &cfg.providers.embedding.api_key),
		("rerank", &cfg.providers.rerank.api_base, &cfg.providers.rerank.api_key),
		("planner", &cfg.providers.planner.api_base, &cfg.providers.planner.api_key),
		("synthesis", &cfg.providers.synthesis.api_base, &cfg.providers.synthesis.api_key),
		("reflection", &cfg.providers.reflection.api_base, &cfg.providers.reflection.api_key),
	] {
		if base.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_base must be non-empty."),
			});
		}
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}

	let guardrails = &cfg.providers.guardrails;

	if guardrails.enabled && guardrails.api_base.trim().is_empty() {
		return Err(Error::Validation {
			message: "providers.guardrails.api_base must be non-empty when enabled.".to_string(),
		});
	}

	for (path, policy) in [
		("providers.guardrails.input_policy", &guardrails.input_policy),
		("providers.guardrails.output_policy", &guardrails.output_policy),
	] {
		if !GUARDRAIL_POLICIES.contains(&policy.as_str()) {
			return Err(Error::Validation {
				message: format!("{path} must be one of block_safe_reply or allow."),
			});
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	cfg.retrieval.fusion_strategy = cfg.retrieval.fusion_strategy.trim().to_ascii_lowercase();
	cfg.providers.guardrails.input_policy =
		cfg.providers.guardrails.input_policy.trim().to_ascii_lowercase();
	cfg.providers.guardrails.output_policy =
		cfg.providers.guardrails.output_policy.trim().to_ascii_lowercase();
}
