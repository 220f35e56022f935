use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub lexical: Lexical,
	pub providers: Providers,
	#[serde(default)]
	pub recency: Recency,
	#[serde(default)]
	pub retrieval: Retrieval,
	#[serde(default)]
	pub rerank: Rerank,
	#[serde(default)]
	pub confidence: Confidence,
	#[serde(default)]
	pub security: Security,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
	pub qdrant: Qdrant,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub collection: String,
	pub vector_dim: u32,
	#[serde(default = "default_qdrant_timeout_ms")]
	pub timeout_ms: u64,
	#[serde(default = "default_dense_vector")]
	pub dense_vector: String,
	#[serde(default = "default_sparse_vector")]
	pub sparse_vector: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Lexical {
	/// JSON artifact holding the fitted vocabulary and IDF table.
	pub artifact_path: String,
	#[serde(default = "default_k1")]
	pub k1: f32,
	#[serde(default = "default_b")]
	pub b: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub rerank: ProviderConfig,
	pub planner: LlmProviderConfig,
	pub synthesis: LlmProviderConfig,
	pub reflection: LlmProviderConfig,
	pub guardrails: GuardrailProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GuardrailProviderConfig {
	pub enabled: bool,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub timeout_ms: u64,
	#[serde(default = "default_guardrail_policy")]
	pub input_policy: String,
	#[serde(default = "default_guardrail_policy")]
	pub output_policy: String,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Recency {
	/// Trailing fiscal-year window shared by filtering and both boost stages.
	pub window: u32,
	/// Newest fiscal year present in the corpus. Falls back to the current UTC year.
	pub latest_fiscal_year: Option<i32>,
}
impl Default for Recency {
	fn default() -> Self {
		Self { window: 5, latest_fiscal_year: None }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Retrieval {
	pub top_k: u32,
	pub fy_filtering_enabled: bool,
	pub recency_boost: f32,
	pub fusion_strategy: String,
	pub rrf_k: u32,
}
impl Default for Retrieval {
	fn default() -> Self {
		Self {
			top_k: 200,
			fy_filtering_enabled: true,
			recency_boost: 0.8,
			fusion_strategy: "rrf".to_string(),
			rrf_k: 60,
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Rerank {
	pub top_n: u32,
	pub candidate_limit: u32,
	pub recency_boost: f32,
}
impl Default for Rerank {
	fn default() -> Self {
		Self { top_n: 100, candidate_limit: 100, recency_boost: 0.8 }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Confidence {
	pub strong: f32,
	pub medium: f32,
	pub low: f32,
	pub very_low: f32,
}
impl Default for Confidence {
	fn default() -> Self {
		Self { strong: 0.8, medium: 0.7, low: 0.5, very_low: 0.3 }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Security {
	pub prompt_injection_check: bool,
}
impl Default for Security {
	fn default() -> Self {
		Self { prompt_injection_check: true }
	}
}

fn default_qdrant_timeout_ms() -> u64 {
	10_000
}

fn default_dense_vector() -> String {
	"dense".to_string()
}

fn default_sparse_vector() -> String {
	"sparse".to_string()
}

fn default_k1() -> f32 {
	1.5
}

fn default_b() -> f32 {
	0.75
}

fn default_guardrail_policy() -> String {
	"block_safe_reply".to_string()
}
