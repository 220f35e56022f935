pub mod ask;
pub mod guardrails;
pub mod manager;
pub mod planner;
pub mod prompts;
pub mod reflection;
pub mod rerank;
pub mod retrieval;
pub mod synthesis;
pub mod time_serde;
pub mod trace;

mod error;
mod types;

pub use ask::{AskRequest, AskResponse};
pub use error::{Error, GuardrailViolation, Result};
pub use fiscal_providers::guardrail::GuardrailVerdict;
pub use fiscal_storage::payload::IndexHit;
pub use manager::{Manager, OrchestrationResult, PlanBuilder, Specialists};
pub use trace::OrchestrationTrace;
pub use types::{
	Coherence, EvidenceHit, ExecutionPlan, OrchestrationState, PlanRequest, PlanStep,
	Provenance, QueryPair, Reflection, ReflectionReason, RetrievalSource, RetrieveParams,
	TransitionReason,
};

use std::{future::Future, path::Path, pin::Pin, sync::Arc};

use serde::Serialize;
use serde_json::Value;
use tokio::sync::OnceCell;

use fiscal_config::{
	Config, EmbeddingProviderConfig, GuardrailProviderConfig, LlmProviderConfig, ProviderConfig,
};
use fiscal_domain::year_intent::YearFilter;
use fiscal_lexical::{LexicalScorer, SparseVector};
use fiscal_providers::{embedding, generation, guardrail, rerank as rerank_provider};
use fiscal_storage::qdrant::QdrantStore;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>>;
}

pub trait RerankProvider
where
	Self: Send + Sync,
{
	fn rerank<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		query: &'a str,
		docs: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<f32>>>;
}

pub trait GenerationProvider
where
	Self: Send + Sync,
{
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, color_eyre::Result<String>>;
}

pub trait GuardrailProvider
where
	Self: Send + Sync,
{
	fn check<'a>(
		&'a self,
		cfg: &'a GuardrailProviderConfig,
		stage: &'a str,
		text: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<GuardrailVerdict>>;
}

/// Nearest-neighbour search over the indexed budget chunks.
pub trait VectorIndex
where
	Self: Send + Sync,
{
	fn search_dense<'a>(
		&'a self,
		vector: &'a [f32],
		limit: u32,
		filter: &'a YearFilter,
	) -> BoxFuture<'a, Result<Vec<IndexHit>>>;

	fn search_sparse<'a>(
		&'a self,
		vector: &'a SparseVector,
		limit: u32,
		filter: &'a YearFilter,
	) -> BoxFuture<'a, Result<Vec<IndexHit>>>;

	fn ensure_ready(&self) -> BoxFuture<'_, Result<()>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub rerank: Arc<dyn RerankProvider>,
	pub generation: Arc<dyn GenerationProvider>,
	pub guardrail: Arc<dyn GuardrailProvider>,
}
impl Default for Providers {
	fn default() -> Self {
		Self {
			embedding: Arc::new(DefaultProviders),
			rerank: Arc::new(DefaultProviders),
			generation: Arc::new(DefaultProviders),
			guardrail: Arc::new(DefaultProviders),
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
	Ok,
	Degraded,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthReport {
	pub status: HealthStatus,
	pub ready: bool,
	pub message: String,
}

pub struct FiscalService {
	pub cfg: Config,
	pub index: Arc<dyn VectorIndex>,
	pub providers: Providers,
	lexical: OnceCell<Arc<LexicalScorer>>,
}
impl FiscalService {
	/// Connects the configured Qdrant collection and HTTP providers.
	pub fn new(cfg: Config) -> Result<Self> {
		let store = QdrantStore::new(&cfg.storage.qdrant)?;

		Ok(Self::with_parts(cfg, Arc::new(store), Providers::default()))
	}

	pub fn with_parts(cfg: Config, index: Arc<dyn VectorIndex>, providers: Providers) -> Self {
		Self { cfg, index, providers, lexical: OnceCell::new() }
	}

	/// Uses an already fitted scorer instead of loading `lexical.artifact_path`.
	pub fn with_lexical(mut self, scorer: LexicalScorer) -> Self {
		self.lexical = OnceCell::new_with(Some(Arc::new(scorer)));

		self
	}

	/// Fitted lexical table, loaded from disk once per process on first use.
	pub async fn lexical(&self) -> Result<Arc<LexicalScorer>> {
		let scorer = self
			.lexical
			.get_or_try_init(|| async {
				let path = Path::new(&self.cfg.lexical.artifact_path);
				let mut scorer = LexicalScorer::load(path)?;

				scorer.set_params(self.cfg.lexical.k1, self.cfg.lexical.b);

				tracing::info!(
					artifact = %path.display(),
					vocab_size = scorer.vocab_size(),
					doc_count = scorer.doc_count(),
					"Lexical table loaded."
				);

				Ok::<_, Error>(Arc::new(scorer))
			})
			.await?;

		Ok(scorer.clone())
	}

	/// Fails when the lexical table or the vector collection is unavailable.
	pub async fn ensure_ready(&self) -> Result<()> {
		self.lexical().await.map_err(|err| Error::Readiness { message: err.to_string() })?;
		self.index.ensure_ready().await.map_err(|err| match err {
			Error::Readiness { message } => Error::Readiness { message },
			other => Error::Readiness { message: other.to_string() },
		})?;

		Ok(())
	}

	pub async fn health(&self) -> HealthReport {
		match self.ensure_ready().await {
			Ok(()) => HealthReport {
				status: HealthStatus::Ok,
				ready: true,
				message: "ready".to_string(),
			},
			Err(err) => {
				tracing::warn!(error = %err, "Readiness check failed.");

				HealthReport { status: HealthStatus::Degraded, ready: false, message: err.to_string() }
			},
		}
	}

	/// Baseline fiscal year for year filters and recency tiers.
	pub fn current_fiscal_year(&self) -> i32 {
		self.cfg.recency.latest_fiscal_year.unwrap_or_else(|| time::OffsetDateTime::now_utc().year())
	}
}

struct DefaultProviders;
impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		Box::pin(embedding::embed(cfg, texts))
	}
}
impl RerankProvider for DefaultProviders {
	fn rerank<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		query: &'a str,
		docs: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<f32>>> {
		Box::pin(rerank_provider::rerank(cfg, query, docs))
	}
}
impl GenerationProvider for DefaultProviders {
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		Box::pin(generation::complete(cfg, messages))
	}
}
impl GuardrailProvider for DefaultProviders {
	fn check<'a>(
		&'a self,
		cfg: &'a GuardrailProviderConfig,
		stage: &'a str,
		text: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<GuardrailVerdict>> {
		Box::pin(guardrail::check(cfg, stage, text))
	}
}

impl VectorIndex for QdrantStore {
	fn search_dense<'a>(
		&'a self,
		vector: &'a [f32],
		limit: u32,
		filter: &'a YearFilter,
	) -> BoxFuture<'a, Result<Vec<IndexHit>>> {
		Box::pin(async move { Ok(QdrantStore::search_dense(self, vector, limit, filter).await?) })
	}

	fn search_sparse<'a>(
		&'a self,
		vector: &'a SparseVector,
		limit: u32,
		filter: &'a YearFilter,
	) -> BoxFuture<'a, Result<Vec<IndexHit>>> {
		Box::pin(async move { Ok(QdrantStore::search_sparse(self, vector, limit, filter).await?) })
	}

	fn ensure_ready(&self) -> BoxFuture<'_, Result<()>> {
		Box::pin(async move { Ok(QdrantStore::ensure_ready(self).await?) })
	}
}
