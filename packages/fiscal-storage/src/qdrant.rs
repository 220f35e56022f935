use std::time::Duration;

use qdrant_client::{
	Qdrant,
	qdrant::{Condition, Filter, Query, QueryPointsBuilder, Range, ScoredPoint, VectorInput},
};

use crate::{Error, Result, payload::{FIELD_FINANCIAL_YEAR, IndexHit}};
use fiscal_domain::year_intent::YearFilter;
use fiscal_lexical::SparseVector;

pub struct QdrantStore {
	pub client: Qdrant,
	pub collection: String,
	pub vector_dim: u32,
	pub dense_vector: String,
	pub sparse_vector: String,
}
impl QdrantStore {
	pub fn new(cfg: &fiscal_config::Qdrant) -> Result<Self> {
		let client =
			Qdrant::from_url(&cfg.url).timeout(Duration::from_millis(cfg.timeout_ms)).build()?;

		Ok(Self {
			client,
			collection: cfg.collection.clone(),
			vector_dim: cfg.vector_dim,
			dense_vector: cfg.dense_vector.clone(),
			sparse_vector: cfg.sparse_vector.clone(),
		})
	}

	/// Fails when the configured collection is missing or the server cannot be reached.
	pub async fn ensure_ready(&self) -> Result<()> {
		if !self.client.collection_exists(self.collection.as_str()).await? {
			return Err(Error::NotFound(format!("Qdrant collection {:?}.", self.collection)));
		}

		Ok(())
	}

	pub async fn search_dense(
		&self,
		vector: &[f32],
		limit: u32,
		filter: &YearFilter,
	) -> Result<Vec<IndexHit>> {
		if vector.len() != self.vector_dim as usize {
			return Err(Error::InvalidArgument(format!(
				"Dense query has {} dimensions, expected {}.",
				vector.len(),
				self.vector_dim
			)));
		}

		let points = self
			.query(Query::new_nearest(vector.to_vec()), self.dense_vector.as_str(), limit, filter)
			.await?;

		Ok(decode_points(&points))
	}

	/// Sparse lexical search. An empty query vector returns no hits without a round trip.
	pub async fn search_sparse(
		&self,
		vector: &SparseVector,
		limit: u32,
		filter: &YearFilter,
	) -> Result<Vec<IndexHit>> {
		if vector.is_empty() {
			return Ok(Vec::new());
		}

		let input = VectorInput::new_sparse(vector.indices(), vector.values());
		let points =
			self.query(Query::new_nearest(input), self.sparse_vector.as_str(), limit, filter).await?;

		Ok(decode_points(&points))
	}

	async fn query(
		&self,
		query: Query,
		using: &str,
		limit: u32,
		filter: &YearFilter,
	) -> Result<Vec<ScoredPoint>> {
		let mut search = QueryPointsBuilder::new(self.collection.clone())
			.query(query)
			.using(using)
			.limit(limit.max(1) as u64)
			.with_payload(true);

		if let Some(filter) = year_filter_to_qdrant(filter) {
			search = search.filter(filter);
		}

		let response = self.client.query(search).await?;

		tracing::debug!(
			collection = %self.collection,
			using,
			limit,
			returned = response.result.len(),
			"Qdrant query finished."
		);

		Ok(response.result)
	}
}

/// Translates a year predicate into a payload filter on `financial_year`.
pub fn year_filter_to_qdrant(filter: &YearFilter) -> Option<Filter> {
	match filter {
		YearFilter::Unbounded => None,
		YearFilter::Years { years } => {
			let years = years.iter().map(|year| *year as i64).collect::<Vec<_>>();

			Some(Filter::must([Condition::matches(FIELD_FINANCIAL_YEAR, years)]))
		},
		YearFilter::Range { start, end } => Some(Filter::must([Condition::range(
			FIELD_FINANCIAL_YEAR,
			Range { gte: Some(*start as f64), lte: Some(*end as f64), ..Default::default() },
		)])),
	}
}

/// Decodes a search response, keeping each hit's position in the response as its rank.
pub fn decode_points(points: &[ScoredPoint]) -> Vec<IndexHit> {
	let hits = points
		.iter()
		.zip(1..)
		.filter_map(|(point, rank)| IndexHit::from_scored_point(point, rank))
		.collect::<Vec<_>>();

	if hits.len() != points.len() {
		tracing::warn!(
			skipped = points.len() - hits.len(),
			"Skipped Qdrant points without text or identity."
		);
	}

	hits
}
