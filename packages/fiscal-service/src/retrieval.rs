use std::{cmp::Ordering, collections::HashMap};

use fiscal_domain::{
	recency,
	year_intent::{self, YearFilter},
};

use crate::{
	Error, EvidenceHit, FiscalService, IndexHit, Provenance, Result, RetrievalSource,
	RetrieveParams, guardrails::Guardrails,
};

pub const FUSION_RRF: &str = "rrf";

/// Knobs for fusing one dense and one sparse ranking.
#[derive(Clone, Debug)]
pub struct FusionPolicy {
	pub rrf_k: u32,
	pub current_fiscal_year: i32,
	pub window: u32,
	pub recency_boost: f32,
	pub year_expr: Option<String>,
}

/// Reciprocal rank fusion of two ranked lists, followed by the recency tier boost.
///
/// Each list contributes `1 / (rrf_k + rank)`, where `rank` is the hit's 1-based position in its
/// search response; blank or undecodable entries still occupy their slot. A document missing
/// from a list gets nothing from it. Only the first occurrence of a chunk within one list
/// counts. Ties on the final score go to the hit found by more sources, then the better
/// single-list rank, then the smaller chunk id.
pub fn fuse_rankings(
	dense: &[IndexHit],
	sparse: &[IndexHit],
	policy: &FusionPolicy,
) -> Vec<EvidenceHit> {
	let mut order: Vec<String> = Vec::new();
	let mut merged: HashMap<String, EvidenceHit> = HashMap::new();

	for (source, hits) in [(RetrievalSource::Dense, dense), (RetrievalSource::Sparse, sparse)] {
		for hit in hits {
			if hit.chunk_id.is_empty() {
				continue;
			}

			let rank = hit.rank;
			let entry = merged.entry(hit.chunk_id.clone()).or_insert_with(|| {
				order.push(hit.chunk_id.clone());

				new_candidate(hit, policy.year_expr.clone())
			});
			let provenance = &mut entry.provenance;

			if provenance.retrieval_sources.contains(&source) {
				continue;
			}

			provenance.retrieval_sources.push(source);
			provenance.rrf_score += 1.0 / (policy.rrf_k as f32 + rank as f32);

			match source {
				RetrievalSource::Dense => {
					provenance.dense_rank = Some(rank);
					provenance.dense_score = Some(hit.score);
				},
				RetrievalSource::Sparse => {
					provenance.sparse_rank = Some(rank);
					provenance.sparse_score = Some(hit.score);
				},
			}
		}
	}

	let mut fused = order.into_iter().filter_map(|id| merged.remove(&id)).collect::<Vec<_>>();

	for hit in &mut fused {
		let boost = recency::recency_tier_boost(
			hit.financial_year,
			policy.current_fiscal_year,
			policy.window,
			policy.recency_boost,
		);
		let provenance = &mut hit.provenance;

		provenance.retrieval_sources.sort();
		provenance.retrieval_recency_boost = boost;
		provenance.merged_score = provenance.rrf_score + boost;
		hit.score = provenance.merged_score;
	}

	fused.sort_by(cmp_fused);

	fused
}

fn new_candidate(hit: &IndexHit, year_expr: Option<String>) -> EvidenceHit {
	EvidenceHit {
		chunk_id: hit.chunk_id.clone(),
		source_path: hit.source_path.clone(),
		text: hit.text.clone(),
		score: 0.0,
		doc_type: hit.doc_type.clone(),
		financial_year: hit.financial_year,
		provenance: Provenance { year_expr, ..Default::default() },
	}
}

fn cmp_fused(a: &EvidenceHit, b: &EvidenceHit) -> Ordering {
	cmp_f32_desc(a.score, b.score)
		.then_with(|| {
			b.provenance.retrieval_sources.len().cmp(&a.provenance.retrieval_sources.len())
		})
		.then_with(|| a.provenance.best_rank().cmp(&b.provenance.best_rank()))
		.then_with(|| a.chunk_id.cmp(&b.chunk_id))
}

pub(crate) fn cmp_f32_desc(a: f32, b: f32) -> Ordering {
	b.total_cmp(&a)
}

impl FiscalService {
	/// Year-filtered hybrid retrieval: one dense and one sparse search fused into one ranking.
	pub async fn retrieve_evidence(
		&self,
		query: &str,
		top_k: u32,
		params: &RetrieveParams,
	) -> Result<Vec<EvidenceHit>> {
		let cfg = &self.cfg;

		if cfg.retrieval.fusion_strategy != FUSION_RRF {
			return Err(Error::Config {
				message: format!(
					"Unsupported fusion strategy {:?}; only {FUSION_RRF} is available.",
					cfg.retrieval.fusion_strategy
				),
			});
		}

		let guards = Guardrails::new(&cfg.providers.guardrails, self.providers.guardrail.as_ref());
		let query = guards.guard_input(query).await?;
		let current_fiscal_year = self.current_fiscal_year();
		let filter = if cfg.retrieval.fy_filtering_enabled {
			year_intent::build_year_filter(
				&params.year_intent,
				params.recent_year_window,
				current_fiscal_year,
			)
		} else {
			YearFilter::Unbounded
		};
		let limit = top_k.max(1);
		let lexical = self.lexical().await?;
		let sparse_query = lexical.encode_query(&query);
		let embedded = self
			.providers
			.embedding
			.embed(&cfg.providers.embedding, std::slice::from_ref(&query))
			.await?;
		let dense_query = embedded.into_iter().next().ok_or_else(|| Error::Provider {
			message: "Embedding provider returned no vectors.".to_string(),
		})?;

		if dense_query.len() != cfg.storage.qdrant.vector_dim as usize {
			return Err(Error::Provider { message: "Embedding vector dimension mismatch.".to_string() });
		}

		let (dense, sparse) = tokio::try_join!(
			self.index.search_dense(&dense_query, limit, &filter),
			async {
				if sparse_query.is_empty() {
					Ok(Vec::new())
				} else {
					self.index.search_sparse(&sparse_query, limit, &filter).await
				}
			}
		)?;
		let policy = FusionPolicy {
			rrf_k: cfg.retrieval.rrf_k,
			current_fiscal_year,
			window: cfg.recency.window,
			recency_boost: cfg.retrieval.recency_boost,
			year_expr: filter.describe(),
		};
		let fused = fuse_rankings(&dense, &sparse, &policy);

		tracing::info!(
			dense = dense.len(),
			sparse = sparse.len(),
			fused = fused.len(),
			year_filter = policy.year_expr.as_deref().unwrap_or("none"),
			"Hybrid retrieval fused."
		);

		Ok(fused)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn index_hit(id: &str, year: Option<i32>) -> IndexHit {
		IndexHit {
			rank: 0,
			chunk_id: id.to_string(),
			source_path: format!("{id}.pdf"),
			text: format!("text {id}"),
			doc_type: None,
			financial_year: year,
			score: 1.0,
		}
	}

	/// Numbers hits by their position, the way a search response does.
	fn ranked<const N: usize>(hits: [IndexHit; N]) -> Vec<IndexHit> {
		hits.into_iter().zip(1..).map(|(hit, rank)| IndexHit { rank, ..hit }).collect()
	}

	fn policy(boost: f32) -> FusionPolicy {
		FusionPolicy {
			rrf_k: 60,
			current_fiscal_year: 2025,
			window: 5,
			recency_boost: boost,
			year_expr: None,
		}
	}

	fn ids(hits: &[EvidenceHit]) -> Vec<&str> {
		hits.iter().map(|hit| hit.chunk_id.as_str()).collect()
	}

	#[test]
	fn hit_in_both_lists_beats_single_list_hit() {
		let dense = ranked([index_hit("a", None), index_hit("b", None)]);
		let sparse = ranked([index_hit("a", None)]);
		let fused = fuse_rankings(&dense, &sparse, &policy(0.0));

		assert_eq!(ids(&fused), vec!["a", "b"]);
		assert!((fused[0].score - 2.0 / 61.0).abs() < 1e-6);
		assert!((fused[1].score - 1.0 / 62.0).abs() < 1e-6);
	}

	#[test]
	fn missing_from_a_list_is_not_penalised() {
		let dense = ranked([index_hit("a", None)]);
		let sparse = ranked([index_hit("b", None)]);
		let fused = fuse_rankings(&dense, &sparse, &policy(0.0));

		assert_eq!(fused[0].score, fused[1].score);
		assert_eq!(ids(&fused), vec!["a", "b"]);
	}

	#[test]
	fn duplicate_within_one_list_counts_once() {
		let dense = ranked([index_hit("a", None), index_hit("a", None), index_hit("b", None)]);
		let fused = fuse_rankings(&dense, &[], &policy(0.0));

		assert!((fused[0].score - 1.0 / 61.0).abs() < 1e-6);
		assert_eq!(fused[1].provenance.dense_rank, Some(3));
	}

	#[test]
	fn provenance_records_both_sources() {
		let dense = ranked([index_hit("a", Some(2024))]);
		let sparse = ranked([index_hit("x", None), index_hit("a", Some(2024))]);
		let mut p = policy(0.8);

		p.year_expr = Some("financial_year in [2024]".to_string());

		let fused = fuse_rankings(&dense, &sparse, &p);
		let hit = fused.iter().find(|hit| hit.chunk_id == "a").expect("Missing fused hit.");

		assert_eq!(hit.provenance.retrieval_sources, vec![RetrievalSource::Dense, RetrievalSource::Sparse]);
		assert_eq!(hit.provenance.dense_rank, Some(1));
		assert_eq!(hit.provenance.sparse_rank, Some(2));
		assert!((hit.provenance.retrieval_recency_boost - 0.64).abs() < 1e-6);
		assert_eq!(hit.provenance.year_expr.as_deref(), Some("financial_year in [2024]"));
	}

	#[test]
	fn recency_boost_reorders_without_filtering() {
		let dense = ranked([index_hit("old", Some(2015)), index_hit("new", Some(2025))]);
		let fused = fuse_rankings(&dense, &[], &policy(0.8));

		assert_eq!(ids(&fused), vec!["new", "old"]);
	}

	#[test]
	fn recency_boost_keeps_order_of_unboosted_hits() {
		let dense = ranked([
			index_hit("a", Some(2010)),
			index_hit("b", None),
			index_hit("c", Some(2025)),
			index_hit("d", Some(2012)),
		]);
		let fused = fuse_rankings(&dense, &[], &policy(0.8));
		let unboosted = ids(&fused).into_iter().filter(|id| *id != "c").collect::<Vec<_>>();

		assert_eq!(unboosted, vec!["a", "b", "d"]);
	}

	#[test]
	fn equal_scores_break_ties_by_chunk_id() {
		let dense = ranked([index_hit("z", None)]);
		let sparse = ranked([index_hit("m", None)]);
		let fused = fuse_rankings(&sparse, &dense, &policy(0.0));

		assert_eq!(ids(&fused), vec!["m", "z"]);

		let fused = fuse_rankings(&dense, &sparse, &policy(0.0));

		assert_eq!(ids(&fused), vec!["m", "z"]);
	}

	#[test]
	fn empty_chunk_ids_keep_their_rank() {
		let dense = ranked([index_hit("", None), index_hit("a", None)]);
		let fused = fuse_rankings(&dense, &[], &policy(0.0));

		assert_eq!(ids(&fused), vec!["a"]);
		assert_eq!(fused[0].provenance.dense_rank, Some(2));
		assert!((fused[0].score - 1.0 / 62.0).abs() < 1e-6);
	}

	#[test]
	fn response_positions_drive_the_rrf_share() {
		let mut dense = ranked([index_hit("a", None), index_hit("b", None)]);

		dense[1].rank = 4;

		let fused = fuse_rankings(&dense, &[], &policy(0.0));

		assert_eq!(fused[1].provenance.dense_rank, Some(4));
		assert!((fused[1].score - 1.0 / 64.0).abs() < 1e-6);
	}
}
