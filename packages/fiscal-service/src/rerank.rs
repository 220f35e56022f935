use fiscal_domain::recency;

use crate::{Error, EvidenceHit, FiscalService, Result, retrieval::cmp_f32_desc};

/// Score span under which all candidates are treated as equally relevant.
pub const FLAT_SPAN_EPSILON: f32 = 1e-6;
pub const NEUTRAL_SCORE: f32 = 0.5;

#[derive(Clone, Debug)]
pub struct RerankPolicy {
	pub current_fiscal_year: i32,
	pub window: u32,
	pub recency_boost: f32,
}

/// Min-max normalizes `raw` into [0, 1]; a flat span maps every score to [`NEUTRAL_SCORE`].
pub fn normalize_scores(raw: &[f32]) -> Vec<f32> {
	let min = raw.iter().copied().fold(f32::INFINITY, f32::min);
	let max = raw.iter().copied().fold(f32::NEG_INFINITY, f32::max);
	let span = max - min;

	if raw.is_empty() || span <= FLAT_SPAN_EPSILON {
		return vec![NEUTRAL_SCORE; raw.len()];
	}

	raw.iter().map(|score| (score - min) / span).collect()
}

/// Replaces fused scores with normalized pairwise scores plus the recency tier, then keeps the
/// best `top_n`. Equal scores keep their fused order.
pub fn rescore_candidates(
	candidates: Vec<EvidenceHit>,
	raw_scores: &[f32],
	policy: &RerankPolicy,
	top_n: usize,
) -> Vec<EvidenceHit> {
	let normalized = normalize_scores(raw_scores);
	let mut rescored = candidates
		.into_iter()
		.zip(raw_scores.iter().zip(normalized))
		.enumerate()
		.map(|(idx, (mut hit, (raw, norm)))| {
			let boost = recency::recency_tier_boost(
				hit.financial_year,
				policy.current_fiscal_year,
				policy.window,
				policy.recency_boost,
			);

			hit.provenance.fused_rank = Some(idx as u32 + 1);
			hit.provenance.rerank_raw_score = Some(*raw);
			hit.provenance.rerank_recency_boost = Some(boost);
			hit.score = norm + boost;

			hit
		})
		.collect::<Vec<_>>();

	rescored.sort_by(|a, b| cmp_f32_desc(a.score, b.score));
	rescored.truncate(top_n);

	rescored
}

impl FiscalService {
	/// Pairwise rerank of the fused candidates. The relevance model is required; its failure is
	/// never replaced by the fused order.
	pub async fn rerank_evidence(
		&self,
		query: &str,
		hits: Vec<EvidenceHit>,
		top_n: u32,
	) -> Result<Vec<EvidenceHit>> {
		let cfg = &self.cfg;
		let limit = cfg.rerank.candidate_limit.max(1) as usize;
		let candidates = hits.into_iter().take(limit).collect::<Vec<_>>();

		if candidates.is_empty() {
			return Ok(Vec::new());
		}

		let docs = candidates.iter().map(|hit| hit.text.clone()).collect::<Vec<_>>();
		let raw = self.providers.rerank.rerank(&cfg.providers.rerank, query, &docs).await?;

		if raw.len() != candidates.len() {
			return Err(Error::InvalidResponse {
				message: format!(
					"Rerank provider returned {} scores for {} candidates.",
					raw.len(),
					candidates.len()
				),
			});
		}
		if raw.iter().any(|score| !score.is_finite()) {
			return Err(Error::InvalidResponse {
				message: "Rerank provider returned a non-finite score.".to_string(),
			});
		}

		let policy = RerankPolicy {
			current_fiscal_year: self.current_fiscal_year(),
			window: cfg.recency.window,
			recency_boost: cfg.rerank.recency_boost,
		};
		let candidate_count = candidates.len();
		let reranked = rescore_candidates(candidates, &raw, &policy, top_n as usize);

		tracing::info!(candidates = candidate_count, kept = reranked.len(), "Rerank finished.");

		Ok(reranked)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::Provenance;

	fn hit(id: &str, year: Option<i32>) -> EvidenceHit {
		EvidenceHit {
			chunk_id: id.to_string(),
			source_path: String::new(),
			text: id.to_string(),
			score: 0.0,
			doc_type: None,
			financial_year: year,
			provenance: Provenance::default(),
		}
	}

	fn policy(boost: f32) -> RerankPolicy {
		RerankPolicy { current_fiscal_year: 2025, window: 5, recency_boost: boost }
	}

	#[test]
	fn flat_scores_become_neutral() {
		assert_eq!(normalize_scores(&[3.0, 3.0, 3.0000001]), vec![0.5, 0.5, 0.5]);
		assert!(normalize_scores(&[]).is_empty());
	}

	#[test]
	fn scores_are_min_max_normalized() {
		assert_eq!(normalize_scores(&[-2.0, 0.0, 2.0]), vec![0.0, 0.5, 1.0]);
	}

	#[test]
	fn ties_keep_fused_order() {
		let candidates = vec![hit("first", None), hit("second", None), hit("third", None)];
		let out = rescore_candidates(candidates, &[1.0, 1.0, 1.0], &policy(0.0), 3);
		let ids = out.iter().map(|hit| hit.chunk_id.as_str()).collect::<Vec<_>>();

		assert_eq!(ids, vec!["first", "second", "third"]);
		assert!(out.iter().all(|hit| hit.score == 0.5));
	}

	#[test]
	fn recency_tier_applies_after_normalization() {
		let candidates = vec![hit("old", Some(2016)), hit("undated", None), hit("new", Some(2025))];
		let out = rescore_candidates(candidates, &[0.9, 0.5, 0.8], &policy(0.8), 3);
		let ids = out.iter().map(|hit| hit.chunk_id.as_str()).collect::<Vec<_>>();

		assert_eq!(ids, vec!["new", "old", "undated"]);
		assert!((out[0].score - 1.55).abs() < 1e-6);
		assert!((out[1].score - 1.0).abs() < 1e-6);
		assert_eq!(out[0].provenance.fused_rank, Some(3));
	}

	#[test]
	fn output_is_truncated_to_top_n() {
		let candidates = vec![hit("a", None), hit("b", None), hit("c", None)];
		let out = rescore_candidates(candidates, &[0.1, 0.9, 0.5], &policy(0.0), 2);
		let ids = out.iter().map(|hit| hit.chunk_id.as_str()).collect::<Vec<_>>();

		assert_eq!(ids, vec!["b", "c"]);
	}
}
