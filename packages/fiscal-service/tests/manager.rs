use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};

use fiscal_config::Confidence;
use fiscal_domain::confidence::{ConfidenceBand, ConfidenceThresholds};
use fiscal_service::{
	BoxFuture, Error, EvidenceHit, ExecutionPlan, GuardrailViolation, Manager, OrchestrationState,
	PlanBuilder, PlanRequest, Provenance, Reflection, ReflectionReason, Result, RetrieveParams,
	Specialists, TransitionReason, manager::INCOHERENT_QUERY_REPLY, planner,
};

const ANSWER: &str = "The FY2025 budget extends the SME productivity grant.";

struct FixedPlanner {
	raw: &'static str,
}
impl PlanBuilder for FixedPlanner {
	fn plan<'a>(&'a self, request: &'a PlanRequest) -> BoxFuture<'a, Result<ExecutionPlan>> {
		Box::pin(async move {
			let output = planner::parse_planner_output(self.raw)?;

			planner::assemble_plan(request, output, 2025, 5)
		})
	}
}

enum RetrieveOutcome {
	Hits,
	GuardrailBlock,
}

struct SpySpecialists {
	retrieve: RetrieveOutcome,
	confidence: f32,
	synthesize_fails: bool,
	calls: Arc<AtomicUsize>,
	rerank_calls: Arc<AtomicUsize>,
}
impl SpySpecialists {
	fn new(confidence: f32) -> Self {
		Self {
			retrieve: RetrieveOutcome::Hits,
			confidence,
			synthesize_fails: false,
			calls: Arc::new(AtomicUsize::new(0)),
			rerank_calls: Arc::new(AtomicUsize::new(0)),
		}
	}

	fn count(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl Specialists for SpySpecialists {
	fn retrieve<'a>(
		&'a self,
		_query: &'a str,
		_top_k: u32,
		_params: &'a RetrieveParams,
	) -> BoxFuture<'a, Result<Vec<EvidenceHit>>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let outcome = match self.retrieve {
			RetrieveOutcome::Hits => Ok(vec![hit("c1", 2025), hit("c2", 2024)]),
			RetrieveOutcome::GuardrailBlock => Err(Error::Guardrail(GuardrailViolation {
				stage: "input".to_string(),
				reason: "pii_detected".to_string(),
				safe_reply: "Blocked input.".to_string(),
			})),
		};

		Box::pin(async move { outcome })
	}

	fn rerank<'a>(
		&'a self,
		_query: &'a str,
		hits: Vec<EvidenceHit>,
		top_n: u32,
	) -> BoxFuture<'a, Result<Vec<EvidenceHit>>> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		self.rerank_calls.fetch_add(1, Ordering::SeqCst);

		Box::pin(async move { Ok(hits.into_iter().take(top_n as usize).collect()) })
	}

	fn synthesize<'a>(
		&'a self,
		_original_query: &'a str,
		_revised_query: &'a str,
		_hits: &'a [EvidenceHit],
	) -> BoxFuture<'a, Result<String>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let outcome = if self.synthesize_fails {
			Err(Error::Provider { message: "synthesis timed out".to_string() })
		} else {
			Ok(ANSWER.to_string())
		};

		Box::pin(async move { outcome })
	}

	fn reflect<'a>(
		&'a self,
		_original_query: &'a str,
		_revised_query: &'a str,
		_answer: &'a str,
		_hits: &'a [EvidenceHit],
	) -> BoxFuture<'a, Result<Reflection>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let confidence = self.confidence;

		Box::pin(async move {
			Ok(Reflection {
				reason: ReflectionReason::Ok,
				confidence,
				comments: "Applies to SMEs. Amounts are estimates.".to_string(),
				applicability_note: "Applies to SMEs.".to_string(),
				uncertainty_note: "Amounts are estimates.".to_string(),
			})
		})
	}
}

fn hit(chunk_id: &str, year: i32) -> EvidenceHit {
	EvidenceHit {
		chunk_id: chunk_id.to_string(),
		source_path: format!("budget/{chunk_id}.md"),
		text: format!("Evidence {chunk_id}"),
		score: 0.5,
		doc_type: None,
		financial_year: Some(year),
		provenance: Provenance::default(),
	}
}

fn manager() -> Manager {
	Manager::with_thresholds(ConfidenceThresholds::from(&Confidence::default()), "test".to_string())
}

fn request() -> PlanRequest {
	PlanRequest {
		query: "What SME productivity support is in FY2025?".to_string(),
		top_k: 20,
		top_n: 5,
		requested_years: None,
	}
}

const COHERENT: FixedPlanner = FixedPlanner {
	raw: r#"{"revised_query": "FY2025 SME productivity support", "coherence": "coherent"}"#,
};

#[tokio::test]
async fn high_confidence_run_succeeds() {
	let specialists = SpySpecialists::new(0.9);
	let result = manager()
		.run(&request(), &COHERENT, &specialists)
		.await
		.expect("Run should succeed.");

	assert_eq!(result.state_history, vec![
		OrchestrationState::Executing,
		OrchestrationState::Success
	]);
	assert_eq!(result.final_reason, TransitionReason::ConfidenceHigh);
	assert_eq!(result.band, Some(ConfidenceBand::High));
	assert_eq!(result.answer, ANSWER);
	assert_eq!(result.evidence.len(), 2);
	assert_eq!(specialists.count(), 4);
	assert_eq!(result.trace.steps.len(), 1);
	assert_eq!(result.trace.steps[0].retrieved, 2);
	assert_eq!(result.trace.final_state, Some(OrchestrationState::Success));
}

#[tokio::test]
async fn medium_confidence_is_caveated_success() {
	let specialists = SpySpecialists::new(0.75);
	let result =
		manager().run(&request(), &COHERENT, &specialists).await.expect("Run should succeed.");

	assert_eq!(result.final_reason, TransitionReason::ConfidenceMediumCaveated);
	assert_eq!(result.state_history.last(), Some(&OrchestrationState::Success));
}

#[tokio::test]
async fn very_low_confidence_still_returns_the_answer() {
	let specialists = SpySpecialists::new(0.1);
	let result =
		manager().run(&request(), &COHERENT, &specialists).await.expect("Run should succeed.");

	assert_eq!(result.final_reason, TransitionReason::ConfidenceTooLowClarify);
	assert_eq!(result.state_history.last(), Some(&OrchestrationState::Success));
	assert_eq!(result.answer, ANSWER);
}

#[tokio::test]
async fn guardrail_block_fails_with_safe_reply() {
	let mut specialists = SpySpecialists::new(0.9);

	specialists.retrieve = RetrieveOutcome::GuardrailBlock;

	let result =
		manager().run(&request(), &COHERENT, &specialists).await.expect("Run should resolve.");

	assert_eq!(result.state_history, vec![
		OrchestrationState::Executing,
		OrchestrationState::Fail
	]);
	assert_eq!(result.final_reason, TransitionReason::GuardrailBlock);
	assert_eq!(result.answer, "Blocked input.");
	assert_eq!(result.confidence, 0.0);
	assert_eq!(specialists.rerank_calls.load(Ordering::SeqCst), 0);

	let event = result.trace.guardrail_event.expect("Missing guardrail event.");

	assert_eq!(event.stage, "input");
	assert_eq!(event.reason, "pii_detected");
	assert!(result.trace.steps.is_empty());
}

#[tokio::test]
async fn incoherent_query_skips_execution() {
	let planner = FixedPlanner {
		raw: r#"{"revised_query": "", "coherence": "incoherent", "coherence_reason": "no topic"}"#,
	};
	let specialists = SpySpecialists::new(0.9);
	let result =
		manager().run(&request(), &planner, &specialists).await.expect("Run should resolve.");

	assert_eq!(result.state_history, vec![OrchestrationState::Fail]);
	assert_eq!(result.final_reason, TransitionReason::IncoherentQuery);
	assert_eq!(result.answer, INCOHERENT_QUERY_REPLY);
	assert_eq!(specialists.count(), 0);

	let coherence = result.trace.coherence.expect("Missing coherence event.");

	assert_eq!(coherence.label, "incoherent");
	assert_eq!(coherence.reason.as_deref(), Some("no topic"));
}

#[tokio::test]
async fn specialist_failure_propagates() {
	let mut specialists = SpySpecialists::new(0.9);

	specialists.synthesize_fails = true;

	let err = manager()
		.run(&request(), &COHERENT, &specialists)
		.await
		.expect_err("Provider failures should not be masked.");

	assert!(matches!(err, Error::Provider { .. }));
	assert_eq!(specialists.count(), 3);
}
