use serde_json::Value;

const PLANNER_SYSTEM_PROMPT: &str = "\
You rewrite questions about government budget documents into retrieval queries.

Keep the user's intent unchanged and do not add new goals.
Make the revised query short and specific; prefer concrete policy, scheme and fiscal keywords.
Label the question \"incoherent\" when it is nonsensical, malformed or cannot be meaningfully answered.
Even for incoherent questions, return a best-effort revised query.

Respond with JSON only:
{\"revised_query\": \"<string>\", \"coherence\": \"coherent|incoherent\", \"coherence_reason\": \"<string>\"}";

const SYNTHESIS_SYSTEM_PROMPT: &str = "\
You are a policy analyst answering questions from budget evidence.
Use only the evidence provided. Weigh the original question above the revised retrieval query.

Reason across all relevant evidence and fiscal years; do not rely on a single year when others are present.
When evidence is partial, separate what it supports from what remains unknown. Do not refuse when partial evidence is relevant.
Never assert an individual's eligibility or payout amount; describe how schemes are targeted instead.
Attribute every number to the policy it comes from.
State whether the most recent fiscal years introduce new or materially different measures.

Use this layout with one blank line between sections:
Budget coverage checked: <fiscal years reviewed and whether relevant measures were found>

Answer: <direct answer>

Evidence basis: <schemes or budget context relied on>

Bottom line: <likely applicability and limitations>";

const REFLECTION_SYSTEM_PROMPT: &str = "\
You review a single-pass answer to a budget policy question.
Weigh the original question above the revised retrieval query.

Check that the answer:
- is grounded only in the evidence,
- separates the existence of a scheme from individual eligibility,
- covers every fiscal year present in the evidence,
- states uncertainty when household or income details are missing,
- ends with a clear bottom line.

Confidence measures completeness and precision. Partial but useful answers belong in the 0.6-0.7 range.
Cap confidence at 0.7 when eligibility thresholds are unknown.

Respond with JSON only, using keys:
reason (\"ok\" or \"low_coverage\"), confidence (0-1), applicability_note, uncertainty_note";

fn chat(system: &str, user: String) -> Vec<Value> {
	vec![
		serde_json::json!({ "role": "system", "content": system }),
		serde_json::json!({ "role": "user", "content": user }),
	]
}

pub fn planner_messages(payload: &Value) -> Vec<Value> {
	chat(PLANNER_SYSTEM_PROMPT, format!("Payload:\n{payload}"))
}

pub fn synthesis_messages(original_query: &str, revised_query: &str, evidence: &Value) -> Vec<Value> {
	chat(
		SYNTHESIS_SYSTEM_PROMPT,
		format!(
			"Original query: {original_query}\nRevised query: {revised_query}\nEvidence:\n{evidence}"
		),
	)
}

pub fn reflection_messages(
	original_query: &str,
	revised_query: &str,
	answer: &str,
	evidence_count: usize,
) -> Vec<Value> {
	chat(
		REFLECTION_SYSTEM_PROMPT,
		format!(
			"Original query: {original_query}\nRevised query: {revised_query}\nAnswer: {answer}\nEvidence count: {evidence_count}"
		),
	)
}

/// Strips a surrounding Markdown code fence, with or without a `json` tag.
pub fn strip_code_fence(raw: &str) -> &str {
	let trimmed = raw.trim();

	if !trimmed.starts_with("```") {
		return trimmed;
	}

	let inner = trimmed.trim_matches('`');

	inner.strip_prefix("json").unwrap_or(inner).trim()
}
