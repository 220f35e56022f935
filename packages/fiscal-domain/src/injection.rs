use std::{collections::BTreeSet, sync::LazyLock};

use regex::Regex;
use serde::Serialize;

pub const PROMPT_INJECTION_DETECTED: &str = "prompt_injection_detected";

static ENCODED_PAYLOAD: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"[A-Za-z0-9+/]{120,}={0,2}").expect("encoded payload pattern is valid")
});

const RULES: [(&str, &[&str]); 3] = [
	(
		"override_instructions",
		&["ignore previous instructions", "ignore system prompt", "disregard developer message"],
	),
	("prompt_exfiltration", &["reveal system prompt", "show hidden prompt", "print your instructions"]),
	(
		"secret_or_tool_abuse",
		&[
			"show api key",
			"reveal token",
			"print env",
			"bypass guardrails",
			"run shell command",
			"call tool directly",
		],
	),
];

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InjectionAssessment {
	pub blocked: bool,
	pub reason_code: Option<&'static str>,
	pub matched_rules: Vec<&'static str>,
}

pub fn assess_prompt_injection(query: &str) -> InjectionAssessment {
	let text = query.trim().to_lowercase();
	let mut matched = BTreeSet::new();

	for (rule, patterns) in RULES {
		if patterns.iter().any(|pattern| text.contains(pattern)) {
			matched.insert(rule);
		}
	}

	if ENCODED_PAYLOAD.is_match(&text) {
		matched.insert("encoded_payload");
	}
	if matched.is_empty() {
		return InjectionAssessment { blocked: false, reason_code: None, matched_rules: Vec::new() };
	}

	InjectionAssessment {
		blocked: true,
		reason_code: Some(PROMPT_INJECTION_DETECTED),
		matched_rules: matched.into_iter().collect(),
	}
}
