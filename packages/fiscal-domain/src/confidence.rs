use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceBand {
	VeryLow,
	Low,
	Medium,
	High,
}
impl ConfidenceBand {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::VeryLow => "very_low",
			Self::Low => "low",
			Self::Medium => "medium",
			Self::High => "high",
		}
	}
}

#[derive(Clone, Copy, Debug)]
pub struct ConfidenceThresholds {
	pub strong: f32,
	pub medium: f32,
	pub low: f32,
	pub very_low: f32,
}
impl ConfidenceThresholds {
	pub fn band(&self, confidence: f32) -> ConfidenceBand {
		let confidence = clamp_confidence(confidence);

		if confidence >= self.strong {
			ConfidenceBand::High
		} else if confidence >= self.medium {
			ConfidenceBand::Medium
		} else if confidence >= self.low {
			ConfidenceBand::Low
		} else {
			ConfidenceBand::VeryLow
		}
	}
}
impl From<&fiscal_config::Confidence> for ConfidenceThresholds {
	fn from(cfg: &fiscal_config::Confidence) -> Self {
		Self { strong: cfg.strong, medium: cfg.medium, low: cfg.low, very_low: cfg.very_low }
	}
}

/// Clamps into [0, 1]; NaN maps to 0.
pub fn clamp_confidence(value: f32) -> f32 {
	if value.is_nan() {
		return 0.0;
	}

	value.clamp(0.0, 1.0)
}
