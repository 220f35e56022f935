//! Stored-field decoding for indexed budget chunks.

use std::collections::HashMap;

use qdrant_client::qdrant::{PointId, ScoredPoint, Value, point_id::PointIdOptions, value::Kind};

pub const FIELD_CHUNK_ID: &str = "chunk_id";
pub const FIELD_SOURCE_PATH: &str = "source_path";
pub const FIELD_TEXT: &str = "text";
pub const FIELD_DOC_TYPE: &str = "doc_type";
pub const FIELD_FINANCIAL_YEAR: &str = "financial_year";

/// One point returned by a dense or sparse search.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexHit {
	/// 1-based position in the search response, counting points that failed to decode.
	pub rank: u32,
	pub chunk_id: String,
	pub source_path: String,
	pub text: String,
	pub doc_type: Option<String>,
	pub financial_year: Option<i32>,
	pub score: f32,
}
impl IndexHit {
	/// Decodes the scored point at `rank`. Points without text or a usable identity are skipped.
	pub fn from_scored_point(point: &ScoredPoint, rank: u32) -> Option<Self> {
		let payload = &point.payload;
		let chunk_id = payload_string(payload, FIELD_CHUNK_ID)
			.or_else(|| point.id.as_ref().and_then(point_id_string))?;
		let text = payload_string(payload, FIELD_TEXT)?;

		Some(Self {
			rank,
			chunk_id,
			source_path: payload_string(payload, FIELD_SOURCE_PATH).unwrap_or_default(),
			text,
			doc_type: payload_string(payload, FIELD_DOC_TYPE),
			financial_year: payload_i32(payload, FIELD_FINANCIAL_YEAR),
			score: point.score,
		})
	}
}

pub fn point_id_string(id: &PointId) -> Option<String> {
	match id.point_id_options.as_ref()? {
		PointIdOptions::Num(num) => Some(num.to_string()),
		PointIdOptions::Uuid(uuid) => Some(uuid.clone()),
	}
}

pub fn payload_string(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
	let value = payload.get(key)?;

	match &value.kind {
		Some(Kind::StringValue(text)) => Some(text.to_string()),
		_ => None,
	}
}

/// Reads an integer field; whole doubles and numeric strings such as `"2024"` are accepted.
pub fn payload_i32(payload: &HashMap<String, Value>, key: &str) -> Option<i32> {
	let value = payload.get(key)?;

	match &value.kind {
		Some(Kind::IntegerValue(value)) => i32::try_from(*value).ok(),
		Some(Kind::DoubleValue(value)) =>
			if value.fract() == 0.0 {
				i32::try_from(*value as i64).ok()
			} else {
				None
			},
		Some(Kind::StringValue(text)) => text.trim().parse().ok(),
		_ => None,
	}
}
