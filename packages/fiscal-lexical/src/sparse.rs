use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Term-index to weight map. Only strictly positive weights are stored.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector(BTreeMap<u32, f32>);
impl SparseVector {
	pub fn new() -> Self {
		Self::default()
	}

	/// Stores `weight` for `index` when it is finite and positive; anything else is dropped.
	pub fn insert(&mut self, index: u32, weight: f32) {
		if weight.is_finite() && weight > 0.0 {
			self.0.insert(index, weight);
		}
	}

	/// Weight for `index`, zero when absent.
	pub fn get(&self, index: u32) -> f32 {
		self.0.get(&index).copied().unwrap_or(0.0)
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn iter(&self) -> impl Iterator<Item = (u32, f32)> + '_ {
		self.0.iter().map(|(index, weight)| (*index, *weight))
	}

	pub fn indices(&self) -> Vec<u32> {
		self.0.keys().copied().collect()
	}

	pub fn values(&self) -> Vec<f32> {
		self.0.values().copied().collect()
	}

	pub fn dot(&self, other: &Self) -> f32 {
		self.iter().map(|(index, weight)| weight * other.get(index)).sum()
	}
}
