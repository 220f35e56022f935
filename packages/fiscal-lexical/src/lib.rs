//! BM25-style sparse encoder shared by indexing and query time.

mod error;
mod sparse;

pub use error::Error;
pub use sparse::SparseVector;

pub type Result<T, E = Error> = std::result::Result<T, E>;

use std::{
	collections::{HashMap, HashSet},
	fs,
	path::Path,
};

use serde::{Deserialize, Serialize};

pub const DEFAULT_K1: f32 = 1.5;
pub const DEFAULT_B: f32 = 0.75;

/// Fitted corpus statistics.
///
/// `vocab` maps each term to its position in `idf`. An unfitted scorer has an empty vocabulary
/// and encodes everything to an empty vector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LexicalScorer {
	k1: f32,
	b: f32,
	vocab: HashMap<String, u32>,
	idf: Vec<f32>,
	avgdl: f32,
	doc_count: u64,
}
impl LexicalScorer {
	pub fn new(k1: f32, b: f32) -> Self {
		Self { k1, b, vocab: HashMap::new(), idf: Vec::new(), avgdl: 0.0, doc_count: 0 }
	}

	/// Rebuilds vocabulary, IDF table and average length from `corpus`.
	///
	/// Term indices follow first appearance in the corpus. An empty corpus resets the scorer to
	/// the unfitted state.
	pub fn fit<I, S>(&mut self, corpus: I)
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let mut vocab = HashMap::new();
		let mut doc_freq: Vec<u64> = Vec::new();
		let mut total_len = 0_u64;
		let mut doc_count = 0_u64;

		for text in corpus {
			let tokens = tokenize(text.as_ref());
			let mut seen = HashSet::new();

			doc_count += 1;
			total_len += tokens.len() as u64;

			for token in tokens {
				let next = vocab.len() as u32;
				let index = *vocab.entry(token).or_insert(next);

				if index as usize == doc_freq.len() {
					doc_freq.push(0);
				}
				if seen.insert(index) {
					doc_freq[index as usize] += 1;
				}
			}
		}

		if doc_count == 0 {
			*self = Self::new(self.k1, self.b);

			return;
		}

		let n = doc_count as f64;
		let idf = doc_freq
			.iter()
			.map(|df| {
				let df = *df as f64;

				(1.0 + (n - df + 0.5) / (df + 0.5)).ln() as f32
			})
			.collect();

		*self = Self {
			k1: self.k1,
			b: self.b,
			vocab,
			idf,
			avgdl: (total_len as f64 / n) as f32,
			doc_count,
		};
	}

	/// Replaces the saturation parameters; the fitted vocabulary is unchanged.
	pub fn set_params(&mut self, k1: f32, b: f32) {
		self.k1 = k1;
		self.b = b;
	}

	pub fn is_fitted(&self) -> bool {
		!self.vocab.is_empty()
	}

	pub fn vocab_size(&self) -> usize {
		self.vocab.len()
	}

	pub fn doc_count(&self) -> u64 {
		self.doc_count
	}

	pub fn avgdl(&self) -> f32 {
		self.avgdl
	}

	pub fn term_index(&self, term: &str) -> Option<u32> {
		self.vocab.get(&term.to_lowercase()).copied()
	}

	pub fn idf(&self, term: &str) -> Option<f32> {
		self.term_index(term).and_then(|index| self.idf.get(index as usize).copied())
	}

	/// Saturating BM25 weights for an indexed chunk.
	pub fn encode_document(&self, text: &str) -> SparseVector {
		let tokens = tokenize(text);
		let dl = tokens.len() as f32;
		let length_ratio = if self.avgdl > 0.0 { dl / self.avgdl } else { 0.0 };

		self.encode(&tokens, |idf, tf| {
			let denom = tf + self.k1 * (1.0 - self.b + self.b * length_ratio);

			idf * tf * (self.k1 + 1.0) / if denom != 0.0 { denom } else { 1.0 }
		})
	}

	/// IDF-weighted term frequency for a query; no saturation or length normalization.
	pub fn encode_query(&self, text: &str) -> SparseVector {
		self.encode(&tokenize(text), |idf, tf| idf * tf)
	}

	pub fn save(&self, path: &Path) -> Result<()> {
		let raw = serde_json::to_vec(self)?;

		fs::write(path, raw).map_err(|err| Error::WriteArtifact { path: path.to_path_buf(), source: err })
	}

	pub fn load(path: &Path) -> Result<Self> {
		let raw = fs::read(path)
			.map_err(|err| Error::ReadArtifact { path: path.to_path_buf(), source: err })?;
		let scorer: Self = serde_json::from_slice(&raw)
			.map_err(|err| Error::DecodeArtifact { path: path.to_path_buf(), source: err })?;

		scorer.check()?;

		Ok(scorer)
	}

	fn check(&self) -> Result<()> {
		if self.vocab.len() != self.idf.len() {
			return Err(Error::InvalidArtifact(format!(
				"vocabulary has {} terms but idf table has {} entries.",
				self.vocab.len(),
				self.idf.len()
			)));
		}
		if let Some((term, index)) =
			self.vocab.iter().find(|(_, index)| **index as usize >= self.idf.len())
		{
			return Err(Error::InvalidArtifact(format!("term {term:?} has out-of-range index {index}.")));
		}
		if !self.avgdl.is_finite() || self.avgdl < 0.0 {
			return Err(Error::InvalidArtifact("avgdl must be a finite non-negative number.".to_string()));
		}
		if self.idf.iter().any(|idf| !idf.is_finite() || *idf < 0.0) {
			return Err(Error::InvalidArtifact("idf values must be finite and non-negative.".to_string()));
		}

		Ok(())
	}

	fn encode<F>(&self, tokens: &[String], weight: F) -> SparseVector
	where
		F: Fn(f32, f32) -> f32,
	{
		let mut tf: HashMap<u32, u32> = HashMap::new();

		for token in tokens {
			if let Some(index) = self.vocab.get(token) {
				*tf.entry(*index).or_default() += 1;
			}
		}

		let mut vector = SparseVector::new();

		for (index, freq) in tf {
			let Some(idf) = self.idf.get(index as usize) else { continue };

			vector.insert(index, weight(*idf, freq as f32));
		}

		vector
	}
}
impl Default for LexicalScorer {
	fn default() -> Self {
		Self::new(DEFAULT_K1, DEFAULT_B)
	}
}

/// Lowercased ASCII alphanumeric runs.
pub fn tokenize(text: &str) -> Vec<String> {
	text.split(|ch: char| !ch.is_ascii_alphanumeric())
		.filter(|token| !token.is_empty())
		.map(|token| token.to_ascii_lowercase())
		.collect()
}
