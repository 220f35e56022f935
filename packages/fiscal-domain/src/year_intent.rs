use std::{collections::BTreeSet, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use fiscal_config::MAX_RECENCY_WINDOW;

static EXPLICIT_YEAR: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"\b(?:fy)?(20\d{2})\b").expect("explicit year pattern is valid")
});
static LAST_N_YEARS: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"\blast\s+(\d{1,2})\s+years?\b").expect("last-n-years pattern is valid")
});
static SINCE_YEAR: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"\bsince\s+(?:fy)?(20\d{2})\b").expect("since-year pattern is valid")
});

const RECENT_TERMS: [&str; 3] = ["recent", "latest", "current"];
const BROAD_HORIZON_TERMS: [&str; 9] = [
	"trend",
	"over time",
	"over the years",
	"historical",
	"year-on-year",
	"yoy",
	"since fy",
	"since 20",
	"last ",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YearMode {
	Explicit,
	Recent,
	Range,
	None,
}
impl YearMode {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Explicit => "explicit",
			Self::Recent => "recent",
			Self::Range => "range",
			Self::None => "none",
		}
	}
}

/// Fiscal-year scope requested by a query.
///
/// `Range` always carries exactly two ordered endpoints. `Explicit` carries the sorted distinct
/// years named in the query. `Recent` and `None` carry no years.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearIntent {
	pub mode: YearMode,
	pub years: Vec<i32>,
	pub broad_horizon: bool,
}
impl YearIntent {
	pub fn none() -> Self {
		Self { mode: YearMode::None, years: Vec::new(), broad_horizon: false }
	}

	pub fn explicit<I>(years: I, broad_horizon: bool) -> Self
	where
		I: IntoIterator<Item = i32>,
	{
		let years: BTreeSet<i32> = years.into_iter().collect();

		if years.is_empty() {
			return Self { mode: YearMode::None, years: Vec::new(), broad_horizon };
		}

		Self { mode: YearMode::Explicit, years: years.into_iter().collect(), broad_horizon }
	}

	pub fn range(start: i32, end: i32) -> Self {
		Self { mode: YearMode::Range, years: vec![start.min(end), start.max(end)], broad_horizon: true }
	}

	pub fn recent(broad_horizon: bool) -> Self {
		Self { mode: YearMode::Recent, years: Vec::new(), broad_horizon }
	}
}

/// Predicate over a hit's fiscal year.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum YearFilter {
	Unbounded,
	Years { years: Vec<i32> },
	Range { start: i32, end: i32 },
}
impl YearFilter {
	pub fn is_unbounded(&self) -> bool {
		matches!(self, Self::Unbounded)
	}

	pub fn matches(&self, year: Option<i32>) -> bool {
		match (self, year) {
			(Self::Unbounded, _) => true,
			(_, None) => false,
			(Self::Years { years }, Some(year)) => years.contains(&year),
			(Self::Range { start, end }, Some(year)) => (*start..=*end).contains(&year),
		}
	}

	pub fn describe(&self) -> Option<String> {
		match self {
			Self::Unbounded => None,
			Self::Years { years } => {
				let joined = years.iter().map(|year| year.to_string()).collect::<Vec<_>>();

				Some(format!("financial_year in [{}]", joined.join(", ")))
			},
			Self::Range { start, end } =>
				Some(format!("financial_year >= {start} and financial_year <= {end}")),
		}
	}
}

pub fn infer_year_intent(
	original_query: &str,
	revised_query: &str,
	current_fiscal_year: i32,
) -> YearIntent {
	let text = format!("{original_query} {revised_query}").to_lowercase();
	let broad_horizon = BROAD_HORIZON_TERMS.iter().any(|term| text.contains(term));

	if let Some(captures) = LAST_N_YEARS.captures(&text) {
		let span = captures.get(1).and_then(|m| m.as_str().parse::<i32>().ok()).unwrap_or(1).max(1);

		return YearIntent::range(current_fiscal_year - span + 1, current_fiscal_year);
	}
	if let Some(year) = SINCE_YEAR
		.captures(&text)
		.and_then(|captures| captures.get(1))
		.and_then(|m| m.as_str().parse::<i32>().ok())
	{
		return YearIntent::range(year, current_fiscal_year);
	}

	let explicit = EXPLICIT_YEAR
		.captures_iter(&text)
		.filter_map(|captures| captures.get(1))
		.filter_map(|m| m.as_str().parse::<i32>().ok())
		.collect::<BTreeSet<_>>();

	if !explicit.is_empty() {
		return YearIntent::explicit(explicit, broad_horizon);
	}
	if RECENT_TERMS.iter().any(|term| text.contains(term)) {
		return YearIntent::recent(broad_horizon);
	}

	YearIntent { mode: YearMode::None, years: Vec::new(), broad_horizon }
}

/// Builds the retrieval predicate for an intent.
///
/// `recent` without a broad horizon narrows to the `window` newest fiscal years counting back
/// from `latest_fiscal_year`, with `window` capped at [`MAX_RECENCY_WINDOW`]; a broad `recent`
/// and `none` stay unbounded.
pub fn build_year_filter(intent: &YearIntent, window: u32, latest_fiscal_year: i32) -> YearFilter {
	match intent.mode {
		YearMode::Explicit if !intent.years.is_empty() =>
			YearFilter::Years { years: intent.years.clone() },
		YearMode::Range => match (intent.years.first(), intent.years.last()) {
			(Some(start), Some(end)) =>
				YearFilter::Range { start: *start.min(end), end: *start.max(end) },
			_ => YearFilter::Unbounded,
		},
		YearMode::Recent if !intent.broad_horizon => {
			let window = window.clamp(1, MAX_RECENCY_WINDOW) as i32;
			let years = (0..window).rev().map(|offset| latest_fiscal_year - offset).collect();

			YearFilter::Years { years }
		},
		_ => YearFilter::Unbounded,
	}
}
