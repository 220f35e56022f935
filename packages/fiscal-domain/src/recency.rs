/// Graduated recency boost for a hit from fiscal year `year`.
///
/// Years inside the trailing `window` ending at `current_fiscal_year` earn
/// `boost * (window - delta) / window`; unknown or older years earn nothing. Future years count
/// as the current year.
pub fn recency_tier_boost(year: Option<i32>, current_fiscal_year: i32, window: u32, boost: f32) -> f32 {
	let Some(year) = year else { return 0.0 };
	let window = window.max(1) as i64;
	let boost = boost.clamp(0.0, 1.0);
	let delta = (current_fiscal_year as i64 - year as i64).max(0);

	if delta >= window {
		return 0.0;
	}

	boost * (window - delta) as f32 / window as f32
}
