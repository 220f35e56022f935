use qdrant_client::qdrant::{FieldCondition, Filter, condition::ConditionOneOf, r#match::MatchValue};

use fiscal_domain::year_intent::YearFilter;
use fiscal_storage::qdrant::year_filter_to_qdrant;

fn single_field_condition(filter: &Filter) -> &FieldCondition {
	assert_eq!(filter.must.len(), 1);

	match filter.must[0].condition_one_of.as_ref() {
		Some(ConditionOneOf::Field(field)) => field,
		other => panic!("Expected field condition, got {other:?}."),
	}
}

#[test]
fn unbounded_filter_has_no_qdrant_filter() {
	assert!(year_filter_to_qdrant(&YearFilter::Unbounded).is_none());
}

#[test]
fn year_set_becomes_integer_membership() {
	let filter = year_filter_to_qdrant(&YearFilter::Years { years: vec![2024, 2025] })
		.expect("Expected a filter.");
	let field = single_field_condition(&filter);

	assert_eq!(field.key, "financial_year");

	let matched = field.r#match.as_ref().and_then(|m| m.match_value.as_ref());

	match matched {
		Some(MatchValue::Integers(integers)) => assert_eq!(integers.integers, vec![2024, 2025]),
		other => panic!("Expected integer membership, got {other:?}."),
	}
}

#[test]
fn year_range_becomes_inclusive_bounds() {
	let filter = year_filter_to_qdrant(&YearFilter::Range { start: 2018, end: 2025 })
		.expect("Expected a filter.");
	let field = single_field_condition(&filter);
	let range = field.range.as_ref().expect("Expected a range.");

	assert_eq!(range.gte, Some(2018.0));
	assert_eq!(range.lte, Some(2025.0));
	assert!(range.gt.is_none());
	assert!(range.lt.is_none());
}

#[test]
fn conditions_are_plain_must_clauses() {
	let filter = year_filter_to_qdrant(&YearFilter::Years { years: vec![2025] })
		.expect("Expected a filter.");

	assert!(filter.should.is_empty());
	assert!(filter.must_not.is_empty());
	assert_eq!(filter.must.len(), 1);
}
