pub mod confidence;
pub mod injection;
pub mod recency;
pub mod year_intent;
