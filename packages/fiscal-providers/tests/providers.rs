use reqwest::header::{AUTHORIZATION, HeaderName};
use serde_json::{Map, Value};

#[test]
fn builds_bearer_auth_header() {
	let headers =
		fiscal_providers::auth_headers("secret", &Map::new()).expect("Failed to build headers.");
	let value = headers.get(AUTHORIZATION).expect("Missing authorization header.");

	assert_eq!(value, "Bearer secret");
}

#[test]
fn merges_default_headers() {
	let mut defaults = Map::new();

	defaults.insert("x-tenant".to_string(), Value::String("treasury".to_string()));

	let headers =
		fiscal_providers::auth_headers("secret", &defaults).expect("Failed to build headers.");

	assert_eq!(headers.get(HeaderName::from_static("x-tenant")).expect("Missing header."), "treasury");
}

#[test]
fn rejects_non_string_default_headers() {
	let mut defaults = Map::new();

	defaults.insert("x-retries".to_string(), Value::from(3));

	assert!(fiscal_providers::auth_headers("secret", &defaults).is_err());
}

#[test]
fn reuses_client_per_timeout() {
	assert!(fiscal_providers::http_client(1_500).is_ok());
	assert!(fiscal_providers::http_client(1_500).is_ok());
	assert!(fiscal_providers::http_client(2_500).is_ok());
}

#[test]
fn endpoint_joins_base_and_path() {
	assert_eq!(
		fiscal_providers::endpoint("http://localhost:9000/", "/v1/embeddings"),
		"http://localhost:9000/v1/embeddings"
	);
}

#[tokio::test]
async fn unreachable_provider_is_an_error() {
	let cfg = fiscal_config::ProviderConfig {
		provider_id: "local".to_string(),
		api_base: "http://127.0.0.1:9".to_string(),
		api_key: "key".to_string(),
		path: "/rerank".to_string(),
		model: "m".to_string(),
		timeout_ms: 500,
		default_headers: Map::new(),
	};
	let result = fiscal_providers::rerank::rerank(&cfg, "housing", &["doc".to_string()]).await;

	assert!(result.is_err());
}
