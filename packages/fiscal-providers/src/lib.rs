pub mod embedding;
pub mod generation;
pub mod guardrail;
pub mod rerank;

use std::{
	collections::HashMap,
	sync::{LazyLock, Mutex},
	time::Duration,
};

use color_eyre::{Result, eyre};
use reqwest::{
	Client,
	header::{AUTHORIZATION, HeaderMap, HeaderName},
};
use serde_json::{Map, Value};

static CLIENTS: LazyLock<Mutex<HashMap<u64, Client>>> = LazyLock::new(Default::default);

pub fn auth_headers(api_key: &str, default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	headers.insert(AUTHORIZATION, format!("Bearer {api_key}").parse()?);

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(eyre::eyre!("Default header values must be strings."));
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(headers)
}

/// Process-wide HTTP client for a request timeout, built on first use.
pub fn http_client(timeout_ms: u64) -> Result<Client> {
	let mut clients =
		CLIENTS.lock().map_err(|_| eyre::eyre!("HTTP client cache lock is poisoned."))?;

	if let Some(client) = clients.get(&timeout_ms) {
		return Ok(client.clone());
	}

	let client = Client::builder().timeout(Duration::from_millis(timeout_ms)).build()?;

	clients.insert(timeout_ms, client.clone());

	Ok(client)
}

pub fn endpoint(api_base: &str, path: &str) -> String {
	format!("{}{}", api_base.trim_end_matches('/'), path)
}
