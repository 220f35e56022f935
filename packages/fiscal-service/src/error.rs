use serde::Serialize;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Configuration error: {message}")]
	Config { message: String },
	#[error("Not ready: {message}")]
	Readiness { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Invalid model response: {message}")]
	InvalidResponse { message: String },
	#[error("Qdrant error: {message}")]
	Qdrant { message: String },
	#[error("Lexical error: {message}")]
	Lexical { message: String },
	#[error("Guardrails blocked at {}: {}", .0.stage, .0.reason)]
	Guardrail(GuardrailViolation),
}
impl From<color_eyre::Report> for Error {
	fn from(err: color_eyre::Report) -> Self {
		Self::Provider { message: err.to_string() }
	}
}
impl From<fiscal_storage::Error> for Error {
	fn from(err: fiscal_storage::Error) -> Self {
		match err {
			fiscal_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			fiscal_storage::Error::NotFound(message) => Self::Readiness { message },
			fiscal_storage::Error::Qdrant(inner) => Self::Qdrant { message: inner.to_string() },
		}
	}
}
impl From<fiscal_lexical::Error> for Error {
	fn from(err: fiscal_lexical::Error) -> Self {
		Self::Lexical { message: err.to_string() }
	}
}
impl From<fiscal_config::Error> for Error {
	fn from(err: fiscal_config::Error) -> Self {
		Self::Config { message: err.to_string() }
	}
}

/// A blocked guardrail check. `safe_reply` is returned to the caller verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GuardrailViolation {
	pub stage: String,
	pub reason: String,
	pub safe_reply: String,
}
