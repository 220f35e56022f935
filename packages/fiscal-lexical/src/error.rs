use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Failed to read lexical artifact at {path:?}.")]
	ReadArtifact { path: PathBuf, source: std::io::Error },
	#[error("Failed to write lexical artifact at {path:?}.")]
	WriteArtifact { path: PathBuf, source: std::io::Error },
	#[error("Failed to decode lexical artifact at {path:?}.")]
	DecodeArtifact { path: PathBuf, source: serde_json::Error },
	#[error(transparent)]
	Encode(#[from] serde_json::Error),
	#[error("Invalid lexical artifact: {0}")]
	InvalidArtifact(String),
}
