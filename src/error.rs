use thiserror::Error;

/// Failures raised while turning a Fetch into an executable script.
///
/// Every variant is fatal for the request: no partial script is returned.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },
    #[error("invalid format: {0}")]
    Format(String),
    #[error("fetch '{fetch}' has no {relation}")]
    MissingRelation {
        fetch: String,
        relation: &'static str,
    },
    #[error("invalid connection URI: {0}")]
    InvalidUri(String),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl ScriptError {
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        ScriptError::NotFound {
            kind,
            name: name.into(),
        }
    }
}
