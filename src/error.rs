use thiserror::Error;

/// Failure kinds for the show service. The router collapses these into the
/// HTTP envelope but keeps the kind, so callers can tell bad input from a
/// collaborator outage.
#[derive(Debug, Error)]
pub enum ShowError {
    #[error("invalid show input: {0}")]
    InvalidInput(String),

    #[error("metadata provider request failed: {0:#}")]
    Provider(#[source] anyhow::Error),

    #[error("database operation failed: {0:#}")]
    Database(#[source] anyhow::Error),
}

impl ShowError {
    pub fn kind(&self) -> &'static str {
        match self {
            ShowError::InvalidInput(_) => "invalid_input",
            ShowError::Provider(_) => "provider",
            ShowError::Database(_) => "database",
        }
    }
}
