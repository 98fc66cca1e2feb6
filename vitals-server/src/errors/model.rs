/// Failures of the external analysis model. These never reach a client.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Model is not configured")]
    NotConfigured,

    #[error("Model request timed out")]
    Timeout,

    #[error("Model request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Model returned no text")]
    EmptyResponse,

    #[error("Model answer has no recognizable status: {0}")]
    UnrecognizedAnswer(String),
}
