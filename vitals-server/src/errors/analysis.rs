use axum::http::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("No analysis has been run yet")]
    AnalysisNotFound,
}

impl AnalysisError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AnalysisError::AnalysisNotFound => StatusCode::NOT_FOUND,
        }
    }
}
