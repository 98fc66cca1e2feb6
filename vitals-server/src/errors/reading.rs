use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ReadingError {
    #[error("No valid sensor readings in payload")]
    NoValidReadings,

    #[error("Invalid value for {0}")]
    InvalidValue(&'static str),

    #[error("limit must be at least 1")]
    InvalidLimit,

    #[error("hours must be at least 1")]
    InvalidWindow,

    #[error("Malformed payload: {0}")]
    InvalidPayload(String),

    #[error("Malformed query: {0}")]
    InvalidQuery(String),
}

impl From<JsonRejection> for ReadingError {
    fn from(rejection: JsonRejection) -> Self {
        ReadingError::InvalidPayload(rejection.body_text())
    }
}

impl From<QueryRejection> for ReadingError {
    fn from(rejection: QueryRejection) -> Self {
        ReadingError::InvalidQuery(rejection.body_text())
    }
}

impl ReadingError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ReadingError::NoValidReadings => StatusCode::BAD_REQUEST,
            ReadingError::InvalidValue(_) => StatusCode::BAD_REQUEST,
            ReadingError::InvalidLimit => StatusCode::BAD_REQUEST,
            ReadingError::InvalidWindow => StatusCode::BAD_REQUEST,
            ReadingError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            ReadingError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
        }
    }
}
