use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("Failed to initialize OCR engine: {0}")]
    InitializationError(String),

    #[error("Failed to process image: {0}")]
    ProcessingError(String),

    #[error("Failed to read document: {0}")]
    DocumentError(String),

    #[error("Failed to decode QR payload: {0}")]
    QrDecodeError(String),

    #[error("Invalid file type")]
    InvalidFileType,

    #[error("File too large (max: {max} bytes)")]
    FileTooLarge { max: usize },

    #[error("Missing file in request")]
    MissingFile,

    #[error("Unknown OCR engine: {0}")]
    UnknownEngine(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for VerifyError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            VerifyError::InitializationError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INIT_ERROR")
            }
            VerifyError::ProcessingError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "PROCESSING_ERROR")
            }
            VerifyError::DocumentError(_) => (StatusCode::UNPROCESSABLE_ENTITY, "DOCUMENT_ERROR"),
            VerifyError::QrDecodeError(_) => (StatusCode::UNPROCESSABLE_ENTITY, "QR_DECODE_ERROR"),
            VerifyError::InvalidFileType => (StatusCode::BAD_REQUEST, "INVALID_FILE_TYPE"),
            VerifyError::FileTooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "FILE_TOO_LARGE"),
            VerifyError::MissingFile => (StatusCode::BAD_REQUEST, "MISSING_FILE"),
            VerifyError::UnknownEngine(_) => (StatusCode::BAD_REQUEST, "UNKNOWN_ENGINE"),
            VerifyError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            VerifyError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}
