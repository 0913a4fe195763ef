use api_types::receipt::DuplicateConflict;
use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::{Duplicate, EngineError};

use serde::Serialize;
pub use ocr::OcrClient;
pub use server::{ServerState, router, run_with_listener};

mod deduct;
mod ocr;
mod receipts;
mod server;

pub mod types {
    pub mod receipt {
        pub use api_types::receipt::{
            DuplicateConflict, DuplicateKind, MarkUsed, ReceiptList, ReceiptUpdate, ReceiptView,
            ReceiptsResponse, UploadCreated,
        };
    }

    pub mod deduct {
        pub use api_types::deduct::{DeductRequest, DeductResponse};
    }

    pub mod health {
        pub use api_types::health::Health;
    }
}

pub enum ServerError {
    Engine(EngineError),
    Duplicate(Box<Duplicate>),
    Generic(String),
}

#[derive(Serialize)]
struct Error {
    error: String,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::InvalidAmount(_)
        | EngineError::InvalidReceipt(_)
        | EngineError::TooManyCandidates { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        EngineError::Extraction(_) => StatusCode::BAD_GATEWAY,
        EngineError::Archive(_) | EngineError::Internal(_) | EngineError::Database(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        EngineError::Archive(archive_err) => {
            tracing::error!("archive error: {archive_err}");
            "internal server error".to_string()
        }
        EngineError::Internal(msg) => {
            tracing::error!("internal error: {msg}");
            "internal server error".to_string()
        }
        EngineError::Extraction(msg) => {
            tracing::warn!("ocr service failed: {msg}");
            format!("OCR failed: {msg}")
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => (status_for_engine_error(&err), message_for_engine_error(err)),
            ServerError::Duplicate(duplicate) => {
                let body = DuplicateConflict {
                    error: "duplicate".to_string(),
                    kind: receipts::duplicate_kind(duplicate.kind),
                    message: duplicate.kind.message().to_string(),
                    receipt: receipts::view(&duplicate.existing),
                };
                return (StatusCode::CONFLICT, Json(body)).into_response();
            }
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(Error { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

impl From<Duplicate> for ServerError {
    fn from(value: Duplicate) -> Self {
        Self::Duplicate(Box::new(value))
    }
}
