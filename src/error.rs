use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::rpc::messages::{RpcError, RpcErrorCode};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Storage(#[from] sqlx::Error),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("bad request: {0}")]
    Validation(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) | AppError::Storage(sqlx::Error::RowNotFound) => {
                StatusCode::NOT_FOUND
            }
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Structured form sent back over the message bus.
    pub fn to_rpc_error(&self) -> RpcError {
        let status = self.status();
        let error_code = match status {
            StatusCode::NOT_FOUND => RpcErrorCode::NotFound,
            StatusCode::BAD_REQUEST => RpcErrorCode::BadRequest,
            _ => RpcErrorCode::Internal,
        };
        RpcError {
            error_code,
            message: self.to_string(),
            status_code: status.as_u16(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::error!(?self);
        (status, self.to_string()).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
