use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::datasource::{KaspaApiError, SeriesError};
use crate::orchestration::{AnalysisError, WalletError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Internal server error: {0}")]
    Internal(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Unprocessable: {0}")]
    Unprocessable(String),
    #[error("Bad gateway: {0}")]
    BadGateway(String),
}

impl From<WalletError> for AppError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::InvalidAddress(_) | WalletError::InvalidWindow(_) => {
                AppError::BadRequest(err.to_string())
            }
            WalletError::MissingBalance(_) | WalletError::Network(_) => {
                AppError::BadGateway(err.to_string())
            }
            WalletError::Cancelled => AppError::Internal(err.to_string()),
        }
    }
}

impl From<AnalysisError> for AppError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::Series(e) => e.into(),
            AnalysisError::Fit(e) => AppError::Unprocessable(e.to_string()),
            AnalysisError::InvalidWindow(msg) => AppError::BadRequest(msg),
        }
    }
}

impl From<SeriesError> for AppError {
    fn from(err: SeriesError) -> Self {
        match err {
            SeriesError::Missing(_) => AppError::NotFound(err.to_string()),
            _ => AppError::Internal(err.to_string()),
        }
    }
}

impl From<KaspaApiError> for AppError {
    fn from(err: KaspaApiError) -> Self {
        AppError::BadGateway(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AddressParseError;
    use crate::engine::FitError;

    #[test]
    fn test_wallet_error_mapping() {
        let err: AppError = WalletError::InvalidAddress(AddressParseError::Empty).into();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err: AppError = WalletError::Network(KaspaApiError::Timeout).into();
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_analysis_error_mapping() {
        let err: AppError = AnalysisError::Fit(FitError::DegenerateFit).into();
        assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);

        let err: AppError = AnalysisError::Series(SeriesError::Csv("bad".to_string())).into();
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
