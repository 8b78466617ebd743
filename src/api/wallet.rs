use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::api::AppState;
use crate::domain::TimeMs;
use crate::error::AppError;
use crate::orchestration::{WalletReport, WalletRequest};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletQuery {
    pub address: String,
    pub from_ms: Option<i64>,
    pub to_ms: Option<i64>,
    pub max_transactions: Option<usize>,
}

pub async fn get_wallet(
    Query(params): Query<WalletQuery>,
    State(state): State<AppState>,
) -> Result<Json<WalletReport>, AppError> {
    if params.max_transactions == Some(0) {
        return Err(AppError::BadRequest(
            "maxTransactions must be positive".to_string(),
        ));
    }

    let request = WalletRequest {
        address: params.address,
        from: params.from_ms.map(TimeMs::new),
        to: params.to_ms.map(TimeMs::new),
        max_transactions: params.max_transactions,
    };

    let report = state.wallet.run(&request).await?;
    Ok(Json(report))
}
