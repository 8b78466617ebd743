use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::api::AppState;
use crate::domain::SeriesKind;
use crate::error::AppError;
use crate::orchestration::{CrossReport, SeriesReport};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerLawQuery {
    pub window_days: Option<i64>,
}

pub async fn get_powerlaw(
    Path(kind): Path<String>,
    Query(params): Query<PowerLawQuery>,
    State(state): State<AppState>,
) -> Result<Json<SeriesReport>, AppError> {
    let kind: SeriesKind = kind.parse().map_err(AppError::NotFound)?;
    let report = state.analysis.report(kind, params.window_days).await?;
    Ok(Json(report))
}

pub async fn get_price_vs_hashrate(
    State(state): State<AppState>,
) -> Result<Json<CrossReport>, AppError> {
    let report = state.analysis.price_vs_hashrate().await?;
    Ok(Json(report))
}
