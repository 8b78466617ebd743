use axum::extract::State;
use axum::Json;

use crate::api::AppState;
use crate::datasource::NetworkSummary;
use crate::error::AppError;

pub async fn get_network(State(state): State<AppState>) -> Result<Json<NetworkSummary>, AppError> {
    let summary = state.api.fetch_network_summary().await?;
    Ok(Json(summary))
}
