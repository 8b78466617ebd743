use axum::extract::State;
use axum::Json;

use crate::api::AppState;
use crate::domain::SeriesKind;

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Ready once the process is serving; lists which series are already cached.
pub async fn ready(State(state): State<AppState>) -> Json<serde_json::Value> {
    let cache = state.analysis.cache();
    let loaded: Vec<&str> = SeriesKind::ALL
        .iter()
        .filter(|kind| cache.is_loaded(**kind))
        .map(|kind| kind.as_str())
        .collect();
    Json(serde_json::json!({"status": "ready", "seriesLoaded": loaded}))
}
