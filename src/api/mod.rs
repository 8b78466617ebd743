pub mod health;
pub mod network;
pub mod powerlaw;
pub mod wallet;

use crate::datasource::KaspaApi;
use crate::orchestration::{AnalysisService, WalletEngine};
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub api: Arc<dyn KaspaApi>,
    pub wallet: Arc<WalletEngine>,
    pub analysis: Arc<AnalysisService>,
}

impl AppState {
    pub fn new(
        api: Arc<dyn KaspaApi>,
        wallet: Arc<WalletEngine>,
        analysis: Arc<AnalysisService>,
    ) -> Self {
        Self {
            api,
            wallet,
            analysis,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/wallet", get(wallet::get_wallet))
        .route("/v1/powerlaw/:kind", get(powerlaw::get_powerlaw))
        .route("/v1/cross/price-hashrate", get(powerlaw::get_price_vs_hashrate))
        .route("/v1/network", get(network::get_network))
        .layer(cors)
        .with_state(state)
}
