use kaspalytics::orchestration::{AnalysisService, SeriesCache, WalletEngine};
use kaspalytics::{api, config::Config, CsvSeriesSource, KaspaApi, KaspaRestClient};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let port = config.port;

    let client = match KaspaRestClient::new(
        config.kaspa_api_url.clone(),
        config.http_timeout(),
        config.retry_policy(),
    ) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to create Kaspa API client: {}", e);
            std::process::exit(1);
        }
    };
    let kaspa: Arc<dyn KaspaApi> = Arc::new(client);

    let source = Arc::new(CsvSeriesSource::new(
        config.series_dir.clone(),
        config.genesis_date,
    ));
    let cache = Arc::new(SeriesCache::new(source));
    let wallet = Arc::new(WalletEngine::new(
        kaspa.clone(),
        cache.clone(),
        config.wallet_config(),
    ));
    let analysis = Arc::new(AnalysisService::new(cache, config.analysis_config()));

    // Create router
    let app = api::create_router(api::AppState::new(kaspa, wallet, analysis));

    // Bind to address
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Server listening on {}", addr);

    // Run server
    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
