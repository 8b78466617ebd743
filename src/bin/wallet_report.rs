//! Run one wallet session and print the report as JSON.
//!
//! Usage: `wallet_report <address> [fromMs] [toMs]`

use anyhow::{bail, Context, Result};
use kaspalytics::orchestration::{SeriesCache, WalletEngine, WalletRequest};
use kaspalytics::{config::Config, CsvSeriesSource, KaspaRestClient, TimeMs};
use std::sync::Arc;

fn parse_ms(arg: Option<String>, name: &str) -> Result<Option<TimeMs>> {
    arg.map(|s| {
        s.parse::<i64>()
            .map(TimeMs::new)
            .with_context(|| format!("{} must be epoch milliseconds, got {}", name, s))
    })
    .transpose()
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let Some(address) = args.next() else {
        bail!("usage: wallet_report <address> [fromMs] [toMs]");
    };
    let from = parse_ms(args.next(), "fromMs")?;
    let to = parse_ms(args.next(), "toMs")?;

    let config = Config::from_env().context("loading configuration")?;
    let client = KaspaRestClient::new(
        config.kaspa_api_url.clone(),
        config.http_timeout(),
        config.retry_policy(),
    )?;
    let source = Arc::new(CsvSeriesSource::new(
        config.series_dir.clone(),
        config.genesis_date,
    ));
    let cache = Arc::new(SeriesCache::new(source));
    let engine = WalletEngine::new(Arc::new(client), cache, config.wallet_config());

    let request = WalletRequest {
        from,
        to,
        ..WalletRequest::new(address)
    };
    let report = engine.run(&request).await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
