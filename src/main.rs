use std::{net::TcpListener, sync::Arc};

use actix_web::web;
use env_logger::Env;
use fetchify::{
    configuration::get_configuration,
    services::{build_search_http_client, AppContext, BatchRuns, ExtractionClient, RateLimiter},
    startup::{build_result_store, run},
};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let configuration = get_configuration()?;

    let store = build_result_store(&configuration.database).await?;

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(address)?;

    let rate_limiter = RateLimiter::new(
        configuration.rate_limit.max_per_second,
        configuration.rate_limit.max_per_day,
    )?;
    let extractor = ExtractionClient::new(&configuration.extraction, &configuration.api_keys.openai)?;
    let shutdown = CancellationToken::new();

    let context = web::Data::new(AppContext {
        store,
        extractor: Arc::new(extractor),
        rate_limiter: Arc::new(rate_limiter),
        search_http: build_search_http_client(&configuration.search)?,
        search_settings: configuration.search.clone(),
        search_api_key: configuration.api_keys.serp_api.clone(),
        runs: BatchRuns::default(),
        shutdown: shutdown.clone(),
    });

    // Running batches stop at the next entity once the server is asked to stop.
    let shutdown_clone = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Shutdown requested, interrupting running batches");
            shutdown_clone.cancel();
        }
    });

    log::info!(
        "Search rate limited to {}/s and {}/day",
        configuration.rate_limit.max_per_second,
        configuration.rate_limit.max_per_day
    );

    run(listener, context)?.await?;
    shutdown.cancel();

    Ok(())
}
