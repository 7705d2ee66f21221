//! HTTP front end for the fetch engine and stats aggregator.
//!
//! - `GET /pastebin?salvoNo=&reqNo=` runs one fetch (with retries)
//! - `GET /stats?salvoNo=` returns the labelled statistics for a salvo
//! - `GET /health`

mod handlers;
mod routes;

pub use routes::create_router;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;

use crate::analysis::AnalyticsPipeline;
use crate::config::Settings;
use crate::fetch::{FetchEngine, HttpFetcher};
use crate::stats::StatsAggregator;
use crate::store::{open_store, Store};

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<FetchEngine>,
    pub stats: Arc<StatsAggregator>,
}

impl AppState {
    pub async fn new(settings: &Settings) -> anyhow::Result<Self> {
        let store = open_store(settings).await.context("failed to open store")?;
        let fetcher = HttpFetcher::new(Some(&settings.user_agent), settings.request_timeout())
            .context("failed to build HTTP client")?;
        let sources = settings.source_pool()?;

        let pipeline = AnalyticsPipeline::new(store.clone())
            .with_amplification(settings.amplification())
            .with_write_concurrency(settings.write_concurrency);
        let engine = FetchEngine::new(sources, Arc::new(fetcher), store.clone())
            .with_pipeline(pipeline)
            .with_timeout(settings.request_timeout())
            .with_max_attempts(settings.max_attempts);

        Ok(Self::from_parts(engine, store))
    }

    pub fn from_parts(engine: FetchEngine, store: Arc<dyn Store>) -> Self {
        Self {
            engine: Arc::new(engine),
            stats: Arc::new(StatsAggregator::new(store)),
        }
    }
}

/// Start the web server.
pub async fn serve(settings: &Settings, host: &str, port: u16) -> anyhow::Result<()> {
    let state = AppState::new(settings).await?;
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    tracing::info!("Listening to requests on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
