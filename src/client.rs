//! Batch client: fires one salvo of concurrent fetches at a running server
//! and collects the resulting stats.

use std::collections::BTreeMap;
use std::time::Duration;

use futures::future::join_all;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::fetch::FetchSuccess;
use crate::store::{Store, StoreResult};

pub const DEFAULT_SALVO_SIZE: usize = 7;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid server url: {0}")]
    Url(#[from] url::ParseError),
}

/// Salvo number to use next: one past the highest recorded, or 1.
pub async fn next_salvo_no(store: &dyn Store) -> StoreResult<i64> {
    Ok(store.max_salvo_no().await?.map_or(1, |max| max + 1))
}

#[derive(Debug, Clone)]
pub struct SalvoReport {
    pub salvo_no: i64,
    pub succeeded: usize,
    pub failed: usize,
    pub stats: BTreeMap<String, Value>,
}

pub struct SalvoClient {
    client: reqwest::Client,
    base_url: Url,
}

impl SalvoClient {
    /// With `timeout: None` each request waits for the server, which bounds
    /// it by its own attempt limit and per-attempt timeout.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, ClientError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;
        Ok(Self {
            client,
            base_url: Url::parse(base_url)?,
        })
    }

    /// Fire `count` concurrent fetches for `salvo_no`, wait for all of them,
    /// then fetch the salvo's stats.
    pub async fn run(&self, salvo_no: i64, count: usize) -> Result<SalvoReport, ClientError> {
        info!("Firing salvo {} with {} requests", salvo_no, count);

        let requests = (0..count).map(|req_no| self.fetch_one(salvo_no, req_no as i64));
        let results = join_all(requests).await;

        let mut succeeded = 0;
        let mut failed = 0;
        for (req_no, result) in results.into_iter().enumerate() {
            match result {
                Ok(success) => {
                    info!("req {} stored as call {}", req_no, success.call_id);
                    succeeded += 1;
                }
                Err(e) => {
                    warn!("req {} failed: {}", req_no, e);
                    failed += 1;
                }
            }
        }

        let stats = self.stats(salvo_no).await?;
        Ok(SalvoReport {
            salvo_no,
            succeeded,
            failed,
            stats,
        })
    }

    async fn fetch_one(&self, salvo_no: i64, req_no: i64) -> Result<FetchSuccess, ClientError> {
        let mut url = self.base_url.join("pastebin")?;
        url.query_pairs_mut()
            .append_pair("salvoNo", &salvo_no.to_string())
            .append_pair("reqNo", &req_no.to_string());

        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.json().await?)
    }

    pub async fn stats(&self, salvo_no: i64) -> Result<BTreeMap<String, Value>, ClientError> {
        let mut url = self.base_url.join("stats")?;
        url.query_pairs_mut()
            .append_pair("salvoNo", &salvo_no.to_string());

        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewCall;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_next_salvo_no_empty_store() {
        let store = MemoryStore::new();
        assert_eq!(next_salvo_no(&store).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_next_salvo_no_after_max() {
        let store = MemoryStore::new();
        for salvo_no in [3, 7, 5] {
            store
                .insert_call(NewCall::failed(salvo_no, 0, 1, 0))
                .await
                .unwrap();
        }
        assert_eq!(next_salvo_no(&store).await.unwrap(), 8);
    }

    /// `/pastebin` answers after `delay`; `/stats` answers immediately.
    async fn spawn_slow_server(delay: Duration) -> String {
        use axum::{routing::get, Json, Router};
        use serde_json::json;

        let app = Router::new()
            .route(
                "/pastebin",
                get(move || async move {
                    tokio::time::sleep(delay).await;
                    Json(json!({ "callId": 1, "salvoNo": 1 }))
                }),
            )
            .route(
                "/stats",
                get(|| async { Json(json!({ "salvo no=1: retry count": 0 })) }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_run_waits_for_slow_requests_by_default() {
        let base_url = spawn_slow_server(Duration::from_millis(400)).await;

        let report = SalvoClient::new(&base_url, None)
            .unwrap()
            .run(1, 3)
            .await
            .unwrap();
        assert_eq!(report.succeeded, 3);
        assert_eq!(report.failed, 0);
        assert_eq!(report.stats["salvo no=1: retry count"], Value::from(0));
    }

    #[tokio::test]
    async fn test_explicit_timeout_counts_slow_requests_as_failed() {
        let base_url = spawn_slow_server(Duration::from_millis(400)).await;

        let report = SalvoClient::new(&base_url, Some(Duration::from_millis(100)))
            .unwrap()
            .run(1, 2)
            .await
            .unwrap();
        assert_eq!(report.succeeded, 0);
        assert_eq!(report.failed, 2);
    }

    #[test]
    fn test_rejects_bad_base_url() {
        assert!(matches!(
            SalvoClient::new("not a url", None),
            Err(ClientError::Url(_))
        ));
    }
}
