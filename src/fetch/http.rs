//! reqwest-backed fetcher.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::{FetchError, FetchedPayload, Fetcher};

const USER_AGENT: &str = concat!("pastesalvo/", env!("CARGO_PKG_VERSION"));

/// Resolve user agent from config value.
pub fn resolve_user_agent(config: Option<&str>) -> String {
    match config {
        None | Some("") => USER_AGENT.to_string(),
        Some(custom) => custom.to_string(),
    }
}

/// HTTP fetcher for paste sources.
///
/// No overall request timeout is set here; the engine races each attempt
/// against its own timer.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: Option<&str>, connect_timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(resolve_user_agent(user_agent))
            .connect_timeout(connect_timeout)
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get(&self, url: &str) -> Result<FetchedPayload, FetchError> {
        let start = Instant::now();
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        debug!(
            url,
            status,
            bytes = body.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Fetched payload"
        );

        Ok(FetchedPayload {
            url: url.to_string(),
            status,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Router};

    async fn spawn_paste_server() -> String {
        let app = Router::new()
            .route("/raw/ok", get(|| async { "ab\nabc\n a" }))
            .route(
                "/raw/missing",
                get(|| async { (StatusCode::NOT_FOUND, "gone") }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_resolve_user_agent() {
        assert!(resolve_user_agent(None).starts_with("pastesalvo/"));
        assert!(resolve_user_agent(Some("")).starts_with("pastesalvo/"));
        assert_eq!(resolve_user_agent(Some("MyBot/1.0")), "MyBot/1.0");
    }

    #[tokio::test]
    async fn test_fetch_body_and_status() {
        let base = spawn_paste_server().await;
        let fetcher = HttpFetcher::new(None, Duration::from_secs(5)).unwrap();

        let ok = fetcher.get(&format!("{base}/raw/ok")).await.unwrap();
        assert_eq!(ok.status, 200);
        assert_eq!(ok.body, "ab\nabc\n a");

        // Non-2xx responses are still completed transfers
        let missing = fetcher.get(&format!("{base}/raw/missing")).await.unwrap();
        assert_eq!(missing.status, 404);
        assert_eq!(missing.body, "gone");
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let fetcher = HttpFetcher::new(None, Duration::from_secs(5)).unwrap();
        let err = fetcher.get(&format!("http://{addr}/raw/x")).await.unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
        assert!(err.is_retryable());
    }
}
