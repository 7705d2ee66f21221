//! Request handlers.

use std::collections::BTreeMap;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};

use super::AppState;
use crate::fetch::FetchSuccess;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchQuery {
    pub salvo_no: i64,
    pub req_no: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsQuery {
    pub salvo_no: i64,
}

/// Any failure past query parsing surfaces as a generic 500.
pub struct ApiError(String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": self.0 })),
        )
            .into_response()
    }
}

pub async fn fetch(
    State(state): State<AppState>,
    Query(query): Query<FetchQuery>,
) -> Result<Json<FetchSuccess>, ApiError> {
    info!("GET /pastebin salvo {} req {}", query.salvo_no, query.req_no);

    match state.engine.fetch(query.salvo_no, query.req_no, None).await {
        Ok(success) => Ok(Json(success)),
        Err(e) => {
            error!("salvo {} req {} failed: {}", query.salvo_no, query.req_no, e);
            Err(ApiError(e.to_string()))
        }
    }
}

pub async fn stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<BTreeMap<String, Value>>, ApiError> {
    info!("GET /stats salvo {}", query.salvo_no);

    match state.stats.compute(query.salvo_no).await {
        Ok(stats) => Ok(Json(stats.to_labelled())),
        Err(e) => {
            error!("/stats error for salvo {}: {}", query.salvo_no, e);
            Err(ApiError(e.to_string()))
        }
    }
}

pub async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::analysis::{Amplification, AnalyticsPipeline};
    use crate::fetch::{FetchEngine, FetchError, FetchedPayload, Fetcher};
    use crate::server::create_router;
    use crate::sources::SourcePool;
    use crate::store::{MemoryStore, Store};

    struct FixedFetcher(Option<&'static str>);

    #[async_trait]
    impl Fetcher for FixedFetcher {
        async fn get(&self, url: &str) -> Result<FetchedPayload, FetchError> {
            match self.0 {
                Some(body) => Ok(FetchedPayload {
                    url: url.to_string(),
                    status: 200,
                    body: body.to_string(),
                }),
                None => Err(FetchError::Transport("refused".to_string())),
            }
        }
    }

    fn state(body: Option<&'static str>) -> (AppState, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let dyn_store: Arc<dyn Store> = store.clone();
        let engine = FetchEngine::new(
            SourcePool::new(["https://a.test/raw/1"]).unwrap(),
            Arc::new(FixedFetcher(body)),
            dyn_store.clone(),
        )
        .with_pipeline(
            AnalyticsPipeline::new(dyn_store.clone()).with_amplification(Amplification::Fixed(0)),
        )
        .with_timeout(Duration::from_secs(1))
        .with_max_attempts(3);
        (AppState::from_parts(engine, dyn_store), store)
    }

    async fn get_json(state: AppState, uri: &str) -> (StatusCode, Value) {
        let response = create_router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_fetch_route_returns_call_id() {
        let (state, store) = state(Some("ab\nabc\n a"));
        let (status, body) = get_json(state, "/pastebin?salvoNo=4&reqNo=0").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["salvoNo"], 4);
        let call_id = body["callId"].as_i64().unwrap();
        assert_eq!(store.calls_for_salvo(4).await.unwrap()[0].id, call_id);
    }

    #[tokio::test]
    async fn test_fetch_route_exhausted_is_500() {
        let (state, store) = state(None);
        let (status, body) = get_json(state, "/pastebin?salvoNo=1&reqNo=0").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "3 consecutive failed attempts");
        assert_eq!(store.calls_for_salvo(1).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_fetch_route_rejects_bad_query() {
        let (state, _) = state(Some("x"));
        let (status, _) = get_json(state, "/pastebin?salvoNo=abc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_stats_route_labels() {
        let (state, _) = state(Some("ab\nabc\n a"));
        let (status, _) = get_json(state.clone(), "/pastebin?salvoNo=2&reqNo=0").await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = get_json(state, "/stats?salvoNo=2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["salvo no=2: retry count"], 0);
        assert_eq!(body["total chars across server lifetime"], 9);
        assert_eq!(body["https://a.test/raw/1 longest line"], 3);
        assert_eq!(body["s=2 a#"], 3);
    }

    #[tokio::test]
    async fn test_health() {
        let (state, _) = state(None);
        let (status, body) = get_json(state, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
    }
}
