//! Fetch-retry engine.
//!
//! Each attempt picks a fresh source and races the transfer against a timer.
//! A failed attempt is recorded with status 400 before the next one starts,
//! so attempts for one request index are strictly sequential and numbered
//! 1..=max_attempts.
//!
//! The losing side of the race is dropped: when the timer wins, the
//! in-flight transfer is cancelled and can never write records afterwards.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::{EventSender, FetchError, FetchEvent, Fetcher};
use crate::analysis::AnalyticsPipeline;
use crate::config::{DEFAULT_MAX_ATTEMPTS, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::models::{now_millis, NewCall};
use crate::sources::SourcePool;
use crate::store::Store;

/// Result of an eventually successful fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchSuccess {
    pub call_id: i64,
    pub salvo_no: i64,
}

pub struct FetchEngine {
    sources: SourcePool,
    fetcher: Arc<dyn Fetcher>,
    store: Arc<dyn Store>,
    pipeline: AnalyticsPipeline,
    timeout: Duration,
    max_attempts: u32,
}

impl FetchEngine {
    pub fn new(sources: SourcePool, fetcher: Arc<dyn Fetcher>, store: Arc<dyn Store>) -> Self {
        let pipeline = AnalyticsPipeline::new(store.clone());
        Self {
            sources,
            fetcher,
            store,
            pipeline,
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_pipeline(mut self, pipeline: AnalyticsPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Fetch until an attempt succeeds or `max_attempts` attempts have failed.
    ///
    /// Progress is reported on `events` if given; a `Retrying` event is the
    /// non-terminal signal that a failed attempt is being retried.
    pub async fn fetch(
        &self,
        salvo_no: i64,
        req_no: i64,
        events: Option<&EventSender>,
    ) -> Result<FetchSuccess, FetchError> {
        let mut attempt_no = 1;
        loop {
            match self.attempt(salvo_no, req_no, attempt_no, events).await {
                Ok(success) => return Ok(success),
                Err(e) if e.is_retryable() && attempt_no < self.max_attempts => {
                    let message = format!(
                        "salvo {} req {} failed, attempting {}...",
                        salvo_no,
                        req_no,
                        attempt_no + 1
                    );
                    warn!("{}", message);
                    emit(
                        events,
                        FetchEvent::Retrying {
                            salvo_no,
                            req_no,
                            next_attempt: attempt_no + 1,
                            message,
                        },
                    );
                    attempt_no += 1;
                }
                Err(e) if e.is_retryable() => {
                    error!(
                        "salvo {} req {}: {} consecutive failed attempts",
                        salvo_no, req_no, attempt_no
                    );
                    emit(
                        events,
                        FetchEvent::Exhausted {
                            salvo_no,
                            req_no,
                            attempts: attempt_no,
                        },
                    );
                    return Err(FetchError::RetryExhausted {
                        attempts: attempt_no,
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn attempt(
        &self,
        salvo_no: i64,
        req_no: i64,
        attempt_no: u32,
        events: Option<&EventSender>,
    ) -> Result<FetchSuccess, FetchError> {
        let url = self.sources.pick().to_string();
        let req_start = now_millis();
        debug!(salvo_no, req_no, attempt_no, %url, "Starting attempt");
        emit(
            events,
            FetchEvent::AttemptStarted {
                salvo_no,
                req_no,
                attempt_no,
                url: url.clone(),
            },
        );

        let outcome = match tokio::time::timeout(self.timeout, self.fetcher.get(&url)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(self.timeout)),
        };

        match outcome {
            Ok(fetched) => {
                let call = self
                    .pipeline
                    .record_success(salvo_no, req_no, attempt_no, req_start, &fetched)
                    .await?;
                info!(
                    salvo_no,
                    req_no,
                    attempt_no,
                    call_id = call.id,
                    status = call.status,
                    "Fetch succeeded"
                );
                emit(
                    events,
                    FetchEvent::Succeeded {
                        salvo_no,
                        req_no,
                        attempt_no,
                        call_id: call.id,
                    },
                );
                Ok(FetchSuccess {
                    call_id: call.id,
                    salvo_no,
                })
            }
            Err(e) => {
                warn!(salvo_no, req_no, attempt_no, %url, "Attempt failed: {}", e);
                emit(
                    events,
                    FetchEvent::AttemptFailed {
                        salvo_no,
                        req_no,
                        attempt_no,
                        reason: e.to_string(),
                    },
                );
                self.store
                    .insert_call(NewCall::failed(salvo_no, req_no, attempt_no, req_start))
                    .await?;
                Err(e)
            }
        }
    }
}

fn emit(events: Option<&EventSender>, event: FetchEvent) {
    if let Some(tx) = events {
        // Receiver may have gone away; the fetch carries on regardless
        let _ = tx.send(event);
    }
}
