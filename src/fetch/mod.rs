//! Fetching payloads with timeout, bounded retry and per-attempt telemetry.

pub mod engine;
pub mod http;

pub use engine::{FetchEngine, FetchSuccess};
pub use http::HttpFetcher;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

use crate::store::StoreError;

/// A completed transfer. Any HTTP status counts as a completed transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPayload {
    pub url: String,
    pub status: u16,
    pub body: String,
}

/// Issues a single GET for a source URL.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn get(&self, url: &str) -> Result<FetchedPayload, FetchError>;
}

#[derive(Debug, Error)]
pub enum FetchError {
    /// No response within the timeout window.
    #[error("no response within {0:?}")]
    Timeout(Duration),
    /// Network or connection failure.
    #[error("transport error: {0}")]
    Transport(String),
    /// Every allowed attempt for one request index failed.
    #[error("{attempts} consecutive failed attempts")]
    RetryExhausted { attempts: u32 },
    /// Writing telemetry or derived records failed.
    #[error("analytics failed: {0}")]
    Aggregation(#[from] StoreError),
}

impl FetchError {
    /// Timeouts and transport errors are retried; everything else is final.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Timeout(_) | FetchError::Transport(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Transport(e.to_string())
    }
}

/// Progress of one (salvo, request) pair through its attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchEvent {
    AttemptStarted {
        salvo_no: i64,
        req_no: i64,
        attempt_no: u32,
        url: String,
    },
    AttemptFailed {
        salvo_no: i64,
        req_no: i64,
        attempt_no: u32,
        reason: String,
    },
    /// Non-terminal: another attempt is about to start.
    Retrying {
        salvo_no: i64,
        req_no: i64,
        next_attempt: u32,
        message: String,
    },
    Succeeded {
        salvo_no: i64,
        req_no: i64,
        attempt_no: u32,
        call_id: i64,
    },
    Exhausted {
        salvo_no: i64,
        req_no: i64,
        attempts: u32,
    },
}

impl FetchEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FetchEvent::Succeeded { .. } | FetchEvent::Exhausted { .. })
    }
}

pub type EventSender = UnboundedSender<FetchEvent>;
