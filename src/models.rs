//! Domain models for fetch telemetry and derived analytics.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// HTTP status recorded for an attempt that timed out or failed in transport.
pub const FAILED_ATTEMPT_STATUS: u16 = 400;

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// One fetch attempt, successful or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    pub id: i64,
    pub salvo_no: i64,
    pub req_no: i64,
    pub status: u16,
    /// Request start, ms since epoch.
    pub req_start: i64,
    /// Response finish, ms since epoch.
    pub res_finish: i64,
    /// 1-based; increments on each retry of the same request index.
    pub attempt_no: u32,
    /// Characters in the amplified payload (0 for failed attempts).
    pub char_count: u64,
}

impl Call {
    pub fn duration_ms(&self) -> i64 {
        self.res_finish - self.req_start
    }

    pub fn is_retry(&self) -> bool {
        self.attempt_no > 1
    }
}

/// A call that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCall {
    pub salvo_no: i64,
    pub req_no: i64,
    pub status: u16,
    pub req_start: i64,
    pub res_finish: i64,
    pub attempt_no: u32,
    pub char_count: u64,
}

impl NewCall {
    /// Telemetry for an attempt that never produced a payload.
    pub fn failed(salvo_no: i64, req_no: i64, attempt_no: u32, req_start: i64) -> Self {
        Self {
            salvo_no,
            req_no,
            status: FAILED_ATTEMPT_STATUS,
            req_start,
            res_finish: now_millis(),
            attempt_no,
            char_count: 0,
        }
    }

    pub fn into_call(self, id: i64) -> Call {
        Call {
            id,
            salvo_no: self.salvo_no,
            req_no: self.req_no,
            status: self.status,
            req_start: self.req_start,
            res_finish: self.res_finish,
            attempt_no: self.attempt_no,
            char_count: self.char_count,
        }
    }
}

/// Occurrence count of one character within one call's payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharFrequency {
    pub id: i64,
    pub call_id: i64,
    pub ch: char,
    pub freq: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewCharFrequency {
    pub call_id: i64,
    pub ch: char,
    pub freq: u64,
}

impl NewCharFrequency {
    pub fn into_frequency(self, id: i64) -> CharFrequency {
        CharFrequency {
            id,
            call_id: self.call_id,
            ch: self.ch,
            freq: self.freq,
        }
    }
}

/// Longest line observed for a source. Written once per source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LongestLine {
    pub id: i64,
    pub url: String,
    pub longest_length: u64,
}
