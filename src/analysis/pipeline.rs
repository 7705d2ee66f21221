//! Per-fetch analytics: longest line per source and character distribution.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::debug;

use super::amplify::{amplify, Amplification};
use crate::config::DEFAULT_WRITE_CONCURRENCY;
use crate::fetch::FetchedPayload;
use crate::models::{now_millis, Call, NewCall, NewCharFrequency};
use crate::store::{Store, StoreResult};

/// Occurrences of each character in `payload`, in one pass.
pub fn char_frequencies(payload: &str) -> BTreeMap<char, u64> {
    let mut freqs = BTreeMap::new();
    for ch in payload.chars() {
        *freqs.entry(ch).or_insert(0) += 1;
    }
    freqs
}

/// Length in chars of the longest `'\n'`-separated line.
pub fn longest_line(payload: &str) -> u64 {
    payload
        .split('\n')
        .map(|line| line.chars().count() as u64)
        .max()
        .unwrap_or(0)
}

/// Writes the derived records for a successful fetch.
#[derive(Clone)]
pub struct AnalyticsPipeline {
    store: Arc<dyn Store>,
    amplification: Amplification,
    write_concurrency: usize,
}

impl AnalyticsPipeline {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            amplification: Amplification::WallClock,
            write_concurrency: DEFAULT_WRITE_CONCURRENCY,
        }
    }

    pub fn with_amplification(mut self, amplification: Amplification) -> Self {
        self.amplification = amplification;
        self
    }

    pub fn with_write_concurrency(mut self, write_concurrency: usize) -> Self {
        self.write_concurrency = write_concurrency.max(1);
        self
    }

    /// Record a successful attempt.
    ///
    /// Order: longest-line check on the raw body, amplify, insert the call,
    /// then its character frequencies (which reference the call id).
    pub async fn record_success(
        &self,
        salvo_no: i64,
        req_no: i64,
        attempt_no: u32,
        req_start: i64,
        fetched: &FetchedPayload,
    ) -> StoreResult<Call> {
        self.ensure_longest_line(&fetched.url, &fetched.body).await?;

        let minute = self.amplification.minute();
        let payload = amplify(&fetched.body, minute);
        let freqs = char_frequencies(&payload);
        let char_count: u64 = freqs.values().sum();

        let call = self
            .store
            .insert_call(NewCall {
                salvo_no,
                req_no,
                status: fetched.status,
                req_start,
                res_finish: now_millis(),
                attempt_no,
                char_count,
            })
            .await?;

        debug!(
            call_id = call.id,
            minute,
            char_count,
            distinct = freqs.len(),
            "Recording character frequencies"
        );
        self.record_char_frequencies(call.id, freqs).await?;
        Ok(call)
    }

    /// Insert a longest-line record for `url` unless one already exists.
    /// Returns whether a record was written.
    pub async fn ensure_longest_line(&self, url: &str, payload: &str) -> StoreResult<bool> {
        if self.store.longest_line_for(url).await?.is_some() {
            return Ok(false);
        }
        let length = longest_line(payload);
        let written = self.store.insert_longest_line(url, length).await?;
        if written {
            debug!(url, length, "Recorded longest line");
        }
        Ok(written)
    }

    /// Concurrent, unordered inserts; fails on the first error without rollback.
    pub async fn record_char_frequencies(
        &self,
        call_id: i64,
        freqs: BTreeMap<char, u64>,
    ) -> StoreResult<()> {
        let store = &self.store;
        stream::iter(freqs)
            .map(|(ch, freq)| store.insert_char_frequency(NewCharFrequency { call_id, ch, freq }))
            .buffer_unordered(self.write_concurrency)
            .try_for_each(|_| async { Ok(()) })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn payload(url: &str, body: &str) -> FetchedPayload {
        FetchedPayload {
            url: url.to_string(),
            status: 200,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_longest_line_example() {
        assert_eq!(longest_line("ab\nabc\n a"), 3);
        assert_eq!(longest_line(""), 0);
        assert_eq!(longest_line("héllo\nhi"), 5);
    }

    #[test]
    fn test_char_frequencies_sum_to_char_count() {
        let text = "ab\nabc\n a";
        let freqs = char_frequencies(text);
        assert_eq!(freqs[&'a'], 3);
        assert_eq!(freqs[&'\n'], 2);
        assert_eq!(freqs[&' '], 1);
        assert_eq!(freqs.values().sum::<u64>(), text.chars().count() as u64);
    }

    #[tokio::test]
    async fn test_record_success_with_minute_zero() {
        let store = Arc::new(MemoryStore::new());
        let pipeline =
            AnalyticsPipeline::new(store.clone()).with_amplification(Amplification::Fixed(0));

        let call = pipeline
            .record_success(1, 0, 1, now_millis(), &payload("https://a.test", "ab\nabc\n a"))
            .await
            .unwrap();

        assert_eq!(call.char_count, 9);
        assert_eq!(call.status, 200);

        let freqs = store.frequencies_for_call(call.id).await.unwrap();
        assert_eq!(freqs.iter().map(|f| f.freq).sum::<u64>(), call.char_count);

        let line = store.longest_line_for("https://a.test").await.unwrap().unwrap();
        assert_eq!(line.longest_length, 3);
    }

    #[tokio::test]
    async fn test_amplified_count_and_raw_longest_line() {
        let store = Arc::new(MemoryStore::new());
        let pipeline =
            AnalyticsPipeline::new(store.clone()).with_amplification(Amplification::Fixed(4));

        let call = pipeline
            .record_success(1, 0, 1, now_millis(), &payload("https://a.test", "abc\nd"))
            .await
            .unwrap();

        assert_eq!(call.char_count, 25);
        let freqs = store.frequencies_for_call(call.id).await.unwrap();
        assert_eq!(freqs.iter().map(|f| f.freq).sum::<u64>(), 25);

        // Measured on the raw body, not the concatenated copies
        let line = store.longest_line_for("https://a.test").await.unwrap().unwrap();
        assert_eq!(line.longest_length, 3);
    }

    #[tokio::test]
    async fn test_existing_longest_line_never_changes() {
        let store = Arc::new(MemoryStore::new());
        let pipeline =
            AnalyticsPipeline::new(store.clone()).with_amplification(Amplification::Fixed(0));

        pipeline
            .record_success(1, 0, 1, now_millis(), &payload("https://a.test", "short"))
            .await
            .unwrap();
        pipeline
            .record_success(1, 1, 1, now_millis(), &payload("https://a.test", "a much longer line"))
            .await
            .unwrap();

        let lines = store.longest_lines().await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].longest_length, 5);
    }
}
