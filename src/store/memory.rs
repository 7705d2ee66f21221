//! In-memory store (single process only).

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Store, StoreResult};
use crate::models::{Call, CharFrequency, LongestLine, NewCall, NewCharFrequency};

#[derive(Debug, Default)]
struct MemoryState {
    calls: Vec<Call>,
    characters: Vec<CharFrequency>,
    lines: Vec<LongestLine>,
}

/// Store backed by plain vectors. Ids are assigned sequentially from 1.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_call(&self, call: NewCall) -> StoreResult<Call> {
        let mut state = self.state.write().await;
        let call = call.into_call(state.calls.len() as i64 + 1);
        state.calls.push(call.clone());
        Ok(call)
    }

    async fn calls_for_salvo(&self, salvo_no: i64) -> StoreResult<Vec<Call>> {
        let state = self.state.read().await;
        Ok(state
            .calls
            .iter()
            .filter(|c| c.salvo_no == salvo_no)
            .cloned()
            .collect())
    }

    async fn count_retries(&self, salvo_no: i64) -> StoreResult<u64> {
        let state = self.state.read().await;
        Ok(state
            .calls
            .iter()
            .filter(|c| c.salvo_no == salvo_no && c.is_retry())
            .count() as u64)
    }

    async fn call_ids_for_salvo(&self, salvo_no: i64) -> StoreResult<Vec<i64>> {
        let state = self.state.read().await;
        Ok(state
            .calls
            .iter()
            .filter(|c| c.salvo_no == salvo_no)
            .map(|c| c.id)
            .collect())
    }

    async fn max_salvo_no(&self) -> StoreResult<Option<i64>> {
        let state = self.state.read().await;
        Ok(state.calls.iter().map(|c| c.salvo_no).max())
    }

    async fn insert_char_frequency(
        &self,
        record: NewCharFrequency,
    ) -> StoreResult<CharFrequency> {
        let mut state = self.state.write().await;
        let record = record.into_frequency(state.characters.len() as i64 + 1);
        state.characters.push(record.clone());
        Ok(record)
    }

    async fn total_char_frequency(&self) -> StoreResult<u64> {
        let state = self.state.read().await;
        Ok(state.characters.iter().map(|c| c.freq).sum())
    }

    async fn frequencies_for_calls(&self, call_ids: &[i64]) -> StoreResult<Vec<CharFrequency>> {
        let state = self.state.read().await;
        Ok(state
            .characters
            .iter()
            .filter(|c| call_ids.contains(&c.call_id))
            .cloned()
            .collect())
    }

    async fn frequencies_for_call(&self, call_id: i64) -> StoreResult<Vec<CharFrequency>> {
        self.frequencies_for_calls(&[call_id]).await
    }

    async fn longest_line_for(&self, url: &str) -> StoreResult<Option<LongestLine>> {
        let state = self.state.read().await;
        Ok(state.lines.iter().find(|l| l.url == url).cloned())
    }

    async fn insert_longest_line(&self, url: &str, longest_length: u64) -> StoreResult<bool> {
        // Check and insert under one write lock so concurrent first fetches
        // of the same source cannot both insert.
        let mut state = self.state.write().await;
        if state.lines.iter().any(|l| l.url == url) {
            return Ok(false);
        }
        let id = state.lines.len() as i64 + 1;
        state.lines.push(LongestLine {
            id,
            url: url.to_string(),
            longest_length,
        });
        Ok(true)
    }

    async fn longest_lines(&self) -> StoreResult<Vec<LongestLine>> {
        let state = self.state.read().await;
        Ok(state.lines.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(salvo_no: i64, attempt_no: u32) -> NewCall {
        NewCall {
            salvo_no,
            req_no: 0,
            status: 200,
            req_start: 1_000,
            res_finish: 1_100,
            attempt_no,
            char_count: 3,
        }
    }

    #[tokio::test]
    async fn test_call_ids_are_sequential() {
        let store = MemoryStore::new();
        let a = store.insert_call(call(1, 1)).await.unwrap();
        let b = store.insert_call(call(1, 2)).await.unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(store.call_ids_for_salvo(1).await.unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_retry_count_and_max_salvo() {
        let store = MemoryStore::new();
        assert_eq!(store.max_salvo_no().await.unwrap(), None);

        store.insert_call(call(1, 1)).await.unwrap();
        store.insert_call(call(2, 1)).await.unwrap();
        store.insert_call(call(2, 2)).await.unwrap();
        store.insert_call(call(2, 3)).await.unwrap();

        assert_eq!(store.count_retries(1).await.unwrap(), 0);
        assert_eq!(store.count_retries(2).await.unwrap(), 2);
        assert_eq!(store.max_salvo_no().await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_longest_line_first_write_wins() {
        let store = MemoryStore::new();
        assert!(store.insert_longest_line("https://a", 12).await.unwrap());
        assert!(!store.insert_longest_line("https://a", 99).await.unwrap());

        let line = store.longest_line_for("https://a").await.unwrap().unwrap();
        assert_eq!(line.longest_length, 12);
        assert_eq!(store.longest_lines().await.unwrap().len(), 1);
    }
}
