//! Salvo-scoped and lifetime statistics.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::models::{Call, LongestLine};
use crate::store::{Store, StoreResult};

/// Min/max/mean call duration in milliseconds. All zero for an empty salvo.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Default)]
pub struct DurationStats {
    pub min_ms: i64,
    pub max_ms: i64,
    pub avg_ms: f64,
}

impl DurationStats {
    pub fn from_calls(calls: &[Call]) -> Self {
        if calls.is_empty() {
            return Self::default();
        }
        let durations: Vec<i64> = calls.iter().map(Call::duration_ms).collect();
        let total: i64 = durations.iter().sum();
        Self {
            min_ms: durations.iter().copied().min().unwrap_or(0),
            max_ms: durations.iter().copied().max().unwrap_or(0),
            avg_ms: total as f64 / durations.len() as f64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalvoStats {
    pub salvo_no: i64,
    pub durations: DurationStats,
    pub retry_count: u64,
    /// Sum over every character record ever written, not just this salvo.
    pub lifetime_chars: u64,
    pub longest_lines: Vec<LongestLine>,
    /// Per-character totals over this salvo's calls.
    pub char_totals: BTreeMap<char, u64>,
}

impl SalvoStats {
    /// Flatten into the labelled mapping served by `/stats`.
    pub fn to_labelled(&self) -> BTreeMap<String, Value> {
        let s = self.salvo_no;
        let mut out = BTreeMap::new();
        out.insert(
            format!("salvo no={s}: min call duration"),
            Value::from(self.durations.min_ms),
        );
        out.insert(
            format!("salvo no={s}: max call duration"),
            Value::from(self.durations.max_ms),
        );
        out.insert(
            format!("salvo no={s}: average call duration"),
            Value::from(self.durations.avg_ms),
        );
        out.insert(
            format!("salvo no={s}: retry count"),
            Value::from(self.retry_count),
        );
        out.insert(
            "total chars across server lifetime".to_string(),
            Value::from(self.lifetime_chars),
        );
        for line in &self.longest_lines {
            out.insert(
                format!("{} longest line", line.url),
                Value::from(line.longest_length),
            );
        }
        for (ch, total) in &self.char_totals {
            out.insert(format!("s={s} {ch}#"), Value::from(*total));
        }
        out
    }
}

/// Computes [`SalvoStats`] from whatever the store holds.
#[derive(Clone)]
pub struct StatsAggregator {
    store: Arc<dyn Store>,
}

impl StatsAggregator {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Runs each stage in order against the store; nothing is cached between calls.
    pub async fn compute(&self, salvo_no: i64) -> StoreResult<SalvoStats> {
        let calls = self.store.calls_for_salvo(salvo_no).await?;
        let durations = DurationStats::from_calls(&calls);

        let retry_count = self.store.count_retries(salvo_no).await?;
        let lifetime_chars = self.store.total_char_frequency().await?;
        let longest_lines = self.store.longest_lines().await?;

        let call_ids = self.store.call_ids_for_salvo(salvo_no).await?;
        let frequencies = self.store.frequencies_for_calls(&call_ids).await?;
        debug!(
            salvo_no,
            calls = call_ids.len(),
            records = frequencies.len(),
            "Folding character totals"
        );

        let mut char_totals = BTreeMap::new();
        for record in frequencies {
            *char_totals.entry(record.ch).or_insert(0) += record.freq;
        }

        Ok(SalvoStats {
            salvo_no,
            durations,
            retry_count,
            lifetime_chars,
            longest_lines,
            char_totals,
        })
    }
}
