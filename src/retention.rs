//! Scheduled retention sweep.
//!
//! Prunes series entries older than the retention horizon. The retained
//! index set is computed from the timestamp series once and all four series
//! are rewritten to the retained rows, so the alignment invariant holds by
//! construction. The sweep is not transactional across sensors: a store
//! failure aborts the run (earlier sensors stay pruned, later ones
//! untouched) and the next scheduled run retries.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time;
use tracing::{error, info};

use crate::{
    error::AppError,
    sensors::series,
    store::{keys, SharedStore},
};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub sensors_pruned: usize,
    pub entries_removed: usize,
}

pub struct RetentionSweeper {
    store: SharedStore,
    max_age: chrono::Duration,
    interval: Duration,
}

impl RetentionSweeper {
    pub fn new(store: SharedStore, max_age_days: i64, interval_secs: u64) -> Self {
        Self {
            store,
            max_age: chrono::Duration::days(max_age_days),
            interval: Duration::from_secs(interval_secs),
        }
    }

    pub async fn run(self) {
        let mut ticker = time::interval(self.interval);
        info!(
            interval_secs = self.interval.as_secs(),
            max_age_days = self.max_age.num_days(),
            "retention sweeper started"
        );

        loop {
            ticker.tick().await;
            match self.sweep_once(Utc::now()).await {
                Ok(stats) => info!(
                    sensors_pruned = stats.sensors_pruned,
                    entries_removed = stats.entries_removed,
                    "retention sweep finished"
                ),
                Err(e) => error!(error = %e, "retention sweep aborted, retrying on next run"),
            }
        }
    }

    pub async fn sweep_once(&self, now: DateTime<Utc>) -> Result<SweepStats, AppError> {
        let cutoff = now - self.max_age;
        let sensor_keys = self.store.keys_by_prefix(keys::SENSOR_PREFIX).await?;

        let mut stats = SweepStats::default();
        for key in sensor_keys {
            let Some(serial_num) = key.strip_prefix(keys::SENSOR_PREFIX) else {
                continue;
            };
            let removed = self.prune_sensor(serial_num, cutoff).await?;
            if removed > 0 {
                stats.sensors_pruned += 1;
                stats.entries_removed += removed;
            }
        }
        Ok(stats)
    }

    /// Rewrites all four series of one sensor to the rows younger than the
    /// cutoff. Entries with unparseable timestamps are retained.
    async fn prune_sensor(
        &self,
        serial_num: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<usize, AppError> {
        let timestamps = self
            .store
            .list_range(&keys::series(serial_num, series::TIMESTAMP), 0, -1)
            .await?;

        let retained: Vec<usize> = timestamps
            .iter()
            .enumerate()
            .filter(|(_, raw)| match series::parse_timestamp(raw) {
                Some(ts) => ts >= cutoff,
                None => true,
            })
            .map(|(i, _)| i)
            .collect();

        if retained.len() == timestamps.len() {
            return Ok(0);
        }

        for column in series::COLUMNS {
            let key = keys::series(serial_num, column);
            let values = self.store.list_range(&key, 0, -1).await?;
            let kept: Vec<&String> = retained.iter().filter_map(|&i| values.get(i)).collect();

            self.store.delete(&key).await?;
            for value in kept {
                self.store.list_append(&key, value).await?;
            }
        }

        Ok(timestamps.len() - retained.len())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration as ChronoDuration;

    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::store::KvStore;

    async fn seed_series(store: &MemoryStore, serial: &str, rows: &[(f64, f64, f64, String)]) {
        for (temp, hum, co2, ts) in rows {
            store
                .list_append(&keys::series(serial, series::TEMPERATURE), &temp.to_string())
                .await
                .unwrap();
            store
                .list_append(&keys::series(serial, series::HUMIDITY), &hum.to_string())
                .await
                .unwrap();
            store
                .list_append(&keys::series(serial, series::CO2), &co2.to_string())
                .await
                .unwrap();
            store
                .list_append(&keys::series(serial, series::TIMESTAMP), ts)
                .await
                .unwrap();
        }
        store
            .hash_set(
                &keys::sensor(serial),
                &[("serialNum".to_owned(), serial.to_owned())],
            )
            .await
            .unwrap();
    }

    async fn column(store: &MemoryStore, serial: &str, name: &str) -> Vec<String> {
        store
            .list_range(&keys::series(serial, name), 0, -1)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn prunes_expired_rows_from_all_four_series() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        seed_series(
            &store,
            "SN-1",
            &[
                (1.0, 10.0, 401.0, (now - ChronoDuration::days(40)).to_rfc3339()),
                (2.0, 20.0, 402.0, (now - ChronoDuration::days(35)).to_rfc3339()),
                (3.0, 30.0, 403.0, (now - ChronoDuration::days(2)).to_rfc3339()),
            ],
        )
        .await;

        let sweeper = RetentionSweeper::new(store.clone(), 30, 3600);
        let stats = sweeper.sweep_once(now).await.unwrap();

        assert_eq!(stats, SweepStats { sensors_pruned: 1, entries_removed: 2 });
        assert_eq!(column(&store, "SN-1", series::TEMPERATURE).await, ["3"]);
        assert_eq!(column(&store, "SN-1", series::HUMIDITY).await, ["30"]);
        assert_eq!(column(&store, "SN-1", series::CO2).await, ["403"]);
        assert_eq!(column(&store, "SN-1", series::TIMESTAMP).await.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_values_prune_by_position_not_value() {
        // Two rows share identical readings; only the expired one goes.
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        seed_series(
            &store,
            "SN-1",
            &[
                (21.0, 40.0, 500.0, (now - ChronoDuration::days(40)).to_rfc3339()),
                (21.0, 40.0, 500.0, (now - ChronoDuration::hours(1)).to_rfc3339()),
            ],
        )
        .await;

        let sweeper = RetentionSweeper::new(store.clone(), 30, 3600);
        let stats = sweeper.sweep_once(now).await.unwrap();

        assert_eq!(stats.entries_removed, 1);
        assert_eq!(column(&store, "SN-1", series::TEMPERATURE).await, ["21"]);
        let timestamps = column(&store, "SN-1", series::TIMESTAMP).await;
        assert_eq!(timestamps.len(), 1);
        assert_eq!(timestamps[0], (now - ChronoDuration::hours(1)).to_rfc3339());
    }

    #[tokio::test]
    async fn fresh_series_are_left_untouched() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        seed_series(
            &store,
            "SN-1",
            &[(1.0, 10.0, 401.0, (now - ChronoDuration::days(2)).to_rfc3339())],
        )
        .await;

        let sweeper = RetentionSweeper::new(store.clone(), 30, 3600);
        let stats = sweeper.sweep_once(now).await.unwrap();

        assert_eq!(stats, SweepStats::default());
        assert_eq!(column(&store, "SN-1", series::TEMPERATURE).await, ["1"]);
    }

    #[tokio::test]
    async fn unparseable_timestamps_are_retained() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        seed_series(
            &store,
            "SN-1",
            &[
                (1.0, 10.0, 401.0, "garbage".to_owned()),
                (2.0, 20.0, 402.0, (now - ChronoDuration::days(40)).to_rfc3339()),
            ],
        )
        .await;

        let sweeper = RetentionSweeper::new(store.clone(), 30, 3600);
        let stats = sweeper.sweep_once(now).await.unwrap();

        assert_eq!(stats.entries_removed, 1);
        assert_eq!(column(&store, "SN-1", series::TEMPERATURE).await, ["1"]);
        assert_eq!(column(&store, "SN-1", series::TIMESTAMP).await, ["garbage"]);
    }

    #[tokio::test]
    async fn store_failure_aborts_the_run() {
        let store = Arc::new(MemoryStore::new());
        store.fail_all(true);
        let sweeper = RetentionSweeper::new(store.clone(), 30, 3600);
        assert!(sweeper.sweep_once(Utc::now()).await.is_err());
    }

    #[tokio::test]
    async fn sweep_on_empty_store_is_a_noop() {
        let store = Arc::new(MemoryStore::new());
        let sweeper = RetentionSweeper::new(store, 30, 3600);
        let stats = sweeper.sweep_once(Utc::now()).await.unwrap();
        assert_eq!(stats, SweepStats::default());
    }
}
