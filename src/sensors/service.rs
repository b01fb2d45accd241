//! Sensor registry and append-only time-series store.

use std::collections::HashSet;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{fields, Reading, Sensor},
    notify::Notifier,
    sensors::series::{self, Window},
    store::{keys, SharedStore},
};

/// Alerts fire strictly above this CO2 level (ppm).
pub const CO2_ALERT_THRESHOLD: f64 = 1000.0;

/// Seed value written into each series at creation so they are never empty.
const SEED_VALUE: &str = "0";

#[derive(Debug)]
pub struct NewSensor {
    pub serial_num: String,
    pub institution_name: String,
    pub room_name: String,
}

/// A sensor record annotated with its (possibly window-filtered) readings.
#[derive(Debug)]
pub struct SensorReadings {
    pub sensor: Sensor,
    pub readings: Vec<Reading>,
}

pub struct SensorService {
    store: SharedStore,
    alerts: Notifier,
}

impl SensorService {
    pub fn new(store: SharedStore, alerts: Notifier) -> Self {
        Self { store, alerts }
    }

    async fn sensor_exists(&self, serial_num: &str) -> Result<bool, AppError> {
        Ok(self
            .store
            .hash_exists(&keys::sensor(serial_num), fields::SERIAL_NUM)
            .await?)
    }

    /// Registers a sensor and seeds all four series with one placeholder
    /// entry stamped with the creation time.
    pub async fn create_sensor(&self, req: NewSensor) -> Result<Sensor, AppError> {
        if self.sensor_exists(&req.serial_num).await? {
            return Err(AppError::Conflict("sensor"));
        }
        let institution_registered = self
            .store
            .hash_exists(&keys::institution(&req.institution_name), fields::NAME)
            .await?;
        if !institution_registered {
            return Err(AppError::NotFound("institution"));
        }

        let sensor = Sensor {
            id: Uuid::new_v4().to_string(),
            serial_num: req.serial_num,
            institution_name: req.institution_name,
            room_name: req.room_name,
            created_at: Utc::now(),
        };
        self.store
            .hash_set(&keys::sensor(&sensor.serial_num), &sensor.to_fields())
            .await?;

        for column in [series::TEMPERATURE, series::HUMIDITY, series::CO2] {
            self.store
                .list_append(&keys::series(&sensor.serial_num, column), SEED_VALUE)
                .await?;
        }
        self.store
            .list_append(
                &keys::series(&sensor.serial_num, series::TIMESTAMP),
                &sensor.created_at.to_rfc3339(),
            )
            .await?;

        info!(serial_num = %sensor.serial_num, institution = %sensor.institution_name, "sensor registered");
        Ok(sensor)
    }

    /// Removes the sensor record and all four series keys.
    pub async fn delete_sensor(&self, serial_num: &str) -> Result<(), AppError> {
        if !self.sensor_exists(serial_num).await? {
            return Err(AppError::NotFound("sensor"));
        }

        self.store.delete(&keys::sensor(serial_num)).await?;
        for column in series::COLUMNS {
            self.store.delete(&keys::series(serial_num, column)).await?;
        }

        info!(serial_num = %serial_num, "sensor deleted");
        Ok(())
    }

    /// Appends one reading to the tail of each series. The four appends are
    /// one logical write; a failure aborts the remaining appends and any
    /// resulting length divergence is reconciled on the next read.
    pub async fn append_reading(
        &self,
        serial_num: &str,
        temperature: f64,
        humidity: f64,
        co2: f64,
        timestamp: Option<String>,
    ) -> Result<(), AppError> {
        if !self.sensor_exists(serial_num).await? {
            return Err(AppError::NotFound("sensor"));
        }

        let timestamp = timestamp.unwrap_or_else(|| Utc::now().to_rfc3339());
        for (column, value) in [
            (series::TEMPERATURE, temperature.to_string()),
            (series::HUMIDITY, humidity.to_string()),
            (series::CO2, co2.to_string()),
            (series::TIMESTAMP, timestamp),
        ] {
            self.store
                .list_append(&keys::series(serial_num, column), &value)
                .await?;
        }

        if co2 > CO2_ALERT_THRESHOLD {
            self.dispatch_co2_alert(serial_num, co2).await;
        }
        Ok(())
    }

    /// Best-effort hand-off to the alert queue; never fails the write path.
    async fn dispatch_co2_alert(&self, serial_num: &str, co2: f64) {
        let fields = match self.store.hash_get_all(&keys::sensor(serial_num)).await {
            Ok(fields) => fields,
            Err(e) => {
                warn!(serial_num = %serial_num, error = %e, "could not load sensor for CO2 alert");
                return;
            }
        };
        match Sensor::from_fields(&fields) {
            Some(sensor) => self
                .alerts
                .co2_alert(sensor.institution_name, sensor.serial_num, co2),
            None => {
                warn!(serial_num = %serial_num, "unreadable sensor record, dropping CO2 alert")
            }
        }
    }

    /// Enumerates registered sensors, filters by institution and optional
    /// exact room, and returns each with its window-filtered readings.
    pub async fn query_readings(
        &self,
        institution_name: &str,
        room_name: Option<&str>,
        window: Option<Window>,
    ) -> Result<Vec<SensorReadings>, AppError> {
        let sensor_keys = self.store.keys_by_prefix(keys::SENSOR_PREFIX).await?;
        let now = Utc::now();

        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for key in sensor_keys {
            let fields = self.store.hash_get_all(&key).await?;
            let Some(sensor) = Sensor::from_fields(&fields) else {
                warn!(key = %key, "skipping unreadable sensor record");
                continue;
            };
            if !seen.insert(sensor.serial_num.clone()) {
                continue;
            }
            if sensor.institution_name != institution_name {
                continue;
            }
            if let Some(room) = room_name {
                if sensor.room_name != room {
                    continue;
                }
            }

            let rows = self.load_rows(&sensor.serial_num).await?;
            let readings = series::filter_window(rows, window, now);
            out.push(SensorReadings { sensor, readings });
        }
        Ok(out)
    }

    async fn load_rows(&self, serial_num: &str) -> Result<Vec<Reading>, AppError> {
        let temperature = self
            .store
            .list_range(&keys::series(serial_num, series::TEMPERATURE), 0, -1)
            .await?;
        let humidity = self
            .store
            .list_range(&keys::series(serial_num, series::HUMIDITY), 0, -1)
            .await?;
        let co2 = self
            .store
            .list_range(&keys::series(serial_num, series::CO2), 0, -1)
            .await?;
        let timestamp = self
            .store
            .list_range(&keys::series(serial_num, series::TIMESTAMP), 0, -1)
            .await?;

        Ok(series::zip_rows(serial_num, temperature, humidity, co2, timestamp))
    }
}
