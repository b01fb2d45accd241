use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Institution, Sensor, UserSnapshot};
use crate::sensors::service::SensorReadings;

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub institution_name: String,
    #[serde(default)]
    pub is_admin: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterInstitutionRequest {
    pub name: String,
    pub street: String,
    pub city: String,
    pub zip: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSensorRequest {
    pub serial_num: String,
    pub institution_name: String,
    pub room_name: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppendReadingRequest {
    pub serial_num: String,
    pub temperature: f64,
    pub humidity: f64,
    pub co2: f64,
    /// RFC 3339; defaults to the server clock when omitted.
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FcmTokenRequest {
    pub fcm_token: String,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Issued on login and refresh; the refresh token itself travels only in
/// the http-only cookie.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub user: UserSnapshot,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InstitutionDto {
    pub id: String,
    pub name: String,
    pub street: String,
    pub city: String,
    pub zip: String,
}

impl From<Institution> for InstitutionDto {
    fn from(i: Institution) -> Self {
        Self {
            id: i.id,
            name: i.name,
            street: i.street,
            city: i.city,
            zip: i.zip,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SensorDto {
    pub id: String,
    pub serial_num: String,
    pub institution_name: String,
    pub room_name: String,
    pub created_at: DateTime<Utc>,
}

impl From<Sensor> for SensorDto {
    fn from(s: Sensor) -> Self {
        Self {
            id: s.id,
            serial_num: s.serial_num,
            institution_name: s.institution_name,
            room_name: s.room_name,
            created_at: s.created_at,
        }
    }
}

/// Sensor record with its series unzipped back into the four parallel
/// arrays of the original wire format. Index `i` across the arrays is one
/// reading.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SensorReadingsDto {
    pub id: String,
    pub serial_num: String,
    pub institution_name: String,
    pub room_name: String,
    pub created_at: DateTime<Utc>,
    pub temperature: Vec<f64>,
    pub humidity: Vec<f64>,
    pub co2: Vec<f64>,
    pub timestamp: Vec<String>,
}

impl From<SensorReadings> for SensorReadingsDto {
    fn from(sr: SensorReadings) -> Self {
        let mut temperature = Vec::with_capacity(sr.readings.len());
        let mut humidity = Vec::with_capacity(sr.readings.len());
        let mut co2 = Vec::with_capacity(sr.readings.len());
        let mut timestamp = Vec::with_capacity(sr.readings.len());
        for reading in sr.readings {
            temperature.push(reading.temperature);
            humidity.push(reading.humidity);
            co2.push(reading.co2);
            timestamp.push(reading.timestamp);
        }

        Self {
            id: sr.sensor.id,
            serial_num: sr.sensor.serial_num,
            institution_name: sr.sensor.institution_name,
            room_name: sr.sensor.room_name,
            created_at: sr.sensor.created_at,
            temperature,
            humidity,
            co2,
            timestamp,
        }
    }
}
