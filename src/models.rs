use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Hash-field names shared by the store codecs below. These are the wire
/// names of the original JSON API and must not be renamed.
pub mod fields {
    pub const ID: &str = "id";
    pub const NAME: &str = "name";
    pub const EMAIL: &str = "email";
    pub const PASSWORD: &str = "password";
    pub const INSTITUTION_NAME: &str = "institutionName";
    pub const IS_ADMIN: &str = "isAdmin";
    pub const FCM_TOKEN: &str = "fcmToken";
    pub const SERIAL_NUM: &str = "serialNum";
    pub const ROOM_NAME: &str = "roomName";
    pub const CREATED_AT: &str = "createdAt";
    pub const STREET: &str = "street";
    pub const CITY: &str = "city";
    pub const ZIP: &str = "zip";
}

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// Closed role variant, decoded once when a user record or token is read.
/// Persisted and serialised as the boolean `isAdmin` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn from_flag(is_admin: bool) -> Self {
        if is_admin {
            Role::Admin
        } else {
            Role::User
        }
    }

    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// Serialises `Role` as the wire boolean `isAdmin`.
mod role_flag {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Role;

    pub fn serialize<S: Serializer>(role: &Role, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bool(role.is_admin())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Role, D::Error> {
        bool::deserialize(deserializer).map(Role::from_flag)
    }
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// Full user record as stored in the `user:<email>` hash. `password` holds
/// the bcrypt hash, never plaintext.
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub institution_name: String,
    pub role: Role,
    pub fcm_token: Option<String>,
}

impl User {
    pub fn to_fields(&self) -> Vec<(String, String)> {
        let mut out = vec![
            (fields::ID.to_owned(), self.id.clone()),
            (fields::NAME.to_owned(), self.name.clone()),
            (fields::EMAIL.to_owned(), self.email.clone()),
            (fields::PASSWORD.to_owned(), self.password.clone()),
            (
                fields::INSTITUTION_NAME.to_owned(),
                self.institution_name.clone(),
            ),
            (
                fields::IS_ADMIN.to_owned(),
                self.role.is_admin().to_string(),
            ),
        ];
        if let Some(token) = &self.fcm_token {
            out.push((fields::FCM_TOKEN.to_owned(), token.clone()));
        }
        out
    }

    /// `None` when a required field is missing (empty or corrupt record).
    pub fn from_fields(map: &HashMap<String, String>) -> Option<Self> {
        Some(Self {
            id: map.get(fields::ID)?.clone(),
            name: map.get(fields::NAME)?.clone(),
            email: map.get(fields::EMAIL)?.clone(),
            password: map.get(fields::PASSWORD)?.clone(),
            institution_name: map.get(fields::INSTITUTION_NAME)?.clone(),
            role: Role::from_flag(
                map.get(fields::IS_ADMIN).map(|v| v == "true").unwrap_or(false),
            ),
            fcm_token: map.get(fields::FCM_TOKEN).cloned(),
        })
    }

    pub fn snapshot(&self) -> UserSnapshot {
        UserSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            institution_name: self.institution_name.clone(),
            role: self.role,
            fcm_token: self.fcm_token.clone(),
        }
    }
}

/// The user as embedded in every issued token: the full record minus the
/// password hash.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserSnapshot {
    pub id: String,
    pub name: String,
    pub email: String,
    pub institution_name: String,
    #[serde(rename = "isAdmin", with = "role_flag")]
    #[schema(value_type = bool)]
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fcm_token: Option<String>,
}

// ---------------------------------------------------------------------------
// Institution
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Institution {
    pub id: String,
    pub name: String,
    pub street: String,
    pub city: String,
    pub zip: String,
}

impl Institution {
    pub fn to_fields(&self) -> Vec<(String, String)> {
        vec![
            (fields::ID.to_owned(), self.id.clone()),
            (fields::NAME.to_owned(), self.name.clone()),
            (fields::STREET.to_owned(), self.street.clone()),
            (fields::CITY.to_owned(), self.city.clone()),
            (fields::ZIP.to_owned(), self.zip.clone()),
        ]
    }
}

// ---------------------------------------------------------------------------
// Sensor
// ---------------------------------------------------------------------------

/// Sensor record as stored in the `sensor:<serialNum>` hash. The four
/// reading series live under separate `series:<serialNum>:*` list keys.
#[derive(Debug, Clone)]
pub struct Sensor {
    pub id: String,
    pub serial_num: String,
    pub institution_name: String,
    pub room_name: String,
    pub created_at: DateTime<Utc>,
}

impl Sensor {
    pub fn to_fields(&self) -> Vec<(String, String)> {
        vec![
            (fields::ID.to_owned(), self.id.clone()),
            (fields::SERIAL_NUM.to_owned(), self.serial_num.clone()),
            (
                fields::INSTITUTION_NAME.to_owned(),
                self.institution_name.clone(),
            ),
            (fields::ROOM_NAME.to_owned(), self.room_name.clone()),
            (fields::CREATED_AT.to_owned(), self.created_at.to_rfc3339()),
        ]
    }

    pub fn from_fields(map: &HashMap<String, String>) -> Option<Self> {
        Some(Self {
            id: map.get(fields::ID)?.clone(),
            serial_num: map.get(fields::SERIAL_NUM)?.clone(),
            institution_name: map.get(fields::INSTITUTION_NAME)?.clone(),
            room_name: map.get(fields::ROOM_NAME)?.clone(),
            created_at: DateTime::parse_from_rfc3339(map.get(fields::CREATED_AT)?)
                .ok()?
                .with_timezone(&Utc),
        })
    }
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// One aligned row across the four parallel series of a sensor. The series
/// are zipped into this shape at the store boundary so the alignment
/// invariant is enforced in one place.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub temperature: f64,
    pub humidity: f64,
    pub co2: f64,
    /// Raw stored timestamp (RFC 3339). Parsed only where a window filter
    /// or the retention sweep needs the age.
    pub timestamp: String,
}
