//! HMAC proof-of-possession for ingestion devices.
//!
//! Devices lack user credentials; they sign `serialNum + timestamp` with a
//! shared secret and send `Authorization: Bearer <unixSeconds>:<hexSig>`.
//! A bounded timestamp window stands in for per-request nonces.

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::{
    auth::bearer_token,
    error::AppError,
    models::fields,
    store::{keys, SharedStore},
};

type HmacSha256 = Hmac<Sha256>;

pub struct DeviceAuthenticator {
    secret: String,
    max_age_secs: i64,
    store: SharedStore,
}

impl DeviceAuthenticator {
    pub fn new(secret: String, max_age_secs: i64, store: SharedStore) -> Self {
        Self { secret, max_age_secs, store }
    }

    pub async fn authenticate(
        &self,
        auth_header: Option<&str>,
        serial_num: &str,
    ) -> Result<(), AppError> {
        let header = auth_header.ok_or(AppError::MissingToken)?;
        let token = bearer_token(header).ok_or(AppError::InvalidToken)?;
        let (timestamp, signature) = token.split_once(':').ok_or(AppError::InvalidToken)?;

        self.check(timestamp, signature, serial_num, Utc::now().timestamp())
            .await
    }

    /// Verification core with an injected clock so the window boundary is
    /// testable. Check order: window, sensor registration, signature.
    async fn check(
        &self,
        timestamp: &str,
        signature: &str,
        serial_num: &str,
        now: i64,
    ) -> Result<(), AppError> {
        let issued: i64 = timestamp.parse().map_err(|_| AppError::InvalidToken)?;
        if now - issued > self.max_age_secs {
            return Err(AppError::Expired);
        }

        let registered = self
            .store
            .hash_exists(&keys::sensor(serial_num), fields::SERIAL_NUM)
            .await?;
        if !registered {
            return Err(AppError::NotFound("sensor"));
        }

        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(serial_num.as_bytes());
        mac.update(timestamp.as_bytes());

        let provided = hex::decode(signature).map_err(|_| AppError::InvalidSignature)?;
        mac.verify_slice(&provided)
            .map_err(|_| AppError::InvalidSignature)
    }
}

/// Computes the hex signature a device would send. Test-side counterpart of
/// the verification above.
#[cfg(test)]
pub fn signature_for(secret: &str, serial_num: &str, timestamp: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(serial_num.as_bytes());
    mac.update(timestamp.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}
