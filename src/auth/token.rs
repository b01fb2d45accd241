//! Signed, expiring, self-contained tokens plus the revocation set.
//!
//! Verification is stateless; the `revoked_tokens` set — membership keyed
//! by the opaque token string — is the only persisted session state.

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppError,
    models::UserSnapshot,
    store::{keys, SharedStore},
};

/// Wire-level claims: the payload is the user snapshot taken at issuance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub user: UserSnapshot,
    pub iat: i64,
    pub exp: i64,
}

pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
    store: SharedStore,
}

impl TokenService {
    pub fn new(
        secret: &str,
        access_ttl_secs: i64,
        refresh_ttl_secs: i64,
        store: SharedStore,
    ) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl_secs,
            refresh_ttl_secs,
            store,
        }
    }

    pub fn issue_access(&self, user: &UserSnapshot) -> Result<String, AppError> {
        self.issue(user, self.access_ttl_secs)
    }

    pub fn issue_refresh(&self, user: &UserSnapshot) -> Result<String, AppError> {
        self.issue(user, self.refresh_ttl_secs)
    }

    fn issue(&self, user: &UserSnapshot, ttl_secs: i64) -> Result<String, AppError> {
        let now = Utc::now().timestamp();
        let claims = TokenClaims {
            user: user.clone(),
            iat: now,
            exp: now + ttl_secs,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))
    }

    /// Checks signature and expiry. Revocation is a separate, stateful
    /// check — see [`TokenService::is_revoked`].
    pub fn verify(&self, token: &str) -> Result<TokenClaims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|_| AppError::InvalidToken)
    }

    pub async fn is_revoked(&self, token: &str) -> Result<bool, AppError> {
        Ok(self
            .store
            .set_is_member(keys::REVOKED_TOKENS, token)
            .await?)
    }

    /// Idempotent: adding an already-revoked token is a no-op.
    pub async fn revoke(&self, token: &str) -> Result<(), AppError> {
        Ok(self.store.set_add(keys::REVOKED_TOKENS, token).await?)
    }
}
