//! Session lifecycle: login, silent refresh, logout and the authorization
//! guards the API layer builds its extractors on.

use tracing::warn;

use crate::{
    auth::{bearer_token, password, TokenService},
    error::AppError,
    models::{User, UserSnapshot},
    store::{keys, SharedStore},
};

#[derive(Debug)]
pub struct LoginOutcome {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserSnapshot,
}

#[derive(Debug)]
pub struct RefreshOutcome {
    pub access_token: String,
    pub user: UserSnapshot,
}

pub struct SessionService {
    tokens: TokenService,
    store: SharedStore,
}

impl SessionService {
    pub fn new(tokens: TokenService, store: SharedStore) -> Self {
        Self { tokens, store }
    }

    /// Unknown email and wrong password take the same rejection path; the
    /// response carries no user-enumeration signal.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, AppError> {
        let fields = self.store.hash_get_all(&keys::user(email)).await?;
        let user = User::from_fields(&fields).ok_or(AppError::InvalidCredential)?;

        if !password::verify_password(password, &user.password).unwrap_or(false) {
            return Err(AppError::InvalidCredential);
        }

        let snapshot = user.snapshot();
        Ok(LoginOutcome {
            access_token: self.tokens.issue_access(&snapshot)?,
            refresh_token: self.tokens.issue_refresh(&snapshot)?,
            user: snapshot,
        })
    }

    /// Mints a new access token from the snapshot embedded in the refresh
    /// token. The refresh token itself is not rotated; it stays valid until
    /// its own expiry or an explicit logout.
    pub async fn refresh(&self, refresh_token: Option<&str>) -> Result<RefreshOutcome, AppError> {
        let token = refresh_token.ok_or(AppError::MissingToken)?;

        if self.tokens.is_revoked(token).await? {
            return Err(AppError::Revoked);
        }
        let claims = self.tokens.verify(token)?;

        Ok(RefreshOutcome {
            access_token: self.tokens.issue_access(&claims.user)?,
            user: claims.user,
        })
    }

    /// Best-effort revocation: always reports success. A store failure here
    /// is logged and swallowed so logout never fails visibly.
    pub async fn logout(&self, refresh_token: Option<&str>) {
        if let Some(token) = refresh_token {
            if let Err(e) = self.tokens.revoke(token).await {
                warn!(error = %e, "failed to persist token revocation during logout");
            }
        }
    }

    /// Guard for user-level endpoints.
    ///
    /// A failed access-token verification falls back to the refresh cookie:
    /// if that is valid and not revoked, the caller gets `AccessExpired`
    /// carrying a fresh access token (a silent-retry signal, not a hard
    /// failure). Without a usable refresh token the request fails hard.
    pub async fn authorize_user(
        &self,
        auth_header: Option<&str>,
        refresh_cookie: Option<&str>,
    ) -> Result<UserSnapshot, AppError> {
        let header = auth_header.ok_or(AppError::MissingToken)?;

        let verified = bearer_token(header).and_then(|t| self.tokens.verify(t).ok());
        match verified {
            Some(claims) => Ok(claims.user),
            None => Err(self.refresh_fallback(refresh_cookie).await),
        }
    }

    /// As [`SessionService::authorize_user`], plus the admin role check.
    pub async fn authorize_admin(
        &self,
        auth_header: Option<&str>,
        refresh_cookie: Option<&str>,
    ) -> Result<UserSnapshot, AppError> {
        let user = self.authorize_user(auth_header, refresh_cookie).await?;
        if !user.role.is_admin() {
            return Err(AppError::Forbidden);
        }
        Ok(user)
    }

    async fn refresh_fallback(&self, refresh_cookie: Option<&str>) -> AppError {
        let Some(refresh) = refresh_cookie else {
            return AppError::InvalidToken;
        };
        match self.tokens.is_revoked(refresh).await {
            Err(e) => return e,
            Ok(true) => return AppError::Revoked,
            Ok(false) => {}
        }
        let claims = match self.tokens.verify(refresh) {
            Ok(claims) => claims,
            Err(_) => return AppError::InvalidToken,
        };
        match self.tokens.issue_access(&claims.user) {
            Ok(access_token) => AppError::AccessExpired { access_token },
            Err(e) => e,
        }
    }
}
