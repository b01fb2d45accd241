//! Auth guards as extractors. Handlers take `AuthUser`/`AuthAdmin` as an
//! argument and the session lifecycle decides: pass, silent-retry signal,
//! or hard failure.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use axum_extra::extract::cookie::CookieJar;

use crate::{error::AppError, models::UserSnapshot};

use super::AppState;

/// Name of the http-only refresh token cookie.
pub const REFRESH_COOKIE: &str = "refreshToken";

pub fn auth_header(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok())
}

pub fn refresh_cookie(headers: &HeaderMap) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_owned())
}

pub struct AuthUser(pub UserSnapshot);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let refresh = refresh_cookie(&parts.headers);
        state
            .sessions
            .authorize_user(auth_header(&parts.headers), refresh.as_deref())
            .await
            .map(AuthUser)
    }
}

pub struct AuthAdmin(pub UserSnapshot);

impl FromRequestParts<AppState> for AuthAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let refresh = refresh_cookie(&parts.headers);
        state
            .sessions
            .authorize_admin(auth_header(&parts.headers), refresh.as_deref())
            .await
            .map(AuthAdmin)
    }
}
