pub mod dto;
pub mod extract;
pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    accounts::AccountService,
    auth::{DeviceAuthenticator, SessionService},
    config::Config,
    sensors::SensorService,
};

use handlers::ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: Arc<SessionService>,
    pub devices: Arc<DeviceAuthenticator>,
    pub sensors: Arc<SensorService>,
    pub accounts: Arc<AccountService>,
}

pub fn router(state: AppState) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .route("/api/register", post(handlers::register))
        .route("/api/login", post(handlers::login))
        .route("/api/refresh", post(handlers::refresh))
        .route("/api/logout", post(handlers::logout))
        .route("/api/institution", post(handlers::create_institution))
        .route("/api/sensor", post(handlers::create_sensor))
        .route("/api/sensor/{serial_num}", delete(handlers::delete_sensor))
        .route(
            "/api/sensor/data",
            get(handlers::query_readings)
                .post(handlers::append_reading)
                .put(handlers::append_reading),
        )
        .route(
            "/api/sensor/data/hours/{hours}",
            get(handlers::query_readings_hours),
        )
        .route(
            "/api/sensor/data/days/{days}",
            get(handlers::query_readings_days),
        )
        .route(
            "/api/sensor/data/{room_name}",
            get(handlers::query_readings_room),
        )
        .route("/api/user/fcmtoken", put(handlers::attach_fcm_token))
        .with_state(state)
        .split_for_parts();

    router
        .route("/health", get(handlers::health))
        .route(
            "/api-docs/openapi.json",
            get(move || async move { axum::Json(api) }),
        )
}
