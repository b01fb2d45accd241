use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use utoipa::OpenApi;

use crate::{
    accounts::service::{NewInstitution, NewUser},
    error::AppError,
    models::UserSnapshot,
    sensors::series::Window,
    sensors::service::NewSensor,
};

use super::{
    dto::{
        AppendReadingRequest, CreateSensorRequest, FcmTokenRequest, InstitutionDto, LoginRequest,
        MessageResponse, RegisterInstitutionRequest, RegisterUserRequest, SensorDto,
        SensorReadingsDto, TokenResponse,
    },
    extract::{auth_header, AuthAdmin, AuthUser, REFRESH_COOKIE},
    AppState,
};

fn refresh_token_cookie(value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE, value))
        .http_only(true)
        .secure(secure)
        .path("/")
        .build()
}

// ---------------------------------------------------------------------------
// Session endpoints
// ---------------------------------------------------------------------------

/// Issues an access/refresh token pair. The refresh token is delivered as
/// an http-only cookie; the access token in the body and the
/// `Authorization` response header.
#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Tokens issued", body = TokenResponse),
        (status = 401, description = "Invalid credentials"),
    ),
    tag = "session"
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, [(header::HeaderName, String); 1], Json<TokenResponse>), AppError> {
    let outcome = state.sessions.login(&req.email, &req.password).await?;

    let jar = jar.add(refresh_token_cookie(
        outcome.refresh_token,
        state.config.cookie_secure,
    ));
    let bearer = format!("Bearer {}", outcome.access_token);

    Ok((
        jar,
        [(header::AUTHORIZATION, bearer)],
        Json(TokenResponse {
            access_token: outcome.access_token,
            user: outcome.user,
        }),
    ))
}

/// Silently mints a new access token from the refresh cookie.
#[utoipa::path(
    post,
    path = "/api/refresh",
    responses(
        (status = 200, description = "New access token", body = TokenResponse),
        (status = 400, description = "Invalid refresh token"),
        (status = 401, description = "Refresh cookie missing"),
        (status = 403, description = "Refresh token revoked"),
    ),
    tag = "session"
)]
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<TokenResponse>, AppError> {
    let refresh = jar.get(REFRESH_COOKIE).map(|c| c.value().to_owned());
    let outcome = state.sessions.refresh(refresh.as_deref()).await?;

    Ok(Json(TokenResponse {
        access_token: outcome.access_token,
        user: outcome.user,
    }))
}

/// Revokes the refresh token and clears the cookie. Always succeeds.
#[utoipa::path(
    post,
    path = "/api/logout",
    responses((status = 200, description = "Logged out", body = MessageResponse)),
    tag = "session"
)]
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<MessageResponse>) {
    let refresh = jar.get(REFRESH_COOKIE).map(|c| c.value().to_owned());
    state.sessions.logout(refresh.as_deref()).await;

    let jar = jar.remove(Cookie::build(REFRESH_COOKIE).path("/").build());
    (jar, Json(MessageResponse::new("logged out")))
}

// ---------------------------------------------------------------------------
// Registration endpoints (admin)
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/api/register",
    request_body = RegisterUserRequest,
    responses(
        (status = 201, description = "User registered", body = UserSnapshot),
        (status = 403, description = "Caller is not an admin"),
        (status = 409, description = "Email already registered"),
    ),
    tag = "registry"
)]
pub async fn register(
    State(state): State<AppState>,
    AuthAdmin(_admin): AuthAdmin,
    Json(req): Json<RegisterUserRequest>,
) -> Result<(StatusCode, Json<UserSnapshot>), AppError> {
    let snapshot = state
        .accounts
        .register_user(NewUser {
            name: req.name,
            email: req.email,
            password: req.password,
            institution_name: req.institution_name,
            is_admin: req.is_admin,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

#[utoipa::path(
    post,
    path = "/api/institution",
    request_body = RegisterInstitutionRequest,
    responses(
        (status = 201, description = "Institution registered", body = InstitutionDto),
        (status = 403, description = "Caller is not an admin"),
        (status = 409, description = "Name already registered"),
    ),
    tag = "registry"
)]
pub async fn create_institution(
    State(state): State<AppState>,
    AuthAdmin(_admin): AuthAdmin,
    Json(req): Json<RegisterInstitutionRequest>,
) -> Result<(StatusCode, Json<InstitutionDto>), AppError> {
    let institution = state
        .accounts
        .register_institution(NewInstitution {
            name: req.name,
            street: req.street,
            city: req.city,
            zip: req.zip,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(institution.into())))
}

#[utoipa::path(
    post,
    path = "/api/sensor",
    request_body = CreateSensorRequest,
    responses(
        (status = 201, description = "Sensor registered", body = SensorDto),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Institution not registered"),
        (status = 409, description = "Serial number already registered"),
    ),
    tag = "registry"
)]
pub async fn create_sensor(
    State(state): State<AppState>,
    AuthAdmin(_admin): AuthAdmin,
    Json(req): Json<CreateSensorRequest>,
) -> Result<(StatusCode, Json<SensorDto>), AppError> {
    let sensor = state
        .sensors
        .create_sensor(NewSensor {
            serial_num: req.serial_num,
            institution_name: req.institution_name,
            room_name: req.room_name,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(sensor.into())))
}

#[utoipa::path(
    delete,
    path = "/api/sensor/{serial_num}",
    params(("serial_num" = String, Path, description = "Sensor serial number")),
    responses(
        (status = 200, description = "Sensor and series removed", body = MessageResponse),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Sensor not registered"),
    ),
    tag = "registry"
)]
pub async fn delete_sensor(
    State(state): State<AppState>,
    AuthAdmin(_admin): AuthAdmin,
    Path(serial_num): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    state.sensors.delete_sensor(&serial_num).await?;
    Ok(Json(MessageResponse::new("sensor deleted")))
}

// ---------------------------------------------------------------------------
// Ingestion (device auth)
// ---------------------------------------------------------------------------

/// Appends one reading. Devices authenticate with
/// `Authorization: Bearer <unixSeconds>:<hexHmacSignature>`.
#[utoipa::path(
    post,
    path = "/api/sensor/data",
    request_body = AppendReadingRequest,
    responses(
        (status = 200, description = "Reading stored", body = MessageResponse),
        (status = 401, description = "Signature missing or outside the replay window"),
        (status = 403, description = "Signature mismatch"),
        (status = 404, description = "Sensor not registered"),
    ),
    tag = "readings"
)]
pub async fn append_reading(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AppendReadingRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    state
        .devices
        .authenticate(auth_header(&headers), &req.serial_num)
        .await?;

    state
        .sensors
        .append_reading(
            &req.serial_num,
            req.temperature,
            req.humidity,
            req.co2,
            req.timestamp,
        )
        .await?;
    Ok(Json(MessageResponse::new("reading stored")))
}

// ---------------------------------------------------------------------------
// Queries (user auth, scoped to the caller's institution)
// ---------------------------------------------------------------------------

async fn query(
    state: AppState,
    user: UserSnapshot,
    room_name: Option<String>,
    window: Option<Window>,
) -> Result<Json<Vec<SensorReadingsDto>>, AppError> {
    let results = state
        .sensors
        .query_readings(&user.institution_name, room_name.as_deref(), window)
        .await?;
    Ok(Json(results.into_iter().map(Into::into).collect()))
}

/// Full reading history of every sensor in the caller's institution.
#[utoipa::path(
    get,
    path = "/api/sensor/data",
    responses(
        (status = 200, description = "Sensors with full series", body = Vec<SensorReadingsDto>),
        (status = 401, description = "Not authenticated"),
    ),
    tag = "readings"
)]
pub async fn query_readings(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<SensorReadingsDto>>, AppError> {
    query(state, user, None, None).await
}

/// Readings of a single room, full history.
#[utoipa::path(
    get,
    path = "/api/sensor/data/{room_name}",
    params(("room_name" = String, Path, description = "Exact room name")),
    responses(
        (status = 200, description = "Sensors in the room", body = Vec<SensorReadingsDto>),
        (status = 401, description = "Not authenticated"),
    ),
    tag = "readings"
)]
pub async fn query_readings_room(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(room_name): Path<String>,
) -> Result<Json<Vec<SensorReadingsDto>>, AppError> {
    query(state, user, Some(room_name), None).await
}

/// Readings not older than the given number of hours (boundary inclusive).
#[utoipa::path(
    get,
    path = "/api/sensor/data/hours/{hours}",
    params(("hours" = i64, Path, description = "Window size in hours")),
    responses(
        (status = 200, description = "Windowed readings", body = Vec<SensorReadingsDto>),
        (status = 401, description = "Not authenticated"),
    ),
    tag = "readings"
)]
pub async fn query_readings_hours(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(hours): Path<i64>,
) -> Result<Json<Vec<SensorReadingsDto>>, AppError> {
    query(state, user, None, Window::from_params(Some(hours), None)).await
}

/// Readings not older than the given number of days (boundary inclusive).
#[utoipa::path(
    get,
    path = "/api/sensor/data/days/{days}",
    params(("days" = i64, Path, description = "Window size in days")),
    responses(
        (status = 200, description = "Windowed readings", body = Vec<SensorReadingsDto>),
        (status = 401, description = "Not authenticated"),
    ),
    tag = "readings"
)]
pub async fn query_readings_days(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(days): Path<i64>,
) -> Result<Json<Vec<SensorReadingsDto>>, AppError> {
    query(state, user, None, Window::from_params(None, Some(days))).await
}

// ---------------------------------------------------------------------------
// Notification target
// ---------------------------------------------------------------------------

#[utoipa::path(
    put,
    path = "/api/user/fcmtoken",
    request_body = FcmTokenRequest,
    responses(
        (status = 200, description = "Notification target attached", body = MessageResponse),
        (status = 401, description = "Not authenticated"),
    ),
    tag = "registry"
)]
pub async fn attach_fcm_token(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<FcmTokenRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    state
        .accounts
        .attach_notification_target(&user.email, req.fcm_token)
        .await?;
    Ok(Json(MessageResponse::new("notification target attached")))
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Returns `200 OK` with `{"status":"ok"}` when the server is running.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is healthy")),
    tag = "system"
)]
pub async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// OpenAPI spec
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    paths(
        login, refresh, logout, register, create_institution, create_sensor,
        delete_sensor, append_reading, query_readings, query_readings_room,
        query_readings_hours, query_readings_days, attach_fcm_token, health,
    ),
    components(schemas(
        LoginRequest, RegisterUserRequest, RegisterInstitutionRequest,
        CreateSensorRequest, AppendReadingRequest, FcmTokenRequest,
        TokenResponse, MessageResponse, InstitutionDto, SensorDto,
        SensorReadingsDto, UserSnapshot,
    )),
    tags(
        (name = "session", description = "Login, refresh and logout"),
        (name = "registry", description = "Admin registration endpoints"),
        (name = "readings", description = "Sensor ingestion and queries"),
        (name = "system", description = "System endpoints"),
    ),
    info(
        title = "Institutional Environmental Monitoring API",
        version = "0.1.0",
        description = "REST API for institutional environmental-sensor monitoring"
    )
)]
pub struct ApiDoc;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
