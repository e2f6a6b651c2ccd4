//! Local HTTP control surface over the characteristic gateway.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use heater_cooler_common::{
    AccessoryError, AccessoryInfo, AccessorySnapshot, FieldId, FieldValue, ServerState,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    app::AppStatus,
    gateway::{Gateway, WriteResponse},
};

#[derive(Clone)]
pub struct HttpState {
    pub gateway: Gateway,
    pub status: AppStatus,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Deserialize)]
struct ValueUpdate {
    value: serde_json::Number,
}

#[derive(Debug, Serialize)]
struct CharacteristicView {
    field: FieldId,
    value: FieldValue,
}

#[derive(Debug, Serialize)]
struct WriteView {
    field: FieldId,
    value: FieldValue,
    result: WriteResponse,
}

#[derive(Debug, Serialize)]
struct StatusView {
    info: AccessoryInfo,
    state: AccessorySnapshot,
    #[serde(rename = "serverState")]
    server_state: ServerState,
    #[serde(rename = "monitorRunning")]
    monitor_running: bool,
}

pub fn router(state: HttpState) -> Router {
    Router::new()
        .route("/api/status", get(handle_get_status))
        .route("/api/characteristics", get(handle_get_characteristics))
        .route(
            "/api/characteristics/{field}",
            get(handle_get_characteristic).put(handle_put_characteristic),
        )
        .route("/api/identify", post(handle_identify))
        .route("/api/factory-reset", post(handle_factory_reset))
        .route(
            "/api/simulation/temperature",
            put(handle_put_simulated_temperature),
        )
        .with_state(state)
}

async fn handle_get_status(State(state): State<HttpState>) -> impl IntoResponse {
    Json(StatusView {
        info: state.gateway.info().clone(),
        state: state.gateway.snapshot().await,
        server_state: state.status.server_state(),
        monitor_running: state.status.monitor_running(),
    })
}

async fn handle_get_characteristics(State(state): State<HttpState>) -> impl IntoResponse {
    let values: Vec<CharacteristicView> = state
        .gateway
        .read_all()
        .await
        .into_iter()
        .map(|(field, value)| CharacteristicView { field, value })
        .collect();
    Json(values)
}

async fn handle_get_characteristic(
    State(state): State<HttpState>,
    Path(field): Path<String>,
) -> axum::response::Response {
    let field = match field.parse::<FieldId>() {
        Ok(field) => field,
        Err(err) => return accessory_error_response(&err),
    };

    match state.gateway.read_field(field).await {
        Ok(value) => Json(CharacteristicView { field, value }).into_response(),
        Err(err) => accessory_error_response(&err),
    }
}

async fn handle_put_characteristic(
    State(state): State<HttpState>,
    Path(field): Path<String>,
    Json(update): Json<ValueUpdate>,
) -> axum::response::Response {
    let field = match field.parse::<FieldId>() {
        Ok(field) => field,
        Err(err) => return accessory_error_response(&err),
    };
    let value = match FieldValue::from_json_number(field, &update.value) {
        Ok(value) => value,
        Err(err) => return accessory_error_response(&err),
    };

    match state.gateway.write_field(field, value).await {
        Ok(result) => {
            let value = state.gateway.snapshot().await.value(field);
            Json(WriteView {
                field,
                value,
                result,
            })
            .into_response()
        }
        Err(err) => accessory_error_response(&err),
    }
}

async fn handle_identify(State(state): State<HttpState>) -> axum::response::Response {
    match state.gateway.identify() {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => accessory_error_response(&err),
    }
}

async fn handle_factory_reset(State(state): State<HttpState>) -> axum::response::Response {
    if let Err(err) = state.gateway.restore_factory_settings().await {
        warn!("factory reset incomplete: {err}");
        return accessory_error_response(&err);
    }
    handle_get_status(State(state)).await.into_response()
}

async fn handle_put_simulated_temperature(
    State(state): State<HttpState>,
    Json(update): Json<ValueUpdate>,
) -> axum::response::Response {
    let Some(value) = update.value.as_f64() else {
        return error_response(StatusCode::BAD_REQUEST, "Invalid temperature value");
    };

    match state.gateway.set_current_temperature(value as f32).await {
        Ok(_) => handle_get_status(State(state)).await.into_response(),
        Err(err) => accessory_error_response(&err),
    }
}

fn status_for(err: &AccessoryError) -> StatusCode {
    match err {
        AccessoryError::Validation { .. } => StatusCode::BAD_REQUEST,
        AccessoryError::InvalidField(_) => StatusCode::NOT_FOUND,
        AccessoryError::ReadOnly(_) => StatusCode::METHOD_NOT_ALLOWED,
        AccessoryError::Persistence(_) | AccessoryError::InvariantViolation(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn accessory_error_response(err: &AccessoryError) -> axum::response::Response {
    error_response(status_for(err), &err.to_string())
}

fn error_response(status: StatusCode, message: &str) -> axum::response::Response {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
}
