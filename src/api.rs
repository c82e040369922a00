// REST API with Axum
// Consumption routes are served at the root and under /api

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use rusqlite::Connection;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::db::NewConsumption;
use crate::error::{ConsumptionError, ValidationError};
use crate::store;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    db: Arc<Mutex<Connection>>,
}

impl AppState {
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
        }
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // Each store call is a single statement; a poisoned lock holds no partial write
        self.db.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Maps store errors onto HTTP status codes. Bodies are plain JSON strings.
pub struct ApiError(ConsumptionError);

impl From<ConsumptionError> for ApiError {
    fn from(err: ConsumptionError) -> Self {
        ApiError(err)
    }
}

/// Unreadable bodies (bad JSON, wrong field types, missing content type) are
/// invalid input like any other and answer 400.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(ValidationError::new("body", &rejection.body_text()).into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if !self.0.is_client_error() {
            error!(kind = self.0.kind(), "request failed: {}", self.0);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json("internal server error"),
            )
                .into_response();
        }

        let status = match &self.0 {
            ConsumptionError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_REQUEST,
        };

        (status, Json(self.0.to_string())).into_response()
    }
}

#[derive(Serialize)]
struct TotalResponse {
    #[serde(rename = "totalGeral")]
    total_geral: f64,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /health - Health check
async fn health_check() -> impl IntoResponse {
    Json("OK")
}

/// POST /consumo/cadastrar - Validate, bill and store a reading
async fn create_consumption(
    State(state): State<AppState>,
    body: Result<Json<NewConsumption>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(reading) = body?;
    let record = store::create(&state.conn(), &reading)?;
    let location = format!("/api/consumo/{}", record.id);

    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(record)).into_response())
}

/// GET /consumo/listar - All records
async fn list_consumptions(State(state): State<AppState>) -> Result<Response, ApiError> {
    let records = store::list(&state.conn())?;
    Ok(Json(records).into_response())
}

/// GET /consumo/buscar/:cpf/:mes/:ano - One record by key
async fn find_consumption(
    State(state): State<AppState>,
    Path((cpf, mes, ano)): Path<(String, i32, i32)>,
) -> Result<Response, ApiError> {
    let record = store::find_by_key(&state.conn(), &cpf, mes, ano)?;
    Ok(Json(record).into_response())
}

/// DELETE /consumo/remover/:cpf/:mes/:ano
async fn remove_consumption(
    State(state): State<AppState>,
    Path((cpf, mes, ano)): Path<(String, i32, i32)>,
) -> Result<StatusCode, ApiError> {
    store::delete_by_key(&state.conn(), &cpf, mes, ano)?;
    Ok(StatusCode::OK)
}

/// GET /consumo/total-geral - Sum of all bills
async fn total_geral(State(state): State<AppState>) -> Result<Response, ApiError> {
    let total_geral = store::aggregate_total(&state.conn())?;
    Ok(Json(TotalResponse { total_geral }).into_response())
}

// ============================================================================
// Router
// ============================================================================

pub fn router(state: AppState) -> Router {
    let consumo_routes = Router::new()
        .route("/cadastrar", post(create_consumption))
        .route("/listar", get(list_consumptions))
        .route("/buscar/:cpf/:mes/:ano", get(find_consumption))
        .route("/remover/:cpf/:mes/:ano", delete(remove_consumption))
        .route("/total-geral", get(total_geral));

    let routes = Router::new()
        .route("/health", get(health_check))
        .nest("/consumo", consumo_routes);

    Router::new()
        .merge(routes.clone())
        .nest("/api", routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
