// rest_api/src/lib.rs

//! Patient membership REST service.
//!
//! Paths:
//! - `GET /` returns the service banner
//! - `GET /pats` lists patients, optionally filtered by one of
//!   `fname`, `lname`, `phone_home`, `postal_code`, `sex`
//! - `GET /pats/{id}` fetches one patient
//! - `POST /pats` creates a patient from a JSON body
//! - `PUT /pats/{id}` updates a patient from a JSON body
//! - `DELETE /pats/{id}` deletes a patient

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use anyhow::Context;
use models::{Gender, Patient, ValidationError};

pub mod config;
pub mod storage;

use crate::config::RestApiConfig;
use crate::storage::{PatientStore, QueryField, StorageError};

const JSON_CONTENT_TYPE: &str = "application/json";

/// Boundary error for the REST API.
#[derive(Debug, Error)]
pub enum RestApiError {
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("Patient with id '{0}' was not found.")]
    NotFound(i32),
    #[error("Content-Type must be {0}")]
    UnsupportedMediaType(&'static str),
    #[error("Storage error: {0}")]
    Storage(StorageError),
}

// A store-level NotFound is a 404 like any other missed lookup; everything
// else from the store is a server fault.
impl From<StorageError> for RestApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(id) => RestApiError::NotFound(id),
            other => RestApiError::Storage(other),
        }
    }
}

impl IntoResponse for RestApiError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            RestApiError::Validation(_) => (StatusCode::BAD_REQUEST, "Bad Request"),
            RestApiError::NotFound(_) => (StatusCode::NOT_FOUND, "Not Found"),
            RestApiError::UnsupportedMediaType(_) => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "Unsupported media type")
            }
            RestApiError::Storage(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
        };
        let message = self.to_string();
        if status.is_client_error() {
            warn!("{}", message);
        } else {
            error!("{}", message);
        }
        let body = Json(json!({
            "status": status.as_u16(),
            "error": error,
            "message": message,
        }));
        (status, body).into_response()
    }
}

/// Shared state for the Axum application: the injected persistence
/// collaborator, nothing else.
#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn PatientStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn PatientStore>) -> Self {
        AppState { store }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ListPatsQuery {
    fname: Option<String>,
    lname: Option<String>,
    phone_home: Option<String>,
    postal_code: Option<String>,
    sex: Option<String>,
}

// Handler for the index route
async fn index() -> Json<Value> {
    Json(json!({
        "name": "Patient Membership REST API Service",
        "version": "1.0",
        "paths": "/pats",
    }))
}

// Handler for GET /pats. At most one filter applies; when several are
// supplied the first recognized one wins, in this fixed order.
async fn list_pats(
    State(state): State<AppState>,
    Query(query): Query<ListPatsQuery>,
) -> Result<Json<Value>, RestApiError> {
    info!("Request for patient list");
    let pats = if let Some(fname) = query.fname.filter(|v| !v.is_empty()) {
        state.store.find_by_field(QueryField::FirstName, &fname).await?
    } else if let Some(lname) = query.lname.filter(|v| !v.is_empty()) {
        state.store.find_by_field(QueryField::LastName, &lname).await?
    } else if let Some(phone_home) = query.phone_home.filter(|v| !v.is_empty()) {
        state.store.find_by_field(QueryField::HomePhone, &phone_home).await?
    } else if let Some(postal_code) = query.postal_code.filter(|v| !v.is_empty()) {
        state.store.find_by_field(QueryField::PostalCode, &postal_code).await?
    } else if let Some(sex) = query.sex.filter(|v| !v.is_empty()) {
        // An unrecognized gender name is a client error, not an empty result.
        let gender: Gender = sex.parse()?;
        state.store.find_by_field(QueryField::Gender, gender.as_str()).await?
    } else {
        state.store.all().await?
    };
    let results: Vec<Value> = pats.iter().map(Patient::serialize).collect();
    Ok(Json(Value::Array(results)))
}

// Handler for GET /pats/{id}
async fn get_pats(
    State(state): State<AppState>,
    Path(pat_id): Path<i32>,
) -> Result<Json<Value>, RestApiError> {
    info!("Request for patient with id: {}", pat_id);
    let pat = state
        .store
        .find_by_id(pat_id)
        .await?
        .ok_or(RestApiError::NotFound(pat_id))?;
    Ok(Json(pat.serialize()))
}

// Handler for POST /pats
async fn create_pats(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, RestApiError> {
    info!("Request to create a patient");
    check_content_type(&headers)?;
    let data = parse_body(&body)?;
    let mut pat = Patient::default();
    pat.deserialize(&data)?;
    let pat = state.store.create(pat).await?;
    let id = pat
        .id
        .ok_or_else(|| RestApiError::Storage(StorageError::MissingId))?;
    let location = format!("/pats/{}", id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(pat.serialize()),
    )
        .into_response())
}

// Handler for PUT /pats/{id}. The path id always wins over whatever id the
// payload carries.
async fn update_pats(
    State(state): State<AppState>,
    Path(pat_id): Path<i32>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, RestApiError> {
    info!("Request to update patient with id: {}", pat_id);
    check_content_type(&headers)?;
    let data = parse_body(&body)?;
    let mut pat = state
        .store
        .find_by_id(pat_id)
        .await?
        .ok_or(RestApiError::NotFound(pat_id))?;
    pat.deserialize(&data)?;
    pat.id = Some(pat_id);
    let pat = state.store.save(pat).await?;
    Ok(Json(pat.serialize()))
}

// Handler for DELETE /pats/{id}. Deleting an absent patient is a no-op.
async fn delete_pats(
    State(state): State<AppState>,
    Path(pat_id): Path<i32>,
) -> Result<StatusCode, RestApiError> {
    info!("Request to delete the patient with id: {}", pat_id);
    state.store.delete(pat_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Checks that the request declares a JSON body.
fn check_content_type(headers: &HeaderMap) -> Result<(), RestApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let mime = content_type.split(';').next().unwrap_or_default().trim();
    if mime == JSON_CONTENT_TYPE {
        return Ok(());
    }
    error!("Invalid Content-Type: {}", content_type);
    Err(RestApiError::UnsupportedMediaType(JSON_CONTENT_TYPE))
}

/// Parses the raw body into JSON. Anything unparsable is the same
/// malformed-body validation error a non-object body produces.
fn parse_body(body: &Bytes) -> Result<Value, RestApiError> {
    serde_json::from_slice(body).map_err(|_| ValidationError::MalformedBody.into())
}

/// Builds the router with all patient routes and a permissive CORS layer.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_origin(Any);

    Router::new()
        .route("/", get(index))
        .route("/pats", get(list_pats).post(create_pats))
        .route("/pats/:pat_id", get(get_pats).put(update_pats).delete(delete_pats))
        .with_state(state)
        .layer(cors)
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Received shutdown signal.");
    }
}

/// Starts the REST API server and runs it until interrupted.
pub async fn start_server(
    config: RestApiConfig,
    store: Arc<dyn PatientStore>,
) -> Result<(), anyhow::Error> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid REST API listen address")?;

    let app = app(AppState::new(store));

    info!("REST API server listening on {}", addr);
    let listener = TcpListener::bind(&addr)
        .await
        .context(format!("Failed to bind to address: {}", addr))?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("REST API server failed to start or run")?;

    info!("REST API server stopped.");
    Ok(())
}
