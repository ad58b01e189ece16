//! HTTP route handlers.

use axum::body::Bytes;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::DateTime;
use serde::de::DeserializeOwned;
use tracing::{error, warn};

use crate::domain::Coordinate;
use crate::planner::PlanError;
use crate::providers::{
    DriveLegProvider, GeocodingProvider, ParkingDirectoryProvider, TransitLegProvider,
};

use super::dto::*;
use super::state::AppState;

/// Create the application router.
pub fn create_router<D, T, P, G>(state: AppState<D, T, P, G>) -> Router
where
    D: DriveLegProvider + 'static,
    T: TransitLegProvider + 'static,
    P: ParkingDirectoryProvider + 'static,
    G: GeocodingProvider + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/journey/plan", post(plan_journey::<D, T, P, G>))
        .route("/journey/plan-by-address", post(plan_by_address::<D, T, P, G>))
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Plan park-and-ride journeys between two coordinates.
async fn plan_journey<D, T, P, G>(
    State(state): State<AppState<D, T, P, G>>,
    body: Bytes,
) -> Result<Json<PlanJourneyResponse>, AppError>
where
    D: DriveLegProvider,
    T: TransitLegProvider,
    P: ParkingDirectoryProvider,
{
    let req: PlanJourneyRequest = parse_json(&body)?;
    check_coordinate("origin", req.origin)?;
    check_coordinate("destination", req.destination)?;
    check_depart_time(req.depart_time)?;

    let journeys = state
        .planner()
        .plan(req.origin, req.destination, req.depart_time)
        .await?;

    Ok(Json(PlanJourneyResponse::from_journeys(&journeys)))
}

/// Plan park-and-ride journeys between two addresses.
async fn plan_by_address<D, T, P, G>(
    State(state): State<AppState<D, T, P, G>>,
    body: Bytes,
) -> Result<Json<PlanByAddressResponse>, AppError>
where
    D: DriveLegProvider,
    T: TransitLegProvider,
    P: ParkingDirectoryProvider,
    G: GeocodingProvider,
{
    let req: PlanByAddressRequest = parse_json(&body)?;
    if req.origin.trim().is_empty() || req.destination.trim().is_empty() {
        return Err(AppError::BadRequest {
            message: "origin and destination addresses are required".to_string(),
        });
    }
    check_depart_time(req.depart_time)?;

    let plan = state
        .planner()
        .plan_by_address(
            state.geocoder.as_ref(),
            &req.origin,
            &req.destination,
            req.depart_time,
        )
        .await?;

    Ok(Json(PlanByAddressResponse::from(&plan)))
}

/// Parse a JSON body, logging the raw body on failure.
fn parse_json<R: DeserializeOwned>(body: &Bytes) -> Result<R, AppError> {
    serde_json::from_slice(body).map_err(|e| {
        warn!(error = %e, body = %String::from_utf8_lossy(body), "invalid request body");
        AppError::BadRequest {
            message: format!("Invalid JSON: {e}"),
        }
    })
}

fn check_coordinate(field: &str, c: Coordinate) -> Result<(), AppError> {
    if c.is_valid() {
        Ok(())
    } else {
        Err(AppError::BadRequest {
            message: format!("Invalid {field} coordinate: [{}, {}]", c.longitude, c.latitude),
        })
    }
}

fn check_depart_time(depart_time: i64) -> Result<(), AppError> {
    match DateTime::from_timestamp(depart_time, 0) {
        Some(_) => Ok(()),
        None => Err(AppError::BadRequest {
            message: format!("depart_time out of range: {depart_time}"),
        }),
    }
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    NotFound { message: String },
    BadGateway { message: String },
}

impl From<PlanError> for AppError {
    fn from(e: PlanError) -> Self {
        match &e {
            PlanError::Geocode { source, .. } if source.is_no_answer() => AppError::NotFound {
                message: e.to_string(),
            },
            _ => AppError::BadGateway {
                message: e.to_string(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message),
            AppError::BadGateway { message } => (StatusCode::BAD_GATEWAY, message),
        };

        if status.is_server_error() {
            error!(%status, %message, "request failed");
        } else {
            warn!(%status, %message, "request rejected");
        }

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}
