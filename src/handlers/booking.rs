use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::dates;
use crate::errors::AppError;
use crate::models::{Booking, BookingStats, BookingStatus};
use crate::services::booking::{self, BookingRequest};
use crate::state::AppState;

// POST /api/booking
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(body): Json<BookingRequest>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let booking = {
        let mut db = state.conn()?;
        booking::create_booking(&mut db, &body, dates::today())?
    };
    Ok((StatusCode::CREATED, Json(booking)))
}

// GET /api/booking/stats?recent=N
#[derive(Deserialize)]
pub struct StatsQuery {
    pub recent: Option<i64>,
}

pub async fn stats(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<BookingStats>, AppError> {
    let db = state.conn()?;
    Ok(Json(booking::stats(&db, query.recent)?))
}

// GET /api/booking/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    let db = state.conn()?;
    Ok(Json(booking::get_booking(&db, &id)?))
}

// GET /api/booking/token/:token
pub async fn get_booking_by_token(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Json<Booking>, AppError> {
    let db = state.conn()?;
    Ok(Json(booking::get_booking_by_token(&db, &token)?))
}

// POST /api/booking/:id/status
#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: BookingStatus,
}

pub async fn set_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<Booking>, AppError> {
    let mut db = state.conn()?;
    Ok(Json(booking::set_status(&mut db, &id, body.status)?))
}
