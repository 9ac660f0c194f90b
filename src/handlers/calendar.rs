use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::dates::{self, parse_day};
use crate::errors::AppError;
use crate::models::{ClosureStatus, Holiday, WeekOffRule};
use crate::services::closure;
use crate::services::holidays::{self, HolidayInput};
use crate::services::weekoffs::{self, WeekOffInput};
use crate::state::AppState;

// GET /api/closures/:date
pub async fn closure_status(
    State(state): State<Arc<AppState>>,
    Path(raw): Path<String>,
) -> Result<Json<ClosureStatus>, AppError> {
    let day = parse_day(&raw).map_err(|e| AppError::invalid(e.to_string()))?;
    let db = state.conn()?;
    Ok(Json(closure::is_closed(&db, day)?))
}

// ── Holidays ──

// GET /api/holidays
pub async fn list_holidays(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Holiday>>, AppError> {
    let db = state.conn()?;
    Ok(Json(holidays::list_holidays(&db)?))
}

// POST /api/holidays
pub async fn create_holiday(
    State(state): State<Arc<AppState>>,
    Json(body): Json<HolidayInput>,
) -> Result<(StatusCode, Json<Holiday>), AppError> {
    let mut db = state.conn()?;
    let holiday = holidays::create_holiday(&mut db, &body, dates::today())?;
    Ok((StatusCode::CREATED, Json(holiday)))
}

// PUT /api/holidays/:id
pub async fn update_holiday(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<HolidayInput>,
) -> Result<Json<Holiday>, AppError> {
    let mut db = state.conn()?;
    Ok(Json(holidays::update_holiday(&mut db, &id, &body, dates::today())?))
}

// DELETE /api/holidays/:id
pub async fn delete_holiday(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let db = state.conn()?;
    holidays::delete_holiday(&db, &id, dates::today())?;
    Ok(Json(serde_json::json!({"ok": true})))
}

// ── Week-off rules ──

// GET /api/weekoffs
pub async fn list_weekoffs(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<WeekOffRule>>, AppError> {
    let db = state.conn()?;
    Ok(Json(weekoffs::list_weekoffs(&db)?))
}

// POST /api/weekoffs
pub async fn create_weekoff(
    State(state): State<Arc<AppState>>,
    Json(body): Json<WeekOffInput>,
) -> Result<(StatusCode, Json<WeekOffRule>), AppError> {
    let mut db = state.conn()?;
    let rule = weekoffs::create_weekoff(&mut db, &body)?;
    Ok((StatusCode::CREATED, Json(rule)))
}

// PUT /api/weekoffs/:id
pub async fn update_weekoff(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<WeekOffInput>,
) -> Result<Json<WeekOffRule>, AppError> {
    let mut db = state.conn()?;
    Ok(Json(weekoffs::update_weekoff(&mut db, &id, &body)?))
}

// DELETE /api/weekoffs/:id
pub async fn delete_weekoff(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let db = state.conn()?;
    weekoffs::delete_weekoff(&db, &id)?;
    Ok(Json(serde_json::json!({"ok": true})))
}
