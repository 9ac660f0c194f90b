pub mod booking;
pub mod calendar;
pub mod health;
pub mod slots;

use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    let app = Router::new()
        .route("/health", get(health::health))
        .route("/api/booking", post(booking::create_booking))
        .route("/api/booking/stats", get(booking::stats))
        .route(
            "/api/booking/token/:token",
            get(booking::get_booking_by_token),
        )
        .route("/api/booking/:id", get(booking::get_booking))
        .route("/api/booking/:id/status", post(booking::set_status))
        .route("/api/slots", get(slots::list_slots))
        .route("/api/slots/availability", get(slots::availability))
        .route("/api/slots/quota", put(slots::update_quota))
        .route("/api/closures/:date", get(calendar::closure_status))
        .route(
            "/api/holidays",
            get(calendar::list_holidays).post(calendar::create_holiday),
        )
        .route(
            "/api/holidays/:id",
            put(calendar::update_holiday).delete(calendar::delete_holiday),
        )
        .route(
            "/api/weekoffs",
            get(calendar::list_weekoffs).post(calendar::create_weekoff),
        )
        .route(
            "/api/weekoffs/:id",
            put(calendar::update_weekoff).delete(calendar::delete_weekoff),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if origins.is_empty() {
        return app;
    }

    app.layer(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_credentials(true)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
    )
}
