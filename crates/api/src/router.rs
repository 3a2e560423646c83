//! Route table and middleware.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers::{
    auth, chats, contact, demo, health, messages, profile, repair_requests, timeslots,
};
use crate::state::AppState;

/// Build the application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Auth
        .route("/auth/sign-up", post(auth::sign_up))
        .route("/auth/verify", post(auth::verify))
        .route("/auth/resend", post(auth::resend))
        .route("/auth/sign-in", post(auth::sign_in))
        .route("/auth/session", get(auth::session))
        .route("/auth/sign-out", post(auth::sign_out))
        .route("/auth/events", get(auth::events))
        // Profile & products
        .route("/profile", get(profile::get_profile).put(profile::update_profile))
        .route("/products", get(profile::list_products))
        // Repair requests
        .route(
            "/repair-requests",
            post(repair_requests::create).get(repair_requests::list_own),
        )
        .route("/repair-requests/browse", get(repair_requests::browse))
        .route("/repair-requests/:id", get(repair_requests::get))
        .route("/repair-requests/:id/status", put(repair_requests::update_status))
        .route("/repair-requests/:id/timeslots", post(repair_requests::submit_timeslots))
        .route(
            "/repair-requests/:id/timeslots/:timeslot_id",
            delete(repair_requests::withdraw_timeslot),
        )
        .route(
            "/repair-requests/:id/timeslots/:timeslot_id/confirm",
            post(repair_requests::confirm_timeslot),
        )
        .route(
            "/repair-requests/:id/available-timeslots",
            get(repair_requests::available_timeslots),
        )
        // Messages
        .route("/repair-requests/:id/messages", get(messages::history).post(messages::send))
        .route("/repair-requests/:id/messages/stream", get(messages::stream))
        .route("/chats", get(chats::list))
        // Locations & timeslots
        .route("/locations", get(timeslots::locations))
        .route("/timeslots", get(timeslots::for_day))
        .route("/timeslots/dates", get(timeslots::dates))
        .route("/timeslots/stream", get(timeslots::stream))
        // Misc
        .route("/demo", post(demo::populate))
        .route("/contact", post(contact::submit));

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1", api_v1)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
