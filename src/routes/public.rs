use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints on the gate's public path set: reachable without authentication.
/// The set matches the gate's route table exactly: root, the sign-in and
/// unauthorized landing pages, the health check, and everything under the
/// reserved `/auth` callback prefix.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /
        // Landing response; also the public root in the gate's route table.
        .route("/", get(handlers::root))
        // GET /healthz
        // Unauthenticated endpoint for monitoring and load balancer checks.
        .route("/healthz", get(|| async { "ok" }))
        // GET /sign-in
        // Where the gate sends unauthenticated callers. Echoes `redirectTo`.
        .route("/sign-in", get(handlers::sign_in_page))
        // GET /unauthorized
        // Where the gate sends authenticated callers with the wrong role.
        .route("/unauthorized", get(handlers::unauthorized_page))
        // POST /auth/sign-up
        // Provider registration plus the mirrored local profile row.
        .route("/auth/sign-up", post(handlers::sign_up))
        // POST /auth/sign-in
        // Password grant; sets both session cookies on success.
        .route("/auth/sign-in", post(handlers::sign_in))
        // POST /auth/sign-out
        // Clears the session cookies.
        .route("/auth/sign-out", post(handlers::sign_out))
}
