use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, post},
};

/// Authenticated Router Module
///
/// Routes for any caller with a validated session, regardless of role. These
/// paths match no role-scoped prefix in the gate's table, so "authenticated is
/// sufficient". Owner-scoping (orders, logs, workouts belong to the caller) is
/// enforced by binding the `AuthUser` id in every repository query.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        // The caller's profile: id, email, role.
        .route("/me", get(handlers::get_me))
        // --- Menu Browsing ---
        // GET /meals?search=...&max_calories=...
        // Active menu only; retired meals are filtered at the Repository layer.
        .route("/meals", get(handlers::get_meals))
        // GET /meals/{id}
        .route("/meals/{id}", get(handlers::get_meal_details))
        // --- Ordering ---
        // POST /orders - checkout of the client-side cart, atomic per order.
        // GET /orders - the caller's own orders.
        .route(
            "/orders",
            post(handlers::create_order).get(handlers::get_my_orders),
        )
        // DELETE /orders/{id}
        // Cancel an own, still-pending order. Ownership checked in the query.
        .route("/orders/{id}", delete(handlers::cancel_order))
        // --- Nutrition Dashboard ---
        // POST /health/logs - log consumed macros for a date.
        .route("/health/logs", post(handlers::add_health_log))
        // GET /health/summary?date=YYYY-MM-DD - per-day totals.
        .route("/health/summary", get(handlers::get_health_summary))
        // --- Workout Tracking ---
        // POST /workouts and GET /workouts - log and list sessions.
        .route(
            "/workouts",
            post(handlers::log_workout).get(handlers::get_workouts),
        )
        // GET /workouts/streak - current/longest streak over distinct days.
        .route("/workouts/streak", get(handlers::get_workout_streak))
}
