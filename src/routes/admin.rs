use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, put},
};

/// Admin Router Module
///
/// Routes nested under the role-scoped `/admin` prefix: menu management and
/// fulfilment oversight.
///
/// Access Control:
/// The route gate redirects any caller whose role is not `admin` before these
/// handlers run. Each handler still re-checks `role == Admin` and answers 403,
/// so the policy holds even for call sites that bypass the gate.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/stats
        // Dashboard counters (users, meals, orders, pending fulfilment).
        .route("/stats", get(handlers::get_admin_stats))
        // GET /admin/meals - the full menu, retired items included.
        // POST /admin/meals - add a new menu item.
        .route(
            "/meals",
            get(handlers::get_admin_meals).post(handlers::create_meal),
        )
        // PUT /admin/meals/{id}
        // Partial update of name/description/macros/price.
        .route("/meals/{id}", put(handlers::update_meal))
        // PUT /admin/meals/{id}/status
        // Publish or retire a meal. Retired meals keep their rows so past
        // orders stay resolvable.
        .route("/meals/{id}/status", put(handlers::update_meal_status))
        // GET /admin/orders
        // Every order in the system, newest first.
        .route("/orders", get(handlers::get_admin_orders))
}
