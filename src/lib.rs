use axum::{Router, extract::FromRef, http::HeaderName, middleware};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod gate;
pub mod handlers;
pub mod models;
pub mod provider;
pub mod repository;

// Module for routing segregation (Public, Authenticated, Admin).
pub mod routes;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

// Makes core state types easily accessible to the application entry point (main.rs).
pub use config::AppConfig;
pub use provider::{AuthState, MockAuthProvider, SupabaseAuthClient};
pub use repository::{PostgresRepository, RepositoryState};

/// ApiDoc
///
/// Auto-generates the OpenAPI documentation (Swagger JSON) for the application,
/// aggregating all paths and schemas decorated with the `#[utoipa::path]` and
/// `#[derive(utoipa::ToSchema)]` macros. Served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::root, handlers::sign_in_page, handlers::unauthorized_page,
        handlers::sign_up, handlers::sign_in, handlers::sign_out,
        handlers::get_me, handlers::get_meals, handlers::get_meal_details,
        handlers::create_order, handlers::get_my_orders, handlers::cancel_order,
        handlers::add_health_log, handlers::get_health_summary,
        handlers::log_workout, handlers::get_workouts, handlers::get_workout_streak,
        handlers::get_admin_stats, handlers::get_admin_meals, handlers::create_meal,
        handlers::update_meal, handlers::update_meal_status, handlers::get_admin_orders
    ),
    components(
        schemas(
            models::Role, models::Profile, models::SessionTokens,
            models::Meal, models::CreateMealRequest, models::UpdateMealRequest,
            models::Order, models::OrderItemRequest, models::CreateOrderRequest,
            models::HealthLog, models::CreateHealthLogRequest, models::NutritionSummary,
            models::Workout, models::CreateWorkoutRequest, models::WorkoutStreak,
            models::SignUpRequest, models::SignInRequest, models::AdminDashboardStats,
        )
    ),
    tags(
        (name = "fitbites", description = "FitBites Meal Subscription API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, thread-safe, immutable container holding all application services
/// and configuration, shared across all incoming requests. Each request gets its
/// own short-lived view via `FromRef`; nothing here is mutated across requests.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: abstracts database access via the PgPool connection.
    pub repo: RepositoryState,
    /// Auth Layer: abstracts the external authentication provider.
    pub auth: AuthState,
    /// Configuration: the loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// Allow handlers and extractors to selectively pull components from the shared state.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AuthState {
    fn from_ref(app_state: &AppState) -> AuthState {
        app_state.auth.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the application's entire routing structure, applies the route gate
/// and the global middleware stack, and registers the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: excluded from the gate via its asset-prefix list.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public paths: the gate short-circuits these, but they share the stack.
        .merge(public::public_routes())
        // Authenticated-only paths.
        .merge(authenticated::authenticated_routes())
        // Role-scoped paths, nested under the '/admin' prefix the gate matches on.
        .nest("/admin", admin::admin_routes())
        // The Route Access Gate runs on every request: session refresh, path
        // classification, authentication and role enforcement. Handlers behind it
        // receive the resolved identity through the request extensions.
        .layer(middleware::from_fn_with_state(
            state.clone(),
            gate::gate_middleware,
        ))
        // Apply the Unified State to all routes.
        .with_state(state);

    // 3. Observability and Correlation Layers (applied outermost)
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID Generation: a unique UUID for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request Tracing: wraps the request/response lifecycle in a span
                // carrying the generated request ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID Propagation back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Customizes the `TraceLayer` span creation: extracts the `x-request-id` header
/// (if present) and includes it alongside the HTTP method and URI so every log
/// line for a single request is correlated by a unique ID.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
