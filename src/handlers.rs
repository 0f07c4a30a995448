use crate::{
    AppState,
    auth::{self, AuthUser},
    models::{
        self, AdminDashboardStats, CreateHealthLogRequest, CreateMealRequest, CreateOrderRequest,
        CreateWorkoutRequest, HealthLog, Meal, NutritionSummary, Order, Profile, Role,
        SessionTokens, SignInRequest, SignUpRequest, UpdateMealRequest, Workout, WorkoutStreak,
    },
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;

// --- Filter Structs ---

/// MealFilter
///
/// Accepted query parameters for menu browsing (GET /meals).
#[derive(Deserialize, utoipa::IntoParams)]
pub struct MealFilter {
    /// Optional case-insensitive search over name and description.
    pub search: Option<String>,
    /// Optional upper bound on per-serving calories.
    pub max_calories: Option<i32>,
}

/// SummaryFilter
///
/// Accepted query parameters for the nutrition dashboard (GET /health/summary).
#[derive(Deserialize, utoipa::IntoParams)]
pub struct SummaryFilter {
    /// Day to summarize (YYYY-MM-DD). Defaults to today (UTC).
    pub date: Option<NaiveDate>,
}

/// SignInPageQuery
///
/// Query parameters the gate attaches when redirecting to the sign-in page.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct SignInPageQuery {
    #[serde(rename = "redirectTo")]
    pub redirect_to: Option<String>,
}

// --- Public Handlers ---

/// root
///
/// [Public Route] Landing response for `/`.
#[utoipa::path(get, path = "/", responses((status = 200, description = "Service info")))]
pub async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "service": "fitbites-portal", "status": "ok" }))
}

/// sign_in_page
///
/// [Public Route] Landing response for the gate's sign-in redirect target.
/// Echoes the `redirectTo` parameter so the client can return the caller to the
/// originally requested path after signing in.
#[utoipa::path(
    get,
    path = "/sign-in",
    params(SignInPageQuery),
    responses((status = 200, description = "Sign-in page"))
)]
pub async fn sign_in_page(Query(query): Query<SignInPageQuery>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "sign in required",
        "redirectTo": query.redirect_to,
    }))
}

/// unauthorized_page
///
/// [Public Route] Landing response for the gate's role-mismatch redirect target.
#[utoipa::path(
    get,
    path = "/unauthorized",
    responses((status = 200, description = "Unauthorized page"))
)]
pub async fn unauthorized_page() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "you do not have access to that page" }))
}

/// sign_up
///
/// [Public Route] Registers a new identity with the external auth provider, then
/// creates the mirrored `public.profiles` row with the canonical id so both
/// systems share the same primary key. New users start as `standard_user`.
#[utoipa::path(
    post,
    path = "/auth/sign-up",
    request_body = SignUpRequest,
    responses(
        (status = 200, description = "Registered", body = Profile),
        (status = 400, description = "Provider rejected the signup")
    )
)]
pub async fn sign_up(
    State(state): State<AppState>,
    Json(payload): Json<SignUpRequest>,
) -> Result<Json<Profile>, StatusCode> {
    let user_id = state
        .auth
        .sign_up(&payload.email, &payload.password)
        .await
        .map_err(|e| {
            tracing::warn!("sign_up rejected: {}", e);
            StatusCode::BAD_REQUEST
        })?;

    let profile = state
        .repo
        .create_profile(Profile {
            id: user_id,
            email: payload.email,
            role: Role::StandardUser,
        })
        .await
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(profile))
}

/// sign_in
///
/// [Public Route] Exchanges credentials for a session token pair via the
/// provider's password grant and sets both session cookies.
#[utoipa::path(
    post,
    path = "/auth/sign-in",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in", body = SessionTokens),
        (status = 401, description = "Bad credentials")
    )
)]
pub async fn sign_in(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<SignInRequest>,
) -> Result<(CookieJar, Json<SessionTokens>), StatusCode> {
    let tokens = state
        .auth
        .sign_in(&payload.email, &payload.password)
        .await
        .map_err(|e| {
            tracing::debug!("sign_in rejected: {}", e);
            StatusCode::UNAUTHORIZED
        })?;

    let [access, refresh] = auth::session_cookies(&tokens);
    let jar = jar.add(access).add(refresh);

    Ok((jar, Json(tokens)))
}

/// sign_out
///
/// [Public Route] Clears both session cookies. The provider-side session lapses
/// on its own; this endpoint only destroys the browser's credential.
#[utoipa::path(
    post,
    path = "/auth/sign-out",
    responses((status = 204, description = "Signed out"))
)]
pub async fn sign_out(jar: CookieJar) -> (CookieJar, StatusCode) {
    (auth::clear_session_cookies(jar), StatusCode::NO_CONTENT)
}

// --- Authenticated Handlers ---

/// get_me
///
/// [Authenticated Route] The caller's profile: id, email and role.
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "Profile", body = Profile),
        (status = 404, description = "No profile row yet")
    )
)]
pub async fn get_me(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Profile>, StatusCode> {
    match state.repo.get_profile(id).await {
        Some(profile) => Ok(Json(profile)),
        None => Err(StatusCode::NOT_FOUND),
    }
}

/// get_meals
///
/// [Authenticated Route] Lists the active menu with optional search and calorie
/// cap. Retired meals are filtered out unconditionally at the Repository layer.
#[utoipa::path(
    get,
    path = "/meals",
    params(MealFilter),
    responses((status = 200, description = "Active menu", body = [Meal]))
)]
pub async fn get_meals(
    State(state): State<AppState>,
    Query(filter): Query<MealFilter>,
) -> Json<Vec<models::Meal>> {
    let meals = state
        .repo
        .list_active_meals(filter.search, filter.max_calories)
        .await;
    Json(meals)
}

/// get_meal_details
///
/// [Authenticated Route] Single meal detail. Resolves only meals still on the menu.
#[utoipa::path(
    get,
    path = "/meals/{id}",
    params(("id" = Uuid, Path, description = "Meal ID")),
    responses(
        (status = 200, description = "Found", body = Meal),
        (status = 404, description = "Unknown or retired meal")
    )
)]
pub async fn get_meal_details(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<models::Meal>, StatusCode> {
    match state.repo.get_meal(id).await {
        Some(meal) => Ok(Json(meal)),
        None => Err(StatusCode::NOT_FOUND),
    }
}

/// create_order
///
/// [Authenticated Route] Checkout: turns the client-side cart into an order.
/// The whole order succeeds or fails atomically; a cart line referencing an
/// unknown or retired meal rejects the order.
#[utoipa::path(
    post,
    path = "/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 200, description = "Order placed", body = Order),
        (status = 400, description = "Empty cart or unavailable meal")
    )
)]
pub async fn create_order(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Json<models::Order>, StatusCode> {
    if payload.items.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    match state.repo.create_order(user_id, payload).await {
        Some(order) => Ok(Json(order)),
        None => Err(StatusCode::BAD_REQUEST),
    }
}

/// get_my_orders
///
/// [Authenticated Route] Lists the caller's own orders, newest first.
#[utoipa::path(
    get,
    path = "/orders",
    responses((status = 200, description = "My orders", body = [Order]))
)]
pub async fn get_my_orders(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Json<Vec<models::Order>> {
    Json(state.repo.get_my_orders(id).await)
}

/// cancel_order
///
/// [Authenticated Route] Cancels one of the caller's own pending orders.
/// The Owner-Only check lives in the repository query; 404 covers both
/// "not found" and "not yours / not pending".
#[utoipa::path(
    delete,
    path = "/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 204, description = "Cancelled"),
        (status = 404, description = "Not found, not yours, or not pending")
    )
)]
pub async fn cancel_order(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> StatusCode {
    if state.repo.cancel_order(id, user_id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

/// add_health_log
///
/// [Authenticated Route] Logs consumed macros for a date, either tied to an
/// ordered meal or entered manually.
#[utoipa::path(
    post,
    path = "/health/logs",
    request_body = CreateHealthLogRequest,
    responses(
        (status = 200, description = "Logged", body = HealthLog),
        (status = 400, description = "Rejected")
    )
)]
pub async fn add_health_log(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateHealthLogRequest>,
) -> Result<Json<models::HealthLog>, StatusCode> {
    match state.repo.add_health_log(user_id, payload).await {
        Some(log) => Ok(Json(log)),
        None => Err(StatusCode::BAD_REQUEST),
    }
}

/// get_health_summary
///
/// [Authenticated Route] Per-day nutrition totals for the dashboard. A day with
/// no entries returns zeroed totals.
#[utoipa::path(
    get,
    path = "/health/summary",
    params(SummaryFilter),
    responses((status = 200, description = "Daily totals", body = NutritionSummary))
)]
pub async fn get_health_summary(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<SummaryFilter>,
) -> Json<models::NutritionSummary> {
    let date = filter.date.unwrap_or_else(|| Utc::now().date_naive());
    Json(state.repo.nutrition_summary(id, date).await)
}

/// log_workout
///
/// [Authenticated Route] Records a workout session for the caller.
#[utoipa::path(
    post,
    path = "/workouts",
    request_body = CreateWorkoutRequest,
    responses(
        (status = 200, description = "Logged", body = Workout),
        (status = 400, description = "Rejected")
    )
)]
pub async fn log_workout(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateWorkoutRequest>,
) -> Result<Json<models::Workout>, StatusCode> {
    match state.repo.log_workout(user_id, payload).await {
        Some(workout) => Ok(Json(workout)),
        None => Err(StatusCode::BAD_REQUEST),
    }
}

/// get_workouts
///
/// [Authenticated Route] The caller's workout history, newest first.
#[utoipa::path(
    get,
    path = "/workouts",
    responses((status = 200, description = "Workouts", body = [Workout]))
)]
pub async fn get_workouts(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Json<Vec<models::Workout>> {
    Json(state.repo.get_workouts(id).await)
}

/// get_workout_streak
///
/// [Authenticated Route] Current and longest workout streaks, computed from the
/// caller's distinct workout dates.
#[utoipa::path(
    get,
    path = "/workouts/streak",
    responses((status = 200, description = "Streaks", body = WorkoutStreak))
)]
pub async fn get_workout_streak(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Json<models::WorkoutStreak> {
    let dates = state.repo.workout_dates(id).await;
    Json(WorkoutStreak::from_dates(&dates, Utc::now().date_naive()))
}

// --- Admin Handlers ---
// The gate keeps non-admins out of /admin/*; each handler still re-checks the
// role so the endpoints stay safe when called outside the gated router.

/// get_admin_stats
///
/// [Admin Route] Core dashboard counters.
#[utoipa::path(
    get,
    path = "/admin/stats",
    responses(
        (status = 200, description = "Stats", body = AdminDashboardStats),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn get_admin_stats(
    AuthUser { role, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<AdminDashboardStats>, StatusCode> {
    if role != Some(Role::Admin) {
        return Err(StatusCode::FORBIDDEN);
    }
    Ok(Json(state.repo.get_stats().await))
}

/// get_admin_meals
///
/// [Admin Route] The full menu, retired meals included.
#[utoipa::path(
    get,
    path = "/admin/meals",
    responses(
        (status = 200, description = "All meals", body = [Meal]),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn get_admin_meals(
    AuthUser { role, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<models::Meal>>, StatusCode> {
    if role != Some(Role::Admin) {
        return Err(StatusCode::FORBIDDEN);
    }
    Ok(Json(state.repo.list_all_meals().await))
}

/// create_meal
///
/// [Admin Route] Adds a new menu item, live immediately.
#[utoipa::path(
    post,
    path = "/admin/meals",
    request_body = CreateMealRequest,
    responses(
        (status = 200, description = "Created", body = Meal),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn create_meal(
    AuthUser { role, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateMealRequest>,
) -> Result<Json<models::Meal>, StatusCode> {
    if role != Some(Role::Admin) {
        return Err(StatusCode::FORBIDDEN);
    }
    match state.repo.create_meal(payload).await {
        Some(meal) => Ok(Json(meal)),
        None => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

/// update_meal
///
/// [Admin Route] Partial update of a menu item; only provided fields change.
#[utoipa::path(
    put,
    path = "/admin/meals/{id}",
    params(("id" = Uuid, Path, description = "Meal ID")),
    request_body = UpdateMealRequest,
    responses(
        (status = 200, description = "Updated", body = Meal),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_meal(
    AuthUser { role, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateMealRequest>,
) -> Result<Json<models::Meal>, StatusCode> {
    if role != Some(Role::Admin) {
        return Err(StatusCode::FORBIDDEN);
    }
    match state.repo.update_meal(id, payload).await {
        Some(meal) => Ok(Json(meal)),
        None => Err(StatusCode::NOT_FOUND),
    }
}

/// update_meal_status
///
/// [Admin Route] Puts a meal on or off the menu. This is the core menu
/// management endpoint used to publish or retire items.
#[utoipa::path(
    put,
    path = "/admin/meals/{id}/status",
    params(("id" = Uuid, Path, description = "Meal ID")),
    request_body = bool,
    responses(
        (status = 200, description = "Updated", body = Meal),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_meal_status(
    AuthUser { role, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(is_active): Json<bool>,
) -> Result<Json<models::Meal>, StatusCode> {
    if role != Some(Role::Admin) {
        return Err(StatusCode::FORBIDDEN);
    }
    match state.repo.set_meal_status(id, is_active).await {
        Some(meal) => Ok(Json(meal)),
        None => Err(StatusCode::NOT_FOUND),
    }
}

/// get_admin_orders
///
/// [Admin Route] Lists every order in the system for fulfilment oversight.
#[utoipa::path(
    get,
    path = "/admin/orders",
    responses(
        (status = 200, description = "All orders", body = [Order]),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn get_admin_orders(
    AuthUser { role, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<models::Order>>, StatusCode> {
    if role != Some(Role::Admin) {
        return Err(StatusCode::FORBIDDEN);
    }
    Ok(Json(state.repo.list_all_orders().await))
}
