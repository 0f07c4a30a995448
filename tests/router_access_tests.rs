//! End-to-end access tests through the assembled router: the gate middleware,
//! the tiered routes, and the handlers, exercised with `oneshot` requests.

mod support;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use fitbites_portal::{
    AppState,
    auth::{ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE},
    config::Env,
    create_router,
    models::{Meal, Profile, Role, SessionTokens},
    provider::MockAuthProvider,
};
use http_body_util::BodyExt;
use support::{MockRepo, create_token, fresh_tokens, test_state};
use tower::util::ServiceExt;
use uuid::Uuid;

fn router(repo: MockRepo, provider: MockAuthProvider) -> Router {
    router_with_state(test_state(Env::Production, repo, provider)).0
}

fn router_with_state(state: AppState) -> (Router, AppState) {
    (create_router(state.clone()), state)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn get_with_session(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(
            header::COOKIE,
            format!("{}={}", ACCESS_TOKEN_COOKIE, token),
        )
        .body(Body::empty())
        .unwrap()
}

async fn json_body<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn root_passes_without_a_session() {
    let app = router(MockRepo::default(), MockAuthProvider::new_failing());
    let response = app.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn healthz_passes_without_a_session() {
    let app = router(MockRepo::default(), MockAuthProvider::new_failing());
    let response = app.oneshot(get("/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn admin_meals_without_session_redirects_to_sign_in() {
    let app = router(MockRepo::default(), MockAuthProvider::new_failing());
    let response = app.oneshot(get("/admin/meals")).await.unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/sign-in?redirectTo=%2Fadmin%2Fmeals"
    );
}

#[tokio::test]
async fn admin_meals_with_standard_user_redirects_to_unauthorized() {
    let user_id = Uuid::new_v4();
    let repo = MockRepo::with_profile(user_id, "u@fitbites.test", Role::StandardUser);
    let app = router(repo, MockAuthProvider::new_failing());

    let response = app
        .oneshot(get_with_session("/admin/meals", &create_token(user_id, 3600)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/unauthorized"
    );
}

#[tokio::test]
async fn admin_meals_with_admin_role_passes_through() {
    let user_id = Uuid::new_v4();
    let repo = MockRepo::with_profile(user_id, "admin@fitbites.test", Role::Admin);
    repo.add_meal("Retired bowl", 500, 1099, false);
    repo.add_meal("Chicken bowl", 450, 1299, true);
    let app = router(repo, MockAuthProvider::new_failing());

    let response = app
        .oneshot(get_with_session("/admin/meals", &create_token(user_id, 3600)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let meals: Vec<Meal> = json_body(response).await;
    // Admin listing includes retired meals.
    assert_eq!(meals.len(), 2);
}

#[tokio::test]
async fn authenticated_non_role_path_passes_for_any_role() {
    let user_id = Uuid::new_v4();
    let repo = MockRepo::with_profile(user_id, "u@fitbites.test", Role::StandardUser);
    let app = router(repo, MockAuthProvider::new_failing());

    let response = app
        .oneshot(get_with_session(
            "/health/summary?date=2026-08-20",
            &create_token(user_id, 3600),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn authenticated_path_passes_even_without_a_profile_row() {
    // Authenticated but role-less: "authenticated is sufficient" still holds.
    let user_id = Uuid::new_v4();
    let repo = MockRepo::default();
    repo.add_meal("Chicken bowl", 450, 1299, true);
    let app = router(repo, MockAuthProvider::new_failing());

    let response = app
        .oneshot(get_with_session("/meals", &create_token(user_id, 3600)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let meals: Vec<Meal> = json_body(response).await;
    assert_eq!(meals.len(), 1);
}

#[tokio::test]
async fn meals_listing_hides_retired_items() {
    let user_id = Uuid::new_v4();
    let repo = MockRepo::with_profile(user_id, "u@fitbites.test", Role::StandardUser);
    repo.add_meal("Chicken bowl", 450, 1299, true);
    repo.add_meal("Retired bowl", 800, 999, false);
    let app = router(repo, MockAuthProvider::new_failing());

    let response = app
        .oneshot(get_with_session("/meals", &create_token(user_id, 3600)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let meals: Vec<Meal> = json_body(response).await;
    assert_eq!(meals.len(), 1);
    assert_eq!(meals[0].name, "Chicken bowl");
}

#[tokio::test]
async fn expired_session_is_rotated_and_new_cookies_ride_the_response() {
    let user_id = Uuid::new_v4();
    let repo = MockRepo::with_profile(user_id, "u@fitbites.test", Role::StandardUser);
    let provider = MockAuthProvider::new(user_id, Some(fresh_tokens(user_id)));
    let app = router(repo, provider);

    let request = Request::builder()
        .uri("/me")
        .header(
            header::COOKIE,
            format!(
                "{}={}; {}={}",
                ACCESS_TOKEN_COOKIE,
                create_token(user_id, -300),
                REFRESH_TOKEN_COOKIE,
                "refresh-1"
            ),
        )
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookies: Vec<String> = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert!(
        set_cookies.iter().any(|c| c.starts_with(ACCESS_TOKEN_COOKIE)),
        "rotated access token must be set: {:?}",
        set_cookies
    );
    assert!(
        set_cookies.iter().any(|c| c.starts_with(REFRESH_TOKEN_COOKIE)),
        "rotated refresh token must be set: {:?}",
        set_cookies
    );

    let profile: Profile = json_body(response).await;
    assert_eq!(profile.id, user_id);
}

#[tokio::test]
async fn redirects_also_carry_rotated_session_cookies() {
    let user_id = Uuid::new_v4();
    // standard_user whose expired session gets rotated on an /admin request:
    // the outcome is still /unauthorized, but with fresh cookies attached.
    let repo = MockRepo::with_profile(user_id, "u@fitbites.test", Role::StandardUser);
    let provider = MockAuthProvider::new(user_id, Some(fresh_tokens(user_id)));
    let app = router(repo, provider);

    let request = Request::builder()
        .uri("/admin/stats")
        .header(
            header::COOKIE,
            format!(
                "{}={}; {}={}",
                ACCESS_TOKEN_COOKIE,
                create_token(user_id, -300),
                REFRESH_TOKEN_COOKIE,
                "refresh-1"
            ),
        )
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/unauthorized"
    );
    assert!(
        response.headers().get_all(header::SET_COOKIE).iter().count() >= 2,
        "redirect must carry the rotated cookies"
    );
}

#[tokio::test]
async fn sign_in_sets_session_cookies() {
    let user_id = Uuid::new_v4();
    let repo = MockRepo::with_profile(user_id, "u@fitbites.test", Role::StandardUser);
    let provider = MockAuthProvider::new(user_id, Some(fresh_tokens(user_id)));
    let app = router(repo, provider);

    let request = Request::builder()
        .method("POST")
        .uri("/auth/sign-in")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::json!({ "email": "u@fitbites.test", "password": "hunter2" }).to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookies: Vec<String> = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert!(set_cookies.iter().any(|c| c.starts_with(ACCESS_TOKEN_COOKIE)));
    assert!(set_cookies.iter().any(|c| c.contains("HttpOnly")));

    let tokens: SessionTokens = json_body(response).await;
    assert!(!tokens.access_token.is_empty());
}

#[tokio::test]
async fn sign_in_with_bad_credentials_is_unauthorized() {
    let app = router(MockRepo::default(), MockAuthProvider::new_failing());

    let request = Request::builder()
        .method("POST")
        .uri("/auth/sign-in")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::json!({ "email": "u@fitbites.test", "password": "wrong" }).to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn sign_up_mirrors_a_profile_row_with_the_provider_id() {
    let user_id = Uuid::new_v4();
    let provider = MockAuthProvider::new(user_id, None);
    let (app, state) = router_with_state(test_state(
        Env::Production,
        MockRepo::default(),
        provider,
    ));

    let request = Request::builder()
        .method("POST")
        .uri("/auth/sign-up")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::json!({ "email": "new@fitbites.test", "password": "hunter2" }).to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let profile: Profile = json_body(response).await;
    assert_eq!(profile.id, user_id);
    assert_eq!(profile.role, Role::StandardUser);

    // The mirrored row is really in the store.
    let stored = state.repo.get_profile(user_id).await.unwrap();
    assert_eq!(stored.email, "new@fitbites.test");
}

#[tokio::test]
async fn order_lifecycle_checkout_list_cancel() {
    let user_id = Uuid::new_v4();
    let repo = MockRepo::with_profile(user_id, "u@fitbites.test", Role::StandardUser);
    let meal = repo.add_meal("Chicken bowl", 450, 1299, true);
    let app = router(repo, MockAuthProvider::new_failing());
    let token = create_token(user_id, 3600);

    // Checkout two servings.
    let request = Request::builder()
        .method("POST")
        .uri("/orders")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::COOKIE, format!("{}={}", ACCESS_TOKEN_COOKIE, token))
        .body(Body::from(
            serde_json::json!({
                "items": [{ "meal_id": meal.id, "quantity": 2 }],
                "delivery_date": "2026-08-25"
            })
            .to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let order: fitbites_portal::models::Order = json_body(response).await;
    assert_eq!(order.total_cents, 2598);
    assert_eq!(order.status, "pending");

    // The order shows up in the caller's list.
    let response = app
        .clone()
        .oneshot(get_with_session("/orders", &token))
        .await
        .unwrap();
    let orders: Vec<fitbites_portal::models::Order> = json_body(response).await;
    assert_eq!(orders.len(), 1);

    // Cancel it.
    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/orders/{}", order.id))
        .header(header::COOKIE, format!("{}={}", ACCESS_TOKEN_COOKIE, token))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // A second cancel finds nothing pending.
    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/orders/{}", order.id))
        .header(header::COOKIE, format!("{}={}", ACCESS_TOKEN_COOKIE, token))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn empty_cart_is_rejected() {
    let user_id = Uuid::new_v4();
    let repo = MockRepo::with_profile(user_id, "u@fitbites.test", Role::StandardUser);
    let app = router(repo, MockAuthProvider::new_failing());

    let request = Request::builder()
        .method("POST")
        .uri("/orders")
        .header(header::CONTENT_TYPE, "application/json")
        .header(
            header::COOKIE,
            format!("{}={}", ACCESS_TOKEN_COOKIE, create_token(user_id, 3600)),
        )
        .body(Body::from(
            serde_json::json!({ "items": [], "delivery_date": "2026-08-25" }).to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_log_feeds_the_daily_summary() {
    let user_id = Uuid::new_v4();
    let repo = MockRepo::with_profile(user_id, "u@fitbites.test", Role::StandardUser);
    let app = router(repo, MockAuthProvider::new_failing());
    let token = create_token(user_id, 3600);

    for calories in [450, 550] {
        let request = Request::builder()
            .method("POST")
            .uri("/health/logs")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::COOKIE, format!("{}={}", ACCESS_TOKEN_COOKIE, token))
            .body(Body::from(
                serde_json::json!({
                    "log_date": "2026-08-20",
                    "meal_id": null,
                    "calories": calories,
                    "protein_g": 30,
                    "carbs_g": 40,
                    "fat_g": 15
                })
                .to_string(),
            ))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .oneshot(get_with_session("/health/summary?date=2026-08-20", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let summary: fitbites_portal::models::NutritionSummary = json_body(response).await;
    assert_eq!(summary.calories, 1000);
    assert_eq!(summary.protein_g, 60);
    assert_eq!(summary.entries, 2);
}

#[tokio::test]
async fn workout_streak_endpoint_reflects_logged_sessions() {
    let user_id = Uuid::new_v4();
    let repo = MockRepo::with_profile(user_id, "u@fitbites.test", Role::StandardUser);
    let app = router(repo, MockAuthProvider::new_failing());
    let token = create_token(user_id, 3600);

    let today = chrono::Utc::now().date_naive();
    for offset in [0i64, 1, 2] {
        let date = today - chrono::Duration::days(offset);
        let request = Request::builder()
            .method("POST")
            .uri("/workouts")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::COOKIE, format!("{}={}", ACCESS_TOKEN_COOKIE, token))
            .body(Body::from(
                serde_json::json!({
                    "workout_date": date,
                    "activity": "run",
                    "duration_min": 30,
                    "notes": null
                })
                .to_string(),
            ))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .oneshot(get_with_session("/workouts/streak", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let streak: fitbites_portal::models::WorkoutStreak = json_body(response).await;
    assert_eq!(streak.current_streak, 3);
    assert_eq!(streak.longest_streak, 3);
}

#[tokio::test]
async fn admin_can_retire_a_meal_and_it_leaves_the_menu() {
    let admin_id = Uuid::new_v4();
    let repo = MockRepo::with_profile(admin_id, "admin@fitbites.test", Role::Admin);
    let meal = repo.add_meal("Chicken bowl", 450, 1299, true);
    let app = router(repo, MockAuthProvider::new_failing());
    let token = create_token(admin_id, 3600);

    let request = Request::builder()
        .method("PUT")
        .uri(format!("/admin/meals/{}/status", meal.id))
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::COOKIE, format!("{}={}", ACCESS_TOKEN_COOKIE, token))
        .body(Body::from("false"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get_with_session("/meals", &token))
        .await
        .unwrap();
    let meals: Vec<Meal> = json_body(response).await;
    assert!(meals.is_empty(), "retired meal must leave the menu");
}

#[tokio::test]
async fn swagger_docs_are_reachable_without_a_session() {
    let app = router(MockRepo::default(), MockAuthProvider::new_failing());
    let response = app.oneshot(get("/api-docs/openapi.json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
