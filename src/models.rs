use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Identity & Access ---

/// Role
///
/// The closed set of roles an identity can hold, stored in the `role` column of
/// `public.profiles`. At most one role per identity at any time. The route gate
/// compares this value against the role-scoped path prefixes; modelling it as an
/// enum (rather than a free string) makes an unhandled role a compile-time gap.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, sqlx::Type, Default,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[ts(export)]
pub enum Role {
    #[default]
    StandardUser,
    Admin,
    Trainer,
    GymFranchise,
    Influencer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::StandardUser => "standard_user",
            Role::Admin => "admin",
            Role::Trainer => "trainer",
            Role::GymFranchise => "gym_franchise",
            Role::Influencer => "influencer",
        }
    }
}

/// Profile
///
/// The user's canonical identity record in the `public.profiles` table, mirroring
/// the provider-owned `auth.users` row. The id is immutable after sign-up.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Profile {
    // Primary Key, also the Foreign Key to the external auth.users table.
    pub id: Uuid,
    pub email: String,
    // Mutated only by privileged administrative action; read-only everywhere else.
    pub role: Role,
}

/// SessionTokens
///
/// The renewable credential pair issued by the auth provider: a short-lived access
/// token (JWT) and the refresh token used to rotate it. Deserialized directly from
/// the provider's token endpoint response.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds, as reported by the provider.
    pub expires_in: i64,
}

// --- Menu ---

/// Meal
///
/// A menu item from the `public.meals` table. Retired meals keep their rows
/// (`is_active=false`) so historical orders stay resolvable.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Meal {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    // Per-serving macros.
    pub calories: i32,
    pub protein_g: i32,
    pub carbs_g: i32,
    pub fat_g: i32,
    pub price_cents: i64,
    // Controls menu visibility (enforced at the Repository layer).
    pub is_active: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// CreateMealRequest
///
/// Input payload for adding a menu item (POST /admin/meals).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateMealRequest {
    pub name: String,
    pub description: String,
    pub calories: i32,
    pub protein_g: i32,
    pub carbs_g: i32,
    pub fat_g: i32,
    pub price_cents: i64,
}

/// UpdateMealRequest
///
/// Partial update payload for a menu item (PUT /admin/meals/{id}).
/// All fields optional; only provided fields are written (COALESCE in SQL).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateMealRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub calories: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub protein_g: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub carbs_g: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fat_g: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_cents: Option<i64>,
}

// --- Orders ---

/// OrderItemRequest
///
/// One line of a checkout: a meal and how many servings of it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct OrderItemRequest {
    pub meal_id: Uuid,
    pub quantity: i32,
}

/// CreateOrderRequest
///
/// Checkout payload (POST /orders). The client-side cart is flattened into this
/// list at checkout; the cart itself is never stored server-side.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateOrderRequest {
    pub items: Vec<OrderItemRequest>,
    #[ts(type = "string")]
    pub delivery_date: NaiveDate,
}

/// Order
///
/// An order header from the `public.orders` table. Line items live in
/// `public.order_items`; the header carries the computed total.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    // 'pending' | 'cancelled' | 'delivered'
    pub status: String,
    #[ts(type = "string")]
    pub delivery_date: NaiveDate,
    pub total_cents: i64,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

// --- Health / Nutrition ---

/// CreateHealthLogRequest
///
/// Input payload for logging consumed macros for a date (POST /health/logs).
/// `meal_id` is set when the entry came from an ordered meal; manual entries
/// leave it empty and supply macros directly.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateHealthLogRequest {
    #[ts(type = "string")]
    pub log_date: NaiveDate,
    pub meal_id: Option<Uuid>,
    pub calories: i32,
    pub protein_g: i32,
    pub carbs_g: i32,
    pub fat_g: i32,
}

/// HealthLog
///
/// A row of the `public.health_logs` table, owner-scoped by `user_id`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct HealthLog {
    pub id: i64,
    pub user_id: Uuid,
    #[ts(type = "string")]
    pub log_date: NaiveDate,
    pub meal_id: Option<Uuid>,
    pub calories: i32,
    pub protein_g: i32,
    pub carbs_g: i32,
    pub fat_g: i32,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// NutritionSummary
///
/// Per-day nutrition totals for the dashboard (GET /health/summary).
/// Sums are i64 because SQL SUM over int4 widens to int8.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct NutritionSummary {
    #[ts(type = "string")]
    pub log_date: NaiveDate,
    pub calories: i64,
    pub protein_g: i64,
    pub carbs_g: i64,
    pub fat_g: i64,
    /// Number of log entries contributing to the totals.
    pub entries: i64,
}

// --- Workouts ---

/// CreateWorkoutRequest
///
/// Input payload for logging a workout session (POST /workouts).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateWorkoutRequest {
    #[ts(type = "string")]
    pub workout_date: NaiveDate,
    pub activity: String,
    pub duration_min: i32,
    pub notes: Option<String>,
}

/// Workout
///
/// A row of the `public.workouts` table, owner-scoped by `user_id`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Workout {
    pub id: i64,
    pub user_id: Uuid,
    #[ts(type = "string")]
    pub workout_date: NaiveDate,
    pub activity: String,
    pub duration_min: i32,
    pub notes: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// WorkoutStreak
///
/// Output of the streak computation (GET /workouts/streak). Multiple workouts on
/// one day count once; a streak is unbroken while it ends today or yesterday.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct WorkoutStreak {
    pub current_streak: i64,
    pub longest_streak: i64,
    #[ts(type = "string | null")]
    pub last_workout_date: Option<NaiveDate>,
}

impl WorkoutStreak {
    /// Computes both streaks from the user's distinct workout dates.
    ///
    /// `today` is passed in rather than read from the clock so the computation is
    /// pure; the handler supplies `Utc::now().date_naive()`.
    pub fn from_dates(dates: &[NaiveDate], today: NaiveDate) -> Self {
        let mut days: Vec<NaiveDate> = dates.to_vec();
        days.sort_unstable();
        days.dedup();

        if days.is_empty() {
            return Self::default();
        }

        let mut longest: i64 = 1;
        let mut run: i64 = 1;
        for pair in days.windows(2) {
            if pair[1] - pair[0] == chrono::Duration::days(1) {
                run += 1;
            } else {
                run = 1;
            }
            longest = longest.max(run);
        }

        let last = days[days.len() - 1];
        // The trailing run only counts as "current" if it reaches today or yesterday.
        let current = if today - last <= chrono::Duration::days(1) {
            run
        } else {
            0
        };

        Self {
            current_streak: current,
            longest_streak: longest,
            last_workout_date: Some(last),
        }
    }
}

// --- Auth Flow Payloads ---

/// SignUpRequest
///
/// Input payload for the public registration endpoint (POST /auth/sign-up).
/// The password is only passed through to the external auth provider and never
/// persisted or logged by this application.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
}

/// SignInRequest
///
/// Input payload for the password-grant sign-in endpoint (POST /auth/sign-in).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

// --- Dashboard Schemas ---

/// AdminDashboardStats
///
/// Output schema for the administrative statistics dashboard (GET /admin/stats).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AdminDashboardStats {
    pub total_users: i64,
    pub total_meals: i64,
    /// Meals currently on the menu (`is_active=true`).
    pub active_meals: i64,
    pub total_orders: i64,
    /// Orders not yet delivered or cancelled.
    pub pending_orders: i64,
}
