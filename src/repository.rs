use crate::models::{
    AdminDashboardStats, CreateHealthLogRequest, CreateMealRequest, CreateOrderRequest,
    CreateWorkoutRequest, HealthLog, Meal, NutritionSummary, Order, Profile, UpdateMealRequest,
    Workout,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Row, query_builder::QueryBuilder};
use std::sync::Arc;
use uuid::Uuid;

/// Repository Trait
///
/// The abstract contract for all persistence operations, letting handlers and the
/// route gate talk to the data layer without knowing the concrete implementation
/// (Postgres in production, mocks in tests).
///
/// Every read or write of user-owned data (orders, health logs, workouts) binds the
/// caller's id in the query itself, so ownership is enforced at this layer rather
/// than in each handler.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Profiles / Roles ---
    // Single role lookup used by the route gate. A missing row means "no role",
    // never an error; infrastructure failures degrade to None the same way.
    async fn get_profile(&self, id: Uuid) -> Option<Profile>;
    async fn create_profile(&self, profile: Profile) -> Option<Profile>;

    // --- Menu ---
    // Browsing: active meals only, with optional search and calorie cap.
    async fn list_active_meals(&self, search: Option<String>, max_calories: Option<i32>)
    -> Vec<Meal>;
    // Detail view: only resolves meals still on the menu.
    async fn get_meal(&self, id: Uuid) -> Option<Meal>;
    // Admin access: the full menu, retired meals included.
    async fn list_all_meals(&self) -> Vec<Meal>;
    async fn create_meal(&self, req: CreateMealRequest) -> Option<Meal>;
    // Partial update via COALESCE; only provided fields change.
    async fn update_meal(&self, id: Uuid, req: UpdateMealRequest) -> Option<Meal>;
    // Admin action: put a meal on or off the menu.
    async fn set_meal_status(&self, id: Uuid, is_active: bool) -> Option<Meal>;

    // --- Orders ---
    // Checkout: inserts the header and all lines in one transaction, pricing
    // against the current menu. Any inactive/unknown meal aborts the whole order.
    async fn create_order(&self, user_id: Uuid, req: CreateOrderRequest) -> Option<Order>;
    async fn get_my_orders(&self, user_id: Uuid) -> Vec<Order>;
    // Owner-Only: cancels only the caller's own order, and only while pending.
    async fn cancel_order(&self, id: Uuid, user_id: Uuid) -> bool;
    // Admin access: all orders regardless of owner.
    async fn list_all_orders(&self) -> Vec<Order>;

    // --- Health / Nutrition ---
    async fn add_health_log(&self, user_id: Uuid, req: CreateHealthLogRequest)
    -> Option<HealthLog>;
    // One SUM aggregation per day for the dashboard.
    async fn nutrition_summary(&self, user_id: Uuid, date: NaiveDate) -> NutritionSummary;

    // --- Workouts ---
    async fn log_workout(&self, user_id: Uuid, req: CreateWorkoutRequest) -> Option<Workout>;
    async fn get_workouts(&self, user_id: Uuid) -> Vec<Workout>;
    // Distinct workout dates feeding the streak computation.
    async fn workout_dates(&self, user_id: Uuid) -> Vec<NaiveDate>;

    // --- Admin Dashboard ---
    async fn get_stats(&self) -> AdminDashboardStats;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer access across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const MEAL_COLUMNS: &str = "id, name, description, calories, protein_g, carbs_g, fat_g, \
                            price_cents, is_active, created_at, updated_at";

const ORDER_COLUMNS: &str = "id, user_id, status, delivery_date, total_cents, created_at";

#[async_trait]
impl Repository for PostgresRepository {
    /// Role/identity lookup for authentication and the route gate.
    /// Database errors are swallowed into None so a flaky store degrades the caller
    /// to "no role" instead of failing every request.
    async fn get_profile(&self, id: Uuid) -> Option<Profile> {
        sqlx::query_as::<_, Profile>("SELECT id, email, role FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_profile error: {:?}", e);
                None
            })
    }

    /// Creates the mirroring profile record in `public.profiles` after external auth success.
    async fn create_profile(&self, profile: Profile) -> Option<Profile> {
        sqlx::query_as::<_, Profile>(
            "INSERT INTO profiles (id, email, role) VALUES ($1, $2, $3) RETURNING id, email, role",
        )
        .bind(profile.id)
        .bind(profile.email)
        .bind(profile.role)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("create_profile error: {:?}", e);
            None
        })
    }

    /// Implements flexible menu filtering with QueryBuilder for safe parameterization.
    /// Strictly enforces `WHERE is_active = true` in the base query.
    async fn list_active_meals(
        &self,
        search: Option<String>,
        max_calories: Option<i32>,
    ) -> Vec<Meal> {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(format!(
            "SELECT {MEAL_COLUMNS} FROM meals WHERE is_active = true"
        ));

        if let Some(s) = search {
            // Case-insensitive search across name and description.
            let pattern = format!("%{}%", s);
            builder.push(" AND (name ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" OR description ILIKE ");
            builder.push_bind(pattern);
            builder.push(")");
        }

        if let Some(cap) = max_calories {
            builder.push(" AND calories <= ");
            builder.push_bind(cap);
        }

        builder.push(" ORDER BY name ASC");

        match builder.build_query_as::<Meal>().fetch_all(&self.pool).await {
            Ok(m) => m,
            Err(e) => {
                tracing::error!("list_active_meals error: {:?}", e);
                vec![]
            }
        }
    }

    /// Retrieves a meal *only* if it is still on the menu. Used by the browsing detail handler.
    async fn get_meal(&self, id: Uuid) -> Option<Meal> {
        sqlx::query_as::<_, Meal>(&format!(
            "SELECT {MEAL_COLUMNS} FROM meals WHERE id = $1 AND is_active = true"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_meal error: {:?}", e);
            None
        })
    }

    /// Administrative listing of every meal record, retired meals first-class.
    async fn list_all_meals(&self) -> Vec<Meal> {
        match sqlx::query_as::<_, Meal>(&format!(
            "SELECT {MEAL_COLUMNS} FROM meals ORDER BY is_active DESC, name ASC"
        ))
        .fetch_all(&self.pool)
        .await
        {
            Ok(m) => m,
            Err(e) => {
                tracing::error!("list_all_meals error: {:?}", e);
                vec![]
            }
        }
    }

    /// Inserts a new menu item. New meals go live immediately (`is_active = true`).
    async fn create_meal(&self, req: CreateMealRequest) -> Option<Meal> {
        sqlx::query_as::<_, Meal>(&format!(
            "INSERT INTO meals (id, name, description, calories, protein_g, carbs_g, fat_g, \
             price_cents, is_active, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, true, NOW(), NOW()) \
             RETURNING {MEAL_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(req.name)
        .bind(req.description)
        .bind(req.calories)
        .bind(req.protein_g)
        .bind(req.carbs_g)
        .bind(req.fat_g)
        .bind(req.price_cents)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("create_meal error: {:?}", e);
            None
        })
    }

    /// Partial update using COALESCE so only provided fields change.
    async fn update_meal(&self, id: Uuid, req: UpdateMealRequest) -> Option<Meal> {
        sqlx::query_as::<_, Meal>(&format!(
            "UPDATE meals \
             SET name = COALESCE($2, name), \
                 description = COALESCE($3, description), \
                 calories = COALESCE($4, calories), \
                 protein_g = COALESCE($5, protein_g), \
                 carbs_g = COALESCE($6, carbs_g), \
                 fat_g = COALESCE($7, fat_g), \
                 price_cents = COALESCE($8, price_cents), \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {MEAL_COLUMNS}"
        ))
        .bind(id)
        .bind(req.name)
        .bind(req.description)
        .bind(req.calories)
        .bind(req.protein_g)
        .bind(req.carbs_g)
        .bind(req.fat_g)
        .bind(req.price_cents)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("update_meal error: {:?}", e);
            None
        })
    }

    /// Flips the `is_active` flag. Used by the admin status update handler.
    async fn set_meal_status(&self, id: Uuid, is_active: bool) -> Option<Meal> {
        sqlx::query_as::<_, Meal>(&format!(
            "UPDATE meals SET is_active = $2, updated_at = NOW() WHERE id = $1 \
             RETURNING {MEAL_COLUMNS}"
        ))
        .bind(id)
        .bind(is_active)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("set_meal_status error: {:?}", e);
            None
        })
    }

    /// Checkout. The order header and all line items are written in one transaction,
    /// priced against the active menu at insert time. Any unknown or retired meal in
    /// the cart rolls the whole order back.
    async fn create_order(&self, user_id: Uuid, req: CreateOrderRequest) -> Option<Order> {
        let mut tx = match self.pool.begin().await {
            Ok(tx) => tx,
            Err(e) => {
                tracing::error!("create_order begin error: {:?}", e);
                return None;
            }
        };

        let order_id = Uuid::new_v4();
        let mut total_cents: i64 = 0;

        for item in &req.items {
            let price: Option<i64> = match sqlx::query(
                "SELECT price_cents FROM meals WHERE id = $1 AND is_active = true",
            )
            .bind(item.meal_id)
            .fetch_optional(&mut *tx)
            .await
            {
                Ok(row) => row.map(|r| r.get("price_cents")),
                Err(e) => {
                    tracing::error!("create_order price lookup error: {:?}", e);
                    return None;
                }
            };

            let Some(unit_price) = price else {
                // Cart references a meal that is gone from the menu; abort the order.
                return None;
            };

            total_cents += unit_price * i64::from(item.quantity);

            if let Err(e) = sqlx::query(
                "INSERT INTO order_items (order_id, meal_id, quantity, unit_price_cents) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(order_id)
            .bind(item.meal_id)
            .bind(item.quantity)
            .bind(unit_price)
            .execute(&mut *tx)
            .await
            {
                tracing::error!("create_order item insert error: {:?}", e);
                return None;
            }
        }

        let order = match sqlx::query_as::<_, Order>(&format!(
            "INSERT INTO orders (id, user_id, status, delivery_date, total_cents, created_at) \
             VALUES ($1, $2, 'pending', $3, $4, NOW()) \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(order_id)
        .bind(user_id)
        .bind(req.delivery_date)
        .bind(total_cents)
        .fetch_one(&mut *tx)
        .await
        {
            Ok(o) => o,
            Err(e) => {
                tracing::error!("create_order header insert error: {:?}", e);
                return None;
            }
        };

        match tx.commit().await {
            Ok(()) => Some(order),
            Err(e) => {
                tracing::error!("create_order commit error: {:?}", e);
                None
            }
        }
    }

    /// Retrieves all orders placed by the authenticated user, newest first.
    async fn get_my_orders(&self, user_id: Uuid) -> Vec<Order> {
        match sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        {
            Ok(o) => o,
            Err(e) => {
                tracing::error!("get_my_orders error: {:?}", e);
                vec![]
            }
        }
    }

    /// Cancels an order only if the caller owns it and it is still pending.
    async fn cancel_order(&self, id: Uuid, user_id: Uuid) -> bool {
        match sqlx::query(
            "UPDATE orders SET status = 'cancelled' \
             WHERE id = $1 AND user_id = $2 AND status = 'pending'",
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("cancel_order error: {:?}", e);
                false
            }
        }
    }

    /// Administrative listing of every order in the system.
    async fn list_all_orders(&self) -> Vec<Order> {
        match sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        {
            Ok(o) => o,
            Err(e) => {
                tracing::error!("list_all_orders error: {:?}", e);
                vec![]
            }
        }
    }

    /// Inserts a nutrition log entry for the caller.
    async fn add_health_log(
        &self,
        user_id: Uuid,
        req: CreateHealthLogRequest,
    ) -> Option<HealthLog> {
        sqlx::query_as::<_, HealthLog>(
            "INSERT INTO health_logs (user_id, log_date, meal_id, calories, protein_g, carbs_g, \
             fat_g, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, NOW()) \
             RETURNING id, user_id, log_date, meal_id, calories, protein_g, carbs_g, fat_g, \
             created_at",
        )
        .bind(user_id)
        .bind(req.log_date)
        .bind(req.meal_id)
        .bind(req.calories)
        .bind(req.protein_g)
        .bind(req.carbs_g)
        .bind(req.fat_g)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("add_health_log error: {:?}", e);
            None
        })
    }

    /// Compiles the per-day nutrition totals in a single aggregation query.
    /// A day with no entries returns zeroed totals rather than an error.
    async fn nutrition_summary(&self, user_id: Uuid, date: NaiveDate) -> NutritionSummary {
        let row = sqlx::query(
            "SELECT COALESCE(SUM(calories), 0) AS calories, \
                    COALESCE(SUM(protein_g), 0) AS protein_g, \
                    COALESCE(SUM(carbs_g), 0) AS carbs_g, \
                    COALESCE(SUM(fat_g), 0) AS fat_g, \
                    COUNT(*) AS entries \
             FROM health_logs WHERE user_id = $1 AND log_date = $2",
        )
        .bind(user_id)
        .bind(date)
        .fetch_one(&self.pool)
        .await;

        match row {
            Ok(r) => NutritionSummary {
                log_date: date,
                calories: r.get("calories"),
                protein_g: r.get("protein_g"),
                carbs_g: r.get("carbs_g"),
                fat_g: r.get("fat_g"),
                entries: r.get("entries"),
            },
            Err(e) => {
                tracing::error!("nutrition_summary error: {:?}", e);
                NutritionSummary {
                    log_date: date,
                    ..Default::default()
                }
            }
        }
    }

    /// Inserts a workout session for the caller.
    async fn log_workout(&self, user_id: Uuid, req: CreateWorkoutRequest) -> Option<Workout> {
        sqlx::query_as::<_, Workout>(
            "INSERT INTO workouts (user_id, workout_date, activity, duration_min, notes, \
             created_at) \
             VALUES ($1, $2, $3, $4, $5, NOW()) \
             RETURNING id, user_id, workout_date, activity, duration_min, notes, created_at",
        )
        .bind(user_id)
        .bind(req.workout_date)
        .bind(req.activity)
        .bind(req.duration_min)
        .bind(req.notes)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("log_workout error: {:?}", e);
            None
        })
    }

    /// Retrieves the caller's workout history, newest first.
    async fn get_workouts(&self, user_id: Uuid) -> Vec<Workout> {
        match sqlx::query_as::<_, Workout>(
            "SELECT id, user_id, workout_date, activity, duration_min, notes, created_at \
             FROM workouts WHERE user_id = $1 ORDER BY workout_date DESC, created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        {
            Ok(w) => w,
            Err(e) => {
                tracing::error!("get_workouts error: {:?}", e);
                vec![]
            }
        }
    }

    /// Distinct workout dates for the streak computation. Duplicates within a day
    /// are collapsed here so the streak logic sees each day once.
    async fn workout_dates(&self, user_id: Uuid) -> Vec<NaiveDate> {
        match sqlx::query(
            "SELECT DISTINCT workout_date FROM workouts WHERE user_id = $1 \
             ORDER BY workout_date ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        {
            Ok(rows) => rows.iter().map(|r| r.get("workout_date")).collect(),
            Err(e) => {
                tracing::error!("workout_dates error: {:?}", e);
                vec![]
            }
        }
    }

    /// Compiles all counters for the administrative dashboard in a single call.
    async fn get_stats(&self) -> AdminDashboardStats {
        let count = |sql: &'static str| {
            let pool = self.pool.clone();
            async move {
                sqlx::query_scalar::<_, i64>(sql)
                    .fetch_one(&pool)
                    .await
                    .unwrap_or(0)
            }
        };

        AdminDashboardStats {
            total_users: count("SELECT COUNT(*) FROM profiles").await,
            total_meals: count("SELECT COUNT(*) FROM meals").await,
            active_meals: count("SELECT COUNT(*) FROM meals WHERE is_active = true").await,
            total_orders: count("SELECT COUNT(*) FROM orders").await,
            pending_orders: count("SELECT COUNT(*) FROM orders WHERE status = 'pending'").await,
        }
    }
}
