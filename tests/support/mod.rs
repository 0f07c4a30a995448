#![allow(dead_code)]

//! Shared fixtures for the integration tests: an in-memory Repository, token
//! helpers, and application state builders. Everything here runs without
//! Postgres or a live auth provider.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use fitbites_portal::{
    AppState,
    auth::Claims,
    config::{AppConfig, Env},
    models::{
        AdminDashboardStats, CreateHealthLogRequest, CreateMealRequest, CreateOrderRequest,
        CreateWorkoutRequest, HealthLog, Meal, NutritionSummary, Order, Profile, Role,
        SessionTokens, UpdateMealRequest, Workout,
    },
    provider::MockAuthProvider,
    repository::Repository,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::{SystemTime, UNIX_EPOCH},
};
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";

/// Signs a token against the test secret. A negative `exp_offset` produces an
/// already-expired token (offset it past jsonwebtoken's 60s default leeway).
pub fn create_token(user_id: Uuid, exp_offset: i64) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;

    let claims = Claims {
        sub: user_id,
        iat: now as usize,
        exp: (now + exp_offset).max(0) as usize,
    };

    let key = EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes());
    encode(&Header::default(), &claims, &key).unwrap()
}

/// A token pair a mock provider can hand back from sign-in/refresh.
pub fn fresh_tokens(user_id: Uuid) -> SessionTokens {
    SessionTokens {
        access_token: create_token(user_id, 3600),
        refresh_token: format!("refresh-{}", Uuid::new_v4()),
        expires_in: 3600,
    }
}

/// MockRepo
///
/// In-memory implementation of the Repository trait. `fail_profiles` simulates
/// an unreachable data store for the gate's degradation tests.
#[derive(Default)]
pub struct MockRepo {
    pub profiles: Mutex<HashMap<Uuid, Profile>>,
    pub meals: Mutex<Vec<Meal>>,
    pub orders: Mutex<Vec<Order>>,
    pub health_logs: Mutex<Vec<HealthLog>>,
    pub workouts: Mutex<Vec<Workout>>,
    pub fail_profiles: bool,
}

impl MockRepo {
    pub fn with_profile(id: Uuid, email: &str, role: Role) -> Self {
        let repo = Self::default();
        repo.profiles.lock().unwrap().insert(
            id,
            Profile {
                id,
                email: email.to_string(),
                role,
            },
        );
        repo
    }

    pub fn add_meal(&self, name: &str, calories: i32, price_cents: i64, is_active: bool) -> Meal {
        let meal = Meal {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: format!("{} description", name),
            calories,
            protein_g: 20,
            carbs_g: 30,
            fat_g: 10,
            price_cents,
            is_active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.meals.lock().unwrap().push(meal.clone());
        meal
    }
}

#[async_trait]
impl Repository for MockRepo {
    async fn get_profile(&self, id: Uuid) -> Option<Profile> {
        if self.fail_profiles {
            return None;
        }
        self.profiles.lock().unwrap().get(&id).cloned()
    }

    async fn create_profile(&self, profile: Profile) -> Option<Profile> {
        self.profiles
            .lock()
            .unwrap()
            .insert(profile.id, profile.clone());
        Some(profile)
    }

    async fn list_active_meals(
        &self,
        search: Option<String>,
        max_calories: Option<i32>,
    ) -> Vec<Meal> {
        let needle = search.map(|s| s.to_lowercase());
        self.meals
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.is_active)
            .filter(|m| match &needle {
                Some(n) => {
                    m.name.to_lowercase().contains(n) || m.description.to_lowercase().contains(n)
                }
                None => true,
            })
            .filter(|m| max_calories.is_none_or(|cap| m.calories <= cap))
            .cloned()
            .collect()
    }

    async fn get_meal(&self, id: Uuid) -> Option<Meal> {
        self.meals
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.id == id && m.is_active)
            .cloned()
    }

    async fn list_all_meals(&self) -> Vec<Meal> {
        self.meals.lock().unwrap().clone()
    }

    async fn create_meal(&self, req: CreateMealRequest) -> Option<Meal> {
        let meal = Meal {
            id: Uuid::new_v4(),
            name: req.name,
            description: req.description,
            calories: req.calories,
            protein_g: req.protein_g,
            carbs_g: req.carbs_g,
            fat_g: req.fat_g,
            price_cents: req.price_cents,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.meals.lock().unwrap().push(meal.clone());
        Some(meal)
    }

    async fn update_meal(&self, id: Uuid, req: UpdateMealRequest) -> Option<Meal> {
        let mut meals = self.meals.lock().unwrap();
        let meal = meals.iter_mut().find(|m| m.id == id)?;
        if let Some(name) = req.name {
            meal.name = name;
        }
        if let Some(description) = req.description {
            meal.description = description;
        }
        if let Some(calories) = req.calories {
            meal.calories = calories;
        }
        if let Some(protein_g) = req.protein_g {
            meal.protein_g = protein_g;
        }
        if let Some(carbs_g) = req.carbs_g {
            meal.carbs_g = carbs_g;
        }
        if let Some(fat_g) = req.fat_g {
            meal.fat_g = fat_g;
        }
        if let Some(price_cents) = req.price_cents {
            meal.price_cents = price_cents;
        }
        meal.updated_at = Utc::now();
        Some(meal.clone())
    }

    async fn set_meal_status(&self, id: Uuid, is_active: bool) -> Option<Meal> {
        let mut meals = self.meals.lock().unwrap();
        let meal = meals.iter_mut().find(|m| m.id == id)?;
        meal.is_active = is_active;
        meal.updated_at = Utc::now();
        Some(meal.clone())
    }

    async fn create_order(&self, user_id: Uuid, req: CreateOrderRequest) -> Option<Order> {
        let mut total_cents: i64 = 0;
        {
            let meals = self.meals.lock().unwrap();
            for item in &req.items {
                let meal = meals.iter().find(|m| m.id == item.meal_id && m.is_active)?;
                total_cents += meal.price_cents * i64::from(item.quantity);
            }
        }

        let order = Order {
            id: Uuid::new_v4(),
            user_id,
            status: "pending".to_string(),
            delivery_date: req.delivery_date,
            total_cents,
            created_at: Utc::now(),
        };
        self.orders.lock().unwrap().push(order.clone());
        Some(order)
    }

    async fn get_my_orders(&self, user_id: Uuid) -> Vec<Order> {
        self.orders
            .lock()
            .unwrap()
            .iter()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect()
    }

    async fn cancel_order(&self, id: Uuid, user_id: Uuid) -> bool {
        let mut orders = self.orders.lock().unwrap();
        match orders
            .iter_mut()
            .find(|o| o.id == id && o.user_id == user_id && o.status == "pending")
        {
            Some(order) => {
                order.status = "cancelled".to_string();
                true
            }
            None => false,
        }
    }

    async fn list_all_orders(&self) -> Vec<Order> {
        self.orders.lock().unwrap().clone()
    }

    async fn add_health_log(
        &self,
        user_id: Uuid,
        req: CreateHealthLogRequest,
    ) -> Option<HealthLog> {
        let mut logs = self.health_logs.lock().unwrap();
        let log = HealthLog {
            id: logs.len() as i64 + 1,
            user_id,
            log_date: req.log_date,
            meal_id: req.meal_id,
            calories: req.calories,
            protein_g: req.protein_g,
            carbs_g: req.carbs_g,
            fat_g: req.fat_g,
            created_at: Utc::now(),
        };
        logs.push(log.clone());
        Some(log)
    }

    async fn nutrition_summary(&self, user_id: Uuid, date: NaiveDate) -> NutritionSummary {
        let logs = self.health_logs.lock().unwrap();
        let mut summary = NutritionSummary {
            log_date: date,
            ..Default::default()
        };
        for log in logs.iter().filter(|l| l.user_id == user_id && l.log_date == date) {
            summary.calories += i64::from(log.calories);
            summary.protein_g += i64::from(log.protein_g);
            summary.carbs_g += i64::from(log.carbs_g);
            summary.fat_g += i64::from(log.fat_g);
            summary.entries += 1;
        }
        summary
    }

    async fn log_workout(&self, user_id: Uuid, req: CreateWorkoutRequest) -> Option<Workout> {
        let mut workouts = self.workouts.lock().unwrap();
        let workout = Workout {
            id: workouts.len() as i64 + 1,
            user_id,
            workout_date: req.workout_date,
            activity: req.activity,
            duration_min: req.duration_min,
            notes: req.notes,
            created_at: Utc::now(),
        };
        workouts.push(workout.clone());
        Some(workout)
    }

    async fn get_workouts(&self, user_id: Uuid) -> Vec<Workout> {
        self.workouts
            .lock()
            .unwrap()
            .iter()
            .filter(|w| w.user_id == user_id)
            .cloned()
            .collect()
    }

    async fn workout_dates(&self, user_id: Uuid) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self
            .workouts
            .lock()
            .unwrap()
            .iter()
            .filter(|w| w.user_id == user_id)
            .map(|w| w.workout_date)
            .collect();
        dates.sort_unstable();
        dates.dedup();
        dates
    }

    async fn get_stats(&self) -> AdminDashboardStats {
        let meals = self.meals.lock().unwrap();
        let orders = self.orders.lock().unwrap();
        AdminDashboardStats {
            total_users: self.profiles.lock().unwrap().len() as i64,
            total_meals: meals.len() as i64,
            active_meals: meals.iter().filter(|m| m.is_active).count() as i64,
            total_orders: orders.len() as i64,
            pending_orders: orders.iter().filter(|o| o.status == "pending").count() as i64,
        }
    }
}

/// Assembles application state around the mocks, defaulting to Production so the
/// local development bypass stays inert unless a test opts in.
pub fn test_state(env: Env, repo: MockRepo, provider: MockAuthProvider) -> AppState {
    let mut config = AppConfig::default();
    config.env = env;
    config.jwt_secret = TEST_JWT_SECRET.to_string();

    AppState {
        repo: Arc::new(repo),
        auth: Arc::new(provider),
        config,
    }
}
