use crate::models::SessionTokens;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// AuthProvider
///
/// The abstract contract for all interactions with the external authentication
/// provider. This trait lets us swap the real HTTP client (SupabaseAuthClient)
/// for the in-memory MockAuthProvider during testing without touching the gate
/// or the handlers.
///
/// Every method is a single synchronous round-trip: no retries, no backoff.
/// Callers treat any `Err` as "anonymous" rather than surfacing a fault.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Registers a new identity with the provider and returns its canonical id.
    async fn sign_up(&self, email: &str, password: &str) -> Result<Uuid, String>;

    /// Exchanges email/password credentials for a session token pair.
    async fn sign_in(&self, email: &str, password: &str) -> Result<SessionTokens, String>;

    /// Rotates a session: exchanges a refresh token for a fresh token pair.
    async fn refresh_session(&self, refresh_token: &str) -> Result<SessionTokens, String>;
}

/// AuthState
///
/// The concrete type used to share the auth provider access across the application state.
pub type AuthState = Arc<dyn AuthProvider>;

/// Minimal struct to deserialize the provider's signup response, capturing the
/// newly created user's UUID for the mirrored profile row.
#[derive(Deserialize)]
struct SignUpResponse {
    id: Uuid,
}

/// SupabaseAuthClient
///
/// The concrete implementation over the Supabase GoTrue HTTP API. The same
/// client works against the local Dockerized stack and the hosted project;
/// only the base URL and API key differ.
#[derive(Clone)]
pub struct SupabaseAuthClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl SupabaseAuthClient {
    /// Constructs the client from the resolved AppConfig values.
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    async fn token_request(&self, grant_type: &str, body: serde_json::Value) -> Result<SessionTokens, String> {
        let url = format!("{}/auth/v1/token?grant_type={}", self.base_url, grant_type);

        let response = self
            .http
            .post(url)
            .header("apikey", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("token endpoint returned {}", response.status()));
        }

        response
            .json::<SessionTokens>()
            .await
            .map_err(|e| e.to_string())
    }
}

#[async_trait]
impl AuthProvider for SupabaseAuthClient {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Uuid, String> {
        let url = format!("{}/auth/v1/signup", self.base_url);

        let response = self
            .http
            .post(url)
            .header("apikey", &self.api_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            // Provider rejected the signup (duplicate email, weak password, ...).
            return Err(format!("signup endpoint returned {}", response.status()));
        }

        let user = response
            .json::<SignUpResponse>()
            .await
            .map_err(|e| e.to_string())?;

        Ok(user.id)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<SessionTokens, String> {
        self.token_request(
            "password",
            serde_json::json!({ "email": email, "password": password }),
        )
        .await
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<SessionTokens, String> {
        self.token_request(
            "refresh_token",
            serde_json::json!({ "refresh_token": refresh_token }),
        )
        .await
    }
}

/// MockAuthProvider
///
/// An in-memory implementation of `AuthProvider` used exclusively for testing.
/// It hands back a preconfigured token pair (or a simulated failure), letting
/// gate and handler tests run without a live provider.
#[derive(Clone, Default)]
pub struct MockAuthProvider {
    /// Identity returned from sign_up.
    pub signup_id: Uuid,
    /// Token pair returned from sign_in and refresh_session.
    pub tokens: Option<SessionTokens>,
    /// When true, all operations return a simulated failure.
    pub should_fail: bool,
}

impl MockAuthProvider {
    pub fn new(signup_id: Uuid, tokens: Option<SessionTokens>) -> Self {
        Self {
            signup_id,
            tokens,
            should_fail: false,
        }
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    fn tokens_or_err(&self) -> Result<SessionTokens, String> {
        if self.should_fail {
            return Err("Mock Auth Error: Simulation requested".to_string());
        }
        self.tokens
            .clone()
            .ok_or_else(|| "Mock Auth Error: no tokens configured".to_string())
    }
}

#[async_trait]
impl AuthProvider for MockAuthProvider {
    async fn sign_up(&self, _email: &str, _password: &str) -> Result<Uuid, String> {
        if self.should_fail {
            return Err("Mock Auth Error: Simulation requested".to_string());
        }
        Ok(self.signup_id)
    }

    async fn sign_in(&self, _email: &str, _password: &str) -> Result<SessionTokens, String> {
        self.tokens_or_err()
    }

    async fn refresh_session(&self, _refresh_token: &str) -> Result<SessionTokens, String> {
        self.tokens_or_err()
    }
}
