use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, request::Parts},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{
    DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    models::{Role, SessionTokens},
    provider::AuthState,
    repository::RepositoryState,
};

/// Cookie carrying the short-lived access token (a provider-signed JWT).
pub const ACCESS_TOKEN_COOKIE: &str = "sb-access-token";
/// Cookie carrying the long-lived refresh token used to rotate the session.
pub const REFRESH_TOKEN_COOKIE: &str = "sb-refresh-token";

/// Seconds of remaining validity below which the gate rotates the session
/// proactively instead of letting the access token lapse mid-browsing.
const REFRESH_LEEWAY_SECS: usize = 60;

/// Claims
///
/// The payload structure expected inside a session access token. These claims are
/// signed by the auth provider's secret and validated on every request.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the user's UUID, the key into `public.profiles`.
    pub sub: Uuid,
    /// Expiration Time (exp): timestamp after which the token must not be accepted.
    pub exp: usize,
    /// Issued At (iat): timestamp when the token was issued.
    pub iat: usize,
}

/// CurrentUser
///
/// The identity the route gate resolved for this request, stashed in the request
/// extensions so handlers (via the `AuthUser` extractor) reuse the gate's single
/// session validation and role lookup instead of repeating them.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    /// None when the profile row is missing ("no role", not an error).
    pub role: Option<Role>,
}

/// ResolvedSession
///
/// Outcome of one session-refresh pass: the identity (if any) and the rotated
/// token pair (if a rotation happened) that must be attached to the response.
#[derive(Debug, Default)]
pub struct ResolvedSession {
    pub user_id: Option<Uuid>,
    pub refreshed: Option<SessionTokens>,
}

fn unix_now() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as usize)
        .unwrap_or(0)
}

/// Decodes and validates an access token against the shared provider secret.
/// Expiration validation is always active.
pub fn decode_access_token(
    secret: &str,
    token: &str,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::default();
    validation.validate_exp = true;

    decode::<Claims>(token, &decoding_key, &validation).map(|data| data.claims)
}

/// Signs a fresh access token for `sub`. Used by the mock provider path in local
/// development and by tests; production tokens come from the external provider.
pub fn issue_access_token(
    secret: &str,
    sub: Uuid,
    ttl_secs: usize,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = unix_now();
    let claims = Claims {
        sub,
        iat: now,
        exp: now + ttl_secs,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Builds the pair of session cookies for a freshly issued token pair.
/// HttpOnly + Lax on both: the tokens are never script-visible.
pub fn session_cookies(tokens: &SessionTokens) -> [Cookie<'static>; 2] {
    [
        session_cookie(ACCESS_TOKEN_COOKIE, tokens.access_token.clone()),
        session_cookie(REFRESH_TOKEN_COOKIE, tokens.refresh_token.clone()),
    ]
}

fn session_cookie(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Removal cookies for sign-out. Paths must match the ones the session cookies
/// were set with, or browsers will keep the originals.
pub fn clear_session_cookies(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(ACCESS_TOKEN_COOKIE).path("/").build())
        .remove(Cookie::build(REFRESH_TOKEN_COOKIE).path("/").build())
}

/// resolve_session
///
/// One session-refresh pass, exactly one per request:
/// - A valid access token far from expiry resolves the identity as-is.
/// - A valid token near expiry is rotated through the provider when a refresh
///   token is present; if the rotation fails the still-valid identity is kept.
/// - An expired token (or no access token at all) is rotated if possible,
///   otherwise the caller is anonymous.
///
/// Every failure mode (absent cookies, malformed token, provider unreachable)
/// degrades to "anonymous". This function never returns an error: the gate runs
/// on every request and an unhandled fault here would take down all routing.
pub async fn resolve_session(
    config: &AppConfig,
    provider: &AuthState,
    jar: &CookieJar,
) -> ResolvedSession {
    let access = jar.get(ACCESS_TOKEN_COOKIE).map(|c| c.value().to_owned());
    let refresh = jar.get(REFRESH_TOKEN_COOKIE).map(|c| c.value().to_owned());

    match access.as_deref().map(|t| decode_access_token(&config.jwt_secret, t)) {
        Some(Ok(claims)) => {
            if claims.exp > unix_now() + REFRESH_LEEWAY_SECS {
                return ResolvedSession {
                    user_id: Some(claims.sub),
                    refreshed: None,
                };
            }
            // Near expiry: rotate if we can, keep the still-valid identity if not.
            match try_refresh(config, provider, refresh.as_deref()).await {
                Some((sub, tokens)) => ResolvedSession {
                    user_id: Some(sub),
                    refreshed: Some(tokens),
                },
                None => ResolvedSession {
                    user_id: Some(claims.sub),
                    refreshed: None,
                },
            }
        }
        Some(Err(e)) if matches!(e.kind(), ErrorKind::ExpiredSignature) => {
            match try_refresh(config, provider, refresh.as_deref()).await {
                Some((sub, tokens)) => ResolvedSession {
                    user_id: Some(sub),
                    refreshed: Some(tokens),
                },
                None => ResolvedSession::default(),
            }
        }
        // Malformed or tampered token: anonymous, not a fault.
        Some(Err(_)) => ResolvedSession::default(),
        // No access token; a refresh token alone can still restore the session.
        None => match try_refresh(config, provider, refresh.as_deref()).await {
            Some((sub, tokens)) => ResolvedSession {
                user_id: Some(sub),
                refreshed: Some(tokens),
            },
            None => ResolvedSession::default(),
        },
    }
}

/// Single refresh attempt against the provider. Returns the identity decoded from
/// the new access token along with the rotated pair, or None on any failure.
async fn try_refresh(
    config: &AppConfig,
    provider: &AuthState,
    refresh_token: Option<&str>,
) -> Option<(Uuid, SessionTokens)> {
    let token = refresh_token?;

    let tokens = match provider.refresh_session(token).await {
        Ok(tokens) => tokens,
        Err(e) => {
            tracing::debug!("session refresh failed: {}", e);
            return None;
        }
    };

    match decode_access_token(&config.jwt_secret, &tokens.access_token) {
        Ok(claims) => Some((claims.sub, tokens)),
        Err(e) => {
            tracing::warn!("provider returned an undecodable access token: {:?}", e);
            None
        }
    }
}

/// AuthUser
///
/// The resolved identity of an authenticated request. Handlers take this as an
/// argument to retrieve the caller's id and role for ownership and RBAC checks.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    /// None when the identity has no profile row yet.
    pub role: Option<Role>,
}

/// AuthUser Extractor Implementation
///
/// Resolution order:
/// 1. The `CurrentUser` extension left by the route gate (the common path:
///    one validation and one role lookup per request, both done by the gate).
/// 2. Local Development Bypass via the 'x-user-id' header, guarded by `Env::Local`.
/// 3. Direct cookie validation, for call sites not running behind the gate
///    (API clients hitting a handler in tests, for example).
///
/// Rejection: StatusCode::UNAUTHORIZED (401) on any failure.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // 1. Gate-resolved identity.
        if let Some(current) = parts.extensions.get::<CurrentUser>() {
            return Ok(AuthUser {
                id: current.id,
                role: current.role,
            });
        }

        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        // 2. Local Development Bypass Check.
        // In Env::Local a known UUID in 'x-user-id' authenticates directly, provided
        // it maps to an actual profile so the role is loaded from real data.
        if config.env == Env::Local {
            if let Some(user_id_header) = parts.headers.get("x-user-id") {
                if let Ok(id_str) = user_id_header.to_str() {
                    if let Ok(user_id) = Uuid::parse_str(id_str) {
                        if let Some(profile) = repo.get_profile(user_id).await {
                            return Ok(AuthUser {
                                id: profile.id,
                                role: Some(profile.role),
                            });
                        }
                    }
                }
            }
        }

        // 3. Cookie validation. CookieJar extraction is infallible.
        let jar = CookieJar::from_request_parts(parts, state)
            .await
            .map_err(|_| StatusCode::UNAUTHORIZED)?;

        let token = jar
            .get(ACCESS_TOKEN_COOKIE)
            .map(|c| c.value().to_owned())
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let claims =
            decode_access_token(&config.jwt_secret, &token).map_err(|_| StatusCode::UNAUTHORIZED)?;

        // A missing profile row is "no role", not a rejection: the identity is
        // still authenticated, it just cannot pass any role-scoped check.
        let role = repo.get_profile(claims.sub).await.map(|p| p.role);

        Ok(AuthUser {
            id: claims.sub,
            role,
        })
    }
}
