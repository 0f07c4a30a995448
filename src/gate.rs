//! Route Access Gate.
//!
//! Intercepts every incoming request, refreshes the caller's session, classifies
//! the requested path as public or protected, and for protected paths enforces
//! that the caller is authenticated and, for role-scoped path prefixes, holds
//! the matching role, redirecting otherwise.
//!
//! The decision logic lives in one pure function, [`classify`]. Two integration
//! points invoke it: the axum middleware adapter [`gate_middleware`] and the
//! directly callable [`check_request`] (which the middleware itself is a thin
//! wrapper around). Neither path ever raises a user-visible error: a failure to
//! reach the auth provider or the data store degrades the request to
//! "anonymous" / "no role" and routes it through the redirect branches.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use uuid::Uuid;

use crate::{
    AppState,
    auth::{self, CurrentUser},
    config::AppConfig,
    models::{Role, SessionTokens},
    provider::AuthState,
    repository::RepositoryState,
};

/// Redirect target for unauthenticated callers. The originally requested path is
/// preserved in the `redirectTo` query parameter.
pub const SIGN_IN_PATH: &str = "/sign-in";
/// Redirect target for authenticated callers whose role does not match a
/// role-scoped prefix. No `redirectTo` is attached.
pub const UNAUTHORIZED_PATH: &str = "/unauthorized";

/// RouteTable
///
/// The static partition of the URL path space, fixed at deployment time.
///
/// Configuration constraint: the role-scoped prefixes must be non-overlapping.
/// Prefixes are checked in the fixed order they are listed, so with disjoint
/// prefixes the iteration order cannot affect the outcome; the table is not
/// overlap-checked at runtime.
pub struct RouteTable {
    /// Public paths, matched exactly.
    pub public_paths: &'static [&'static str],
    /// Reserved authentication-callback prefix, matched by prefix rather
    /// than exactly like `public_paths`.
    pub auth_prefix: &'static str,
    /// Static-asset prefixes the gate skips entirely. Not security-relevant,
    /// purely to avoid running session refresh on asset requests.
    pub asset_prefixes: &'static [&'static str],
    /// Role-scoped path prefixes: each prefix maps to exactly one required role.
    pub role_prefixes: &'static [(&'static str, Role)],
}

/// The deployed route table.
pub const ROUTES: RouteTable = RouteTable {
    public_paths: &["/", "/sign-in", "/sign-up", "/unauthorized", "/healthz"],
    auth_prefix: "/auth",
    asset_prefixes: &[
        "/assets/",
        "/static/",
        "/favicon.ico",
        "/swagger-ui",
        "/api-docs",
    ],
    role_prefixes: &[
        ("/admin", Role::Admin),
        ("/trainer", Role::Trainer),
        ("/gym", Role::GymFranchise),
        ("/influencer", Role::Influencer),
    ],
};

impl RouteTable {
    /// Exact public match or the auth-callback prefix.
    pub fn is_public(&self, path: &str) -> bool {
        self.public_paths.contains(&path) || path.starts_with(self.auth_prefix)
    }

    /// Asset paths the gate does not run on at all.
    pub fn is_excluded(&self, path: &str) -> bool {
        self.asset_prefixes.iter().any(|p| path.starts_with(p))
    }

    /// The role required for this path, if it falls under a role-scoped prefix.
    pub fn required_role(&self, path: &str) -> Option<Role> {
        self.role_prefixes
            .iter()
            .find(|(prefix, _)| path.starts_with(prefix))
            .map(|(_, role)| *role)
    }
}

/// GateDecision
///
/// The outcome of classifying one request: let it through, or redirect it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    Redirect(String),
}

/// classify
///
/// The pure decision function of the gate. Given the request path, the resolved
/// identity and the resolved role, produce the decision:
///
/// 1. Excluded (asset) or public path → allow, regardless of session state.
/// 2. No identity → redirect to `/sign-in?redirectTo=<original path>`.
/// 3. Path under a role-scoped prefix and role ≠ required → redirect to
///    `/unauthorized`.
/// 4. Otherwise authenticated is sufficient → allow.
pub fn classify(
    table: &RouteTable,
    path: &str,
    identity: Option<Uuid>,
    role: Option<Role>,
) -> GateDecision {
    if table.is_excluded(path) || table.is_public(path) {
        return GateDecision::Allow;
    }

    if identity.is_none() {
        return GateDecision::Redirect(format!(
            "{}?redirectTo={}",
            SIGN_IN_PATH,
            urlencoding::encode(path)
        ));
    }

    if let Some(required) = table.required_role(path) {
        if role != Some(required) {
            return GateDecision::Redirect(UNAUTHORIZED_PATH.to_string());
        }
    }

    GateDecision::Allow
}

/// GateOutcome
///
/// Everything one gate invocation produced: the decision, the resolved identity
/// and role (for reuse downstream), and the rotated token pair that must ride on
/// the outgoing response, pass-through and redirect alike.
#[derive(Debug)]
pub struct GateOutcome {
    pub decision: GateDecision,
    pub user_id: Option<Uuid>,
    pub role: Option<Role>,
    pub refreshed: Option<SessionTokens>,
}

/// check_request
///
/// The directly callable integration point of the gate: one session refresh, one
/// role lookup, one classification. The middleware adapter delegates here, and it
/// can equally be invoked standalone with a request's path and cookie jar.
///
/// The role is looked up only for authenticated requests to non-public paths;
/// public short-circuits never touch the data store.
pub async fn check_request(
    config: &AppConfig,
    provider: &AuthState,
    repo: &RepositoryState,
    path: &str,
    jar: &CookieJar,
) -> GateOutcome {
    // Assets bypass even the session refresh.
    if ROUTES.is_excluded(path) {
        return GateOutcome {
            decision: GateDecision::Allow,
            user_id: None,
            role: None,
            refreshed: None,
        };
    }

    let session = auth::resolve_session(config, provider, jar).await;

    let role = match session.user_id {
        // Absence of a profile row is "no role" (None), not an error; the
        // repository also maps store failures to None, which lands this request
        // in the same branch per the gate's failure semantics.
        Some(user_id) if !ROUTES.is_public(path) => {
            repo.get_profile(user_id).await.map(|p| p.role)
        }
        _ => None,
    };

    GateOutcome {
        decision: classify(&ROUTES, path, session.user_id, role),
        user_id: session.user_id,
        role,
        refreshed: session.refreshed,
    }
}

/// gate_middleware
///
/// The framework-level interception hook: a thin adapter that feeds the request
/// into [`check_request`] and turns the outcome into a response. On pass-through
/// it stashes the resolved identity in the request extensions so the `AuthUser`
/// extractor does not validate or look anything up a second time. The rotated
/// session cookies are attached to every response, redirects included.
pub async fn gate_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();

    let outcome = check_request(&state.config, &state.auth, &state.repo, &path, &jar).await;

    // CookieJar only emits cookies added here, not the request's own.
    let jar = match &outcome.refreshed {
        Some(tokens) => {
            let [access, refresh] = auth::session_cookies(tokens);
            jar.add(access).add(refresh)
        }
        None => jar,
    };

    match outcome.decision {
        GateDecision::Allow => {
            if let Some(id) = outcome.user_id {
                request.extensions_mut().insert(CurrentUser {
                    id,
                    role: outcome.role,
                });
            }
            let response = next.run(request).await;
            (jar, response).into_response()
        }
        GateDecision::Redirect(location) => {
            tracing::debug!(path = %path, location = %location, "gate redirect");
            (jar, Redirect::temporary(&location)).into_response()
        }
    }
}
