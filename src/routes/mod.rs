/// Router Module Index
///
/// Organizes the routing surface into the same tiers the route gate enforces on
/// the path space, so the access policy is visible in the module structure:
/// public, authenticated, and role-scoped (admin).

/// Routes on public paths: landing pages, health check, and the auth flows
/// under the reserved `/auth` prefix.
pub mod public;

/// Routes that require a validated session but no particular role: browsing,
/// ordering, the nutrition dashboard, and workout tracking.
pub mod authenticated;

/// Routes under the role-scoped `/admin` prefix. The gate redirects non-admins
/// before these handlers run; the handlers re-check the role regardless.
pub mod admin;
