//! Route table and navigation guard
//!
//! Each route carries three independent access flags. Before every
//! navigation [`guard`] compares them with the current [`AuthSession`] and
//! either lets the navigation through or redirects it.

use crate::auth::{AuthSession, ADMIN_ROLE};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Redirect chains longer than this indicate a misconfigured table
const MAX_REDIRECTS: usize = 4;

#[derive(Error, Debug)]
pub enum RouterError {
    #[error("No route matches '{0}'")]
    NotFound(String),

    #[error("Redirect loop while navigating to {0}")]
    RedirectLoop(RouteName),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteName {
    Login,
    Register,
    Chat,
    Files,
    Conversations,
    Admin,
    Dashboard,
    Review,
}

impl fmt::Display for RouteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RouteName::Login => "Login",
            RouteName::Register => "Register",
            RouteName::Chat => "Chat",
            RouteName::Files => "Files",
            RouteName::Conversations => "Conversations",
            RouteName::Admin => "Admin",
            RouteName::Dashboard => "Dashboard",
            RouteName::Review => "Review",
        };
        f.write_str(name)
    }
}

/// Access requirements of a route
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteMeta {
    pub requires_auth: bool,
    pub requires_admin: bool,
    /// Any one of these roles grants access
    pub requires_role: Option<Vec<String>>,
}

impl RouteMeta {
    pub fn public() -> Self {
        Self::default()
    }

    pub fn authenticated() -> Self {
        Self {
            requires_auth: true,
            ..Self::default()
        }
    }

    pub fn admin(mut self) -> Self {
        self.requires_admin = true;
        self
    }

    pub fn roles(mut self, roles: &[&str]) -> Self {
        self.requires_role = Some(roles.iter().map(|r| r.to_string()).collect());
        self
    }
}

#[derive(Debug, Clone)]
pub struct Route {
    pub name: RouteName,
    pub path: String,
    pub meta: RouteMeta,
}

impl Route {
    pub fn new(name: RouteName, path: impl Into<String>, meta: RouteMeta) -> Self {
        Self {
            name,
            path: path.into(),
            meta,
        }
    }
}

/// Outcome of the guard for one navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationDecision {
    Allow,
    Redirect(RouteName),
}

/// Anything that can force the user back to the login view
pub trait Navigator: Send + Sync {
    fn redirect_to_login(&self);
}

/// Decide whether navigating to `to` is allowed for `session`
pub fn guard(to: &Route, session: &AuthSession) -> NavigationDecision {
    let authenticated = session.is_authenticated();
    let role = session.role();

    if to.meta.requires_auth && !authenticated {
        return NavigationDecision::Redirect(RouteName::Login);
    }

    if matches!(to.name, RouteName::Login | RouteName::Register) && authenticated {
        return NavigationDecision::Redirect(RouteName::Chat);
    }

    if to.meta.requires_admin && role.as_deref() != Some(ADMIN_ROLE) {
        return NavigationDecision::Redirect(RouteName::Chat);
    }

    if let Some(allowed) = &to.meta.requires_role {
        let permitted = role
            .as_deref()
            .map(|r| allowed.iter().any(|a| a == r))
            .unwrap_or(false);
        if !permitted {
            return NavigationDecision::Redirect(RouteName::Chat);
        }
    }

    NavigationDecision::Allow
}

/// The application's routes. Everything under the main layout inherits
/// `requires_auth`.
pub fn default_routes() -> Vec<Route> {
    let layout = RouteMeta::authenticated;
    vec![
        Route::new(RouteName::Login, "/login", RouteMeta::public()),
        Route::new(RouteName::Register, "/register", RouteMeta::public()),
        Route::new(RouteName::Chat, "/", layout()),
        Route::new(RouteName::Files, "/files", layout()),
        Route::new(RouteName::Conversations, "/conversations", layout()),
        Route::new(RouteName::Admin, "/admin", layout().admin()),
        Route::new(RouteName::Dashboard, "/dashboard", layout().admin()),
        Route::new(
            RouteName::Review,
            "/review",
            layout().roles(&["admin", "auditor", "superuser"]),
        ),
    ]
}

pub struct Router {
    routes: Vec<Route>,
    session: Arc<AuthSession>,
    current: RwLock<Option<RouteName>>,
    history: RwLock<Vec<RouteName>>,
}

impl Router {
    pub fn new(session: Arc<AuthSession>) -> Self {
        Self::with_routes(session, default_routes())
    }

    pub fn with_routes(session: Arc<AuthSession>, routes: Vec<Route>) -> Self {
        Self {
            routes,
            session,
            current: RwLock::new(None),
            history: RwLock::new(Vec::new()),
        }
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn route(&self, name: RouteName) -> Option<&Route> {
        self.routes.iter().find(|r| r.name == name)
    }

    /// Match a path exactly, ignoring a trailing slash
    pub fn resolve(&self, path: &str) -> Option<&Route> {
        let wanted = normalize(path);
        self.routes.iter().find(|r| normalize(&r.path) == wanted)
    }

    /// Navigate by name, following guard redirects. Returns where the
    /// navigation landed.
    pub fn push(&self, name: RouteName) -> Result<RouteName, RouterError> {
        let mut target = name;

        for _ in 0..=MAX_REDIRECTS {
            let route = self
                .route(target)
                .ok_or_else(|| RouterError::NotFound(target.to_string()))?;

            match guard(route, &self.session) {
                NavigationDecision::Allow => {
                    debug!("Navigated to {} ({})", route.name, route.path);
                    *self.current.write() = Some(target);
                    self.history.write().push(target);
                    return Ok(target);
                }
                NavigationDecision::Redirect(next) => {
                    debug!("Guard redirected {} -> {}", target, next);
                    target = next;
                }
            }
        }

        Err(RouterError::RedirectLoop(name))
    }

    /// Navigate by path
    pub fn push_path(&self, path: &str) -> Result<RouteName, RouterError> {
        let name = self
            .resolve(path)
            .map(|r| r.name)
            .ok_or_else(|| RouterError::NotFound(path.to_string()))?;
        self.push(name)
    }

    pub fn current(&self) -> Option<RouteName> {
        *self.current.read()
    }

    /// Every route landed on, oldest first
    pub fn history(&self) -> Vec<RouteName> {
        self.history.read().clone()
    }
}

impl Navigator for Router {
    fn redirect_to_login(&self) {
        if let Err(e) = self.push(RouteName::Login) {
            warn!("Could not navigate to login: {}", e);
        }
    }
}

fn normalize(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{LoginResponse, UserProfile};

    fn session_with(role: Option<&str>) -> Arc<AuthSession> {
        let session = AuthSession::in_memory();
        if let Some(role) = role {
            session
                .establish(&LoginResponse {
                    access_token: "tok".into(),
                    token_type: "bearer".into(),
                    user: UserProfile {
                        id: 1,
                        username: "u".into(),
                        email: "u@example.com".into(),
                        full_name: None,
                        role: role.into(),
                        org_id: 1,
                        is_active: true,
                        created_at: None,
                    },
                })
                .unwrap();
        }
        Arc::new(session)
    }

    #[test]
    fn test_anonymous_user_sent_to_login() {
        let router = Router::new(session_with(None));
        assert_eq!(router.push(RouteName::Files).unwrap(), RouteName::Login);
        assert_eq!(router.push_path("/register").unwrap(), RouteName::Register);
    }

    #[test]
    fn test_logged_in_user_skips_login_page() {
        let router = Router::new(session_with(Some("user")));
        assert_eq!(router.push(RouteName::Login).unwrap(), RouteName::Chat);
        assert_eq!(router.push(RouteName::Register).unwrap(), RouteName::Chat);
    }

    #[test]
    fn test_admin_routes() {
        let user = Router::new(session_with(Some("user")));
        assert_eq!(user.push(RouteName::Admin).unwrap(), RouteName::Chat);
        assert_eq!(user.push(RouteName::Dashboard).unwrap(), RouteName::Chat);

        let admin = Router::new(session_with(Some("admin")));
        assert_eq!(admin.push(RouteName::Admin).unwrap(), RouteName::Admin);
    }

    #[test]
    fn test_review_requires_listed_role() {
        let auditor = Router::new(session_with(Some("auditor")));
        assert_eq!(auditor.push_path("/review/").unwrap(), RouteName::Review);

        let user = Router::new(session_with(Some("user")));
        assert_eq!(user.push_path("/review").unwrap(), RouteName::Chat);
    }

    #[test]
    fn test_guard_decisions_are_independent_of_router() {
        let session = session_with(Some("superuser"));
        let routes = default_routes();
        let review = routes.iter().find(|r| r.name == RouteName::Review).unwrap();
        let admin = routes.iter().find(|r| r.name == RouteName::Admin).unwrap();

        assert_eq!(guard(review, &session), NavigationDecision::Allow);
        assert_eq!(
            guard(admin, &session),
            NavigationDecision::Redirect(RouteName::Chat)
        );
    }

    #[test]
    fn test_unknown_path() {
        let router = Router::new(session_with(None));
        assert!(matches!(
            router.push_path("/nowhere"),
            Err(RouterError::NotFound(_))
        ));
    }

    #[test]
    fn test_redirect_to_login_records_history() {
        let session = session_with(Some("user"));
        let router = Router::new(session.clone());
        router.push(RouteName::Files).unwrap();

        session.clear().unwrap();
        router.redirect_to_login();

        assert_eq!(router.current(), Some(RouteName::Login));
        assert_eq!(router.history(), vec![RouteName::Files, RouteName::Login]);
    }
}
