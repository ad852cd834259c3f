//! Authentication state
//!
//! [`AuthSession`] is the single owner of the bearer credential and the
//! logged-in user's profile. It is created once with [`AuthSession::init`]
//! and handed (as an `Arc`) to the API client, the router and the stream
//! consumer. Every change is written through to a [`CredentialStore`] so a
//! restart picks the session back up.

mod store;
mod user;

pub use store::{
    CredentialStore, FileCredentialStore, MemoryCredentialStore, StoreError, TOKEN_KEY, USER_KEY,
};
pub use user::{LoginResponse, RegisterRequest, UserProfile, ADMIN_ROLE};

use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default)]
struct Credentials {
    token: Option<String>,
    user: Option<UserProfile>,
}

pub struct AuthSession {
    store: Arc<dyn CredentialStore>,
    state: RwLock<Credentials>,
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("AuthSession")
            .field("authenticated", &state.token.is_some())
            .field("user", &state.user.as_ref().map(|u| u.username.as_str()))
            .finish()
    }
}

impl AuthSession {
    /// Load whatever the store holds. A profile that no longer parses is
    /// dropped, the token is kept.
    pub fn init(store: Arc<dyn CredentialStore>) -> Result<Self, StoreError> {
        let token = store.get(TOKEN_KEY)?;
        let user = match store.get(USER_KEY)? {
            Some(raw) => match serde_json::from_str::<Option<UserProfile>>(&raw) {
                Ok(user) => user,
                Err(e) => {
                    warn!("Discarding unreadable stored user profile: {}", e);
                    None
                }
            },
            None => None,
        };

        debug!(
            "Session restored (authenticated: {})",
            token.is_some()
        );

        Ok(Self {
            store,
            state: RwLock::new(Credentials { token, user }),
        })
    }

    /// Fresh session over an in-memory store
    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(MemoryCredentialStore::new()),
            state: RwLock::new(Credentials::default()),
        }
    }

    pub fn token(&self) -> Option<String> {
        self.state.read().token.clone()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.state.read().user.clone()
    }

    pub fn role(&self) -> Option<String> {
        self.state.read().user.as_ref().map(|u| u.role.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.read().token.is_some()
    }

    /// Adopt the result of a successful login
    pub fn establish(&self, login: &LoginResponse) -> Result<(), StoreError> {
        let user_json = serde_json::to_string(&login.user)?;
        {
            let mut state = self.state.write();
            state.token = Some(login.access_token.clone());
            state.user = Some(login.user.clone());
        }
        self.store.set(TOKEN_KEY, &login.access_token)?;
        self.store.set(USER_KEY, &user_json)?;

        info!("Logged in as {}", login.user.username);
        Ok(())
    }

    /// Replace the cached profile (after `/auth/me`)
    pub fn update_user(&self, user: UserProfile) -> Result<(), StoreError> {
        let user_json = serde_json::to_string(&user)?;
        self.state.write().user = Some(user);
        self.store.set(USER_KEY, &user_json)
    }

    /// Drop the credential and profile, in memory and on disk
    pub fn clear(&self) -> Result<(), StoreError> {
        *self.state.write() = Credentials::default();
        self.store.remove(TOKEN_KEY)?;
        self.store.remove(USER_KEY)?;
        debug!("Session cleared");
        Ok(())
    }

    /// React to a 401 for a request that carried `rejected`.
    ///
    /// Returns `true` only for the caller that actually cleared the session,
    /// so concurrent 401s for the same token produce a single logout.
    pub fn expire(&self, rejected: Option<&str>) -> bool {
        let cleared = {
            let mut state = self.state.write();
            match (&state.token, rejected) {
                (Some(current), Some(rejected)) if current == rejected => {
                    *state = Credentials::default();
                    true
                }
                _ => false,
            }
        };

        if cleared {
            if let Err(e) = self
                .store
                .remove(TOKEN_KEY)
                .and_then(|_| self.store.remove(USER_KEY))
            {
                warn!("Failed to clear persisted credential: {}", e);
            }
            info!("Session expired, credential cleared");
        }

        cleared
    }
}
