//! Authentication endpoints and the login/logout flow

use super::{ApiClient, ApiError};
use crate::auth::{LoginResponse, RegisterRequest, UserProfile};
use reqwest::multipart::Form;
use reqwest::Method;
use serde_json::Value;
use tracing::{info, warn};

impl ApiClient {
    /// Log in with a form post and adopt the returned credential
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let form = Form::new()
            .text("username", username.to_string())
            .text("password", password.to_string());

        let login: LoginResponse = self
            .send_json(self.request(Method::POST, "/auth/login").multipart(form))
            .await?;

        self.session().establish(&login)?;
        Ok(login)
    }

    /// Create an account. Does not log in.
    pub async fn register(&self, request: &RegisterRequest) -> Result<UserProfile, ApiError> {
        self.post("/auth/register", request).await
    }

    /// Profile of the current credential's owner
    pub async fn me(&self) -> Result<UserProfile, ApiError> {
        self.get("/auth/me").await
    }

    /// Refresh the cached profile. Any failure means the credential is no
    /// longer usable, so the session is dropped.
    pub async fn fetch_user_info(&self) -> Result<UserProfile, ApiError> {
        match self.me().await {
            Ok(user) => {
                self.session().update_user(user.clone())?;
                Ok(user)
            }
            Err(e) => {
                warn!("Could not refresh user info, logging out: {}", e);
                self.session().clear()?;
                Err(e)
            }
        }
    }

    /// Tell the server, then forget the credential locally. The local clear
    /// happens even when the server call fails.
    pub async fn logout(&self) -> Result<(), ApiError> {
        if self.session().is_authenticated() {
            if let Err(e) = self.post::<Value, _>("/auth/logout", &Value::Null).await {
                warn!("Server-side logout failed: {}", e);
            }
        }
        self.session().clear()?;
        info!("Logged out");
        Ok(())
    }
}
