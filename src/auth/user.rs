//! User profile and authentication payloads

use serde::{Deserialize, Serialize};

/// Role string the backend uses for administrators
pub const ADMIN_ROLE: &str = "admin";

/// Profile of the logged-in user, as returned by `/auth/me` and `/auth/login`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    pub role: String,
    pub org_id: i64,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

fn default_active() -> bool {
    true
}

impl UserProfile {
    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }

    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.username)
    }
}

/// Body of a successful `/auth/login`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub user: UserProfile,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Body of `/auth/register`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    pub org_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_login_response_parses_backend_shape() {
        let body = json!({
            "access_token": "abc",
            "token_type": "bearer",
            "user": {
                "id": 7,
                "username": "lin",
                "email": "lin@example.com",
                "full_name": null,
                "role": "admin",
                "org_id": 1,
                "is_active": true,
                "created_at": "2024-05-01T10:00:00"
            }
        });

        let login: LoginResponse = serde_json::from_value(body).unwrap();
        assert_eq!(login.access_token, "abc");
        assert!(login.user.is_admin());
        assert_eq!(login.user.display_name(), "lin");
    }

    #[test]
    fn test_register_request_skips_missing_full_name() {
        let req = RegisterRequest {
            username: "ana".into(),
            email: "ana@example.com".into(),
            password: "secret".into(),
            full_name: None,
            org_name: "acme".into(),
        };
        let value = serde_json::to_value(&req).unwrap();
        assert!(value.get("full_name").is_none());
        assert_eq!(value["org_name"], "acme");
    }
}
