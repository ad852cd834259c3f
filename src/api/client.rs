//! HTTP client with request/response interception

use super::ApiError;
use crate::auth::AuthSession;
use crate::config::{join_url, ServerSettings};
use crate::notify::Notifier;
use crate::router::Navigator;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the chat backend's REST API
pub struct ApiClient {
    client: Client,
    /// No overall timeout; streaming bodies stay open for minutes
    streaming: Client,
    base_url: String,
    session: Arc<AuthSession>,
    notifier: Arc<dyn Notifier>,
    navigator: Option<Arc<dyn Navigator>>,
}

impl ApiClient {
    pub fn new(
        settings: &ServerSettings,
        session: Arc<AuthSession>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(settings.request_timeout())
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        let streaming = Client::builder().connect_timeout(CONNECT_TIMEOUT).build()?;

        Ok(Self {
            client,
            streaming,
            base_url: settings.api_base(),
            session,
            notifier,
            navigator: None,
        })
    }

    /// Where to send the user when the session expires
    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<AuthSession> {
        &self.session
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    pub fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    pub(crate) fn streaming_http(&self) -> &Client {
        &self.streaming
    }

    /// Request interceptor: attach the bearer credential. Returns the token
    /// used so a later 401 can be matched against it.
    pub(crate) fn authorize(&self, builder: RequestBuilder) -> (RequestBuilder, Option<String>) {
        match self.session.token() {
            Some(token) => (builder.bearer_auth(&token), Some(token)),
            None => (builder, None),
        }
    }

    /// Global reaction to a 401. Only the first request rejected for the
    /// current token logs the user out and redirects.
    pub(crate) fn handle_unauthorized(&self, token: Option<&str>, detail: Option<&str>) {
        if self.session.expire(token) {
            self.notifier.error("Session expired, please log in again");
            if let Some(navigator) = &self.navigator {
                navigator.redirect_to_login();
            }
        } else if token.is_none() {
            self.notifier
                .error(detail.unwrap_or("Authentication failed"));
        } else {
            debug!("Ignoring 401 for a credential that was already cleared");
        }
    }

    /// Send a request through both interceptors
    pub(crate) async fn execute(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let (builder, token) = self.authorize(builder);

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Request failed before a response arrived: {}", e);
                if e.is_builder() {
                    self.notifier.error("Request failed, please try again later");
                } else {
                    self.notifier
                        .error("Network error, please check your connection");
                }
                return Err(e.into());
            }
        };

        if response.status().is_success() {
            return Ok(response);
        }

        Err(self.reject(response, token.as_deref()).await)
    }

    /// Response interceptor for non-2xx statuses
    async fn reject(&self, response: Response, token: Option<&str>) -> ApiError {
        let status = response.status();
        let url = response.url().to_string();
        let body = response.text().await.unwrap_or_default();
        let detail = extract_detail(&body);

        warn!("{} returned {}", url, status);

        let code = status.as_u16();
        if code == 401 {
            self.handle_unauthorized(token, detail.as_deref());
            return ApiError::Auth(
                detail.unwrap_or_else(|| "Could not validate credentials".to_string()),
            );
        }

        let shown = match code {
            403 => "You do not have permission to perform this action".to_string(),
            404 => "The requested resource does not exist".to_string(),
            c if c >= 500 => "Server error, please try again later".to_string(),
            _ => detail.clone().unwrap_or_else(|| "Request failed".to_string()),
        };
        self.notifier.error(&shown);

        ApiError::Status {
            status: code,
            message: detail.unwrap_or_else(|| status.to_string()),
        }
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, self.url(path))
    }

    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = self.execute(builder).await?;
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            // 204-style answers deserialize from null
            return Ok(serde_json::from_value(Value::Null)?);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send_json(self.request(Method::GET, path)).await
    }

    pub async fn get_with<T, Q>(&self, path: &str, query: &Q) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        self.send_json(self.request(Method::GET, path).query(query))
            .await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_json(self.request(Method::POST, path).json(body))
            .await
    }

    pub async fn patch<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_json(self.request(Method::PATCH, path).json(body))
            .await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send_json(self.request(Method::DELETE, path)).await
    }

    /// POST a JSON body and take the response as raw bytes
    pub async fn post_for_bytes<B>(&self, path: &str, body: &B) -> Result<Vec<u8>, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let response = self
            .execute(self.request(Method::POST, path).json(body))
            .await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// GET with query parameters and take the response as raw bytes
    pub async fn get_bytes_with<Q>(&self, path: &str, query: &Q) -> Result<Vec<u8>, ApiError>
    where
        Q: Serialize + ?Sized,
    {
        let response = self
            .execute(self.request(Method::GET, path).query(query))
            .await?;
        Ok(response.bytes().await?.to_vec())
    }
}

/// Pull a human-readable message out of an error body.
///
/// Understands `{"detail": "..."}`, validation lists
/// (`{"detail": [{"msg": "..."}]}`) and `{"message": "..."}`.
pub fn extract_detail(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;

    match &json["detail"] {
        Value::String(s) if !s.is_empty() => return Some(s.clone()),
        Value::Array(items) => {
            let msgs: Vec<&str> = items.iter().filter_map(|i| i["msg"].as_str()).collect();
            if !msgs.is_empty() {
                return Some(msgs.join("; "));
            }
        }
        _ => {}
    }

    json["message"]
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::CollectingNotifier;

    #[test]
    fn test_extract_detail_variants() {
        assert_eq!(
            extract_detail(r#"{"detail":"Conversation not found"}"#).as_deref(),
            Some("Conversation not found")
        );
        assert_eq!(
            extract_detail(r#"{"detail":[{"msg":"field required"},{"msg":"bad int"}]}"#)
                .as_deref(),
            Some("field required; bad int")
        );
        assert_eq!(
            extract_detail(r#"{"message":"nope"}"#).as_deref(),
            Some("nope")
        );
        assert_eq!(extract_detail("<html>oops</html>"), None);
        assert_eq!(extract_detail(r#"{"detail":""}"#), None);
    }

    #[test]
    fn test_url_joins_api_base() {
        let client = ApiClient::new(
            &ServerSettings::default(),
            Arc::new(AuthSession::in_memory()),
            Arc::new(CollectingNotifier::new()),
        )
        .unwrap();

        assert_eq!(client.url("/files/"), "http://localhost:8000/api/files/");
        assert_eq!(client.url("auth/me"), "http://localhost:8000/api/auth/me");
    }
}
