use futures_util::future::join_all;
use parking_lot::Mutex;
use ragchat::api::{ApiClient, ApiError, FileQuery};
use ragchat::auth::{
    AuthSession, CredentialStore, FileCredentialStore, LoginResponse, TOKEN_KEY,
};
use ragchat::config::ConfigBuilder;
use ragchat::notify::CollectingNotifier;
use ragchat::router::{RouteName, Router};
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    client: Arc<ApiClient>,
    session: Arc<AuthSession>,
    router: Arc<Router>,
    notifier: Arc<CollectingNotifier>,
}

fn harness_with(url: &str, session: Arc<AuthSession>) -> Harness {
    let config = ConfigBuilder::new().server_url(url).build();
    let notifier = Arc::new(CollectingNotifier::new());
    let router = Arc::new(Router::new(session.clone()));
    let client = ApiClient::new(&config.server, session.clone(), notifier.clone())
        .unwrap()
        .with_navigator(router.clone());

    Harness {
        client: Arc::new(client),
        session,
        router,
        notifier,
    }
}

fn login_body(token: &str) -> serde_json::Value {
    json!({
        "access_token": token,
        "token_type": "bearer",
        "user": {
            "id": 3,
            "username": "ana",
            "email": "ana@example.com",
            "full_name": "Ana Lima",
            "role": "admin",
            "org_id": 1,
            "is_active": true,
            "created_at": "2024-05-01T10:00:00"
        }
    })
}

fn logged_in(url: &str) -> Harness {
    let session = Arc::new(AuthSession::in_memory());
    let login: LoginResponse = serde_json::from_value(login_body("tok-1")).unwrap();
    session.establish(&login).unwrap();
    harness_with(url, session)
}

#[tokio::test]
async fn test_login_persists_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_string_contains("name=\"username\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(login_body("tok-9")))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("session.json");
    let store = Arc::new(FileCredentialStore::new(&store_path));
    let session = Arc::new(AuthSession::init(store.clone()).unwrap());
    let h = harness_with(&server.uri(), session);

    let login = assert_ok!(h.client.login("ana", "secret").await);

    assert_eq!(login.user.username, "ana");
    assert_eq!(h.session.token().as_deref(), Some("tok-9"));
    assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some("tok-9"));

    // a fresh process picks the session back up
    let restored = AuthSession::init(Arc::new(FileCredentialStore::new(&store_path))).unwrap();
    assert!(restored.is_authenticated());
    assert_eq!(restored.role().as_deref(), Some("admin"));
}

#[tokio::test]
async fn test_bad_password_reports_server_detail_without_redirect() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"detail": "Incorrect username or password"})),
        )
        .mount(&server)
        .await;
    let h = harness_with(&server.uri(), Arc::new(AuthSession::in_memory()));

    let err = assert_err!(h.client.login("ana", "wrong").await);

    assert!(matches!(err, ApiError::Auth(ref m) if m == "Incorrect username or password"));
    assert_eq!(
        h.notifier.errors(),
        vec!["Incorrect username or password".to_string()]
    );
    assert_eq!(h.router.current(), None);
}

#[tokio::test]
async fn test_concurrent_unauthorized_logs_out_exactly_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/conversations/"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"detail": "Token expired"})),
        )
        .mount(&server)
        .await;
    let h = logged_in(&server.uri());
    // land somewhere first so the redirect is visible in the history
    assert_eq!(h.router.push(RouteName::Files).unwrap(), RouteName::Files);

    let calls = (0..8).map(|_| {
        let client = h.client.clone();
        async move { client.list_conversations(0, 20).await }
    });
    let results = join_all(calls).await;

    assert!(results
        .iter()
        .all(|r| matches!(r, Err(ApiError::Auth(_)))));
    assert!(!h.session.is_authenticated());
    assert_eq!(
        h.notifier.errors(),
        vec!["Session expired, please log in again".to_string()]
    );
    assert_eq!(h.router.history(), vec![RouteName::Files, RouteName::Login]);
}

#[tokio::test]
async fn test_error_statuses_map_to_notifications() {
    let server = MockServer::start().await;
    let cases = [
        (403, json!({"detail": "Forbidden"}), "You do not have permission to perform this action"),
        (404, json!({"detail": "Conversation not found"}), "The requested resource does not exist"),
        (503, json!({}), "Server error, please try again later"),
        (
            422,
            json!({"detail": [{"msg": "field required"}]}),
            "field required",
        ),
        (409, json!({"message": "Already indexed"}), "Already indexed"),
        (400, json!({}), "Request failed"),
    ];
    for (idx, (status, body, _)) in cases.iter().enumerate() {
        Mock::given(method("GET"))
            .and(path(format!("/api/files/{}", idx)))
            .respond_with(ResponseTemplate::new(*status).set_body_json(body.clone()))
            .mount(&server)
            .await;
    }
    let h = logged_in(&server.uri());

    for (idx, (status, _, _)) in cases.iter().enumerate() {
        let err = h.client.get_file(idx as i64).await.unwrap_err();
        assert_eq!(err.status(), Some(*status));
    }

    let expected: Vec<String> = cases.iter().map(|(_, _, m)| m.to_string()).collect();
    assert_eq!(h.notifier.errors(), expected);
    // none of these touch the session
    assert!(h.session.is_authenticated());
}

#[tokio::test]
async fn test_network_error_notification() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let h = logged_in(&format!("http://{}", addr));

    let err = h.client.me().await.unwrap_err();

    assert!(matches!(err, ApiError::Http(_)));
    assert_eq!(
        h.notifier.errors(),
        vec!["Network error, please check your connection".to_string()]
    );
}

#[tokio::test]
async fn test_fetch_user_info_failure_logs_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let h = logged_in(&server.uri());

    assert_err!(h.client.fetch_user_info().await);
    assert!(!h.session.is_authenticated());
    assert!(h.session.user().is_none());
}

#[tokio::test]
async fn test_logout_clears_even_when_server_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/logout"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    let h = logged_in(&server.uri());

    assert_ok!(h.client.logout().await);
    assert!(!h.session.is_authenticated());
}

#[tokio::test]
async fn test_file_listing_sends_filters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/files/"))
        .and(query_param("status", "indexed"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [{
                "id": 5,
                "filename": "abc.pdf",
                "original_filename": "handbook.pdf",
                "file_type": "pdf",
                "size": 2048,
                "status": "indexed",
                "page_count": 12,
                "chunk_count": 40,
                "created_at": "2024-05-01T10:00:00",
                "indexed_at": "2024-05-01T10:01:00"
            }],
            "total": 21,
            "page": 2,
            "page_size": 20
        })))
        .mount(&server)
        .await;
    let h = logged_in(&server.uri());

    let query = FileQuery {
        page: Some(2),
        page_size: None,
        status: Some("indexed".to_string()),
    };
    let list = h.client.list_files(&query).await.unwrap();

    assert_eq!(list.total, 21);
    assert_eq!(list.files[0].original_filename, "handbook.pdf");
}

#[tokio::test]
async fn test_upload_reports_progress() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/files/"))
        .and(body_string_contains("filename=\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "file_id": 11,
            "filename": "upload.txt",
            "status": "pending",
            "message": "queued"
        })))
        .mount(&server)
        .await;
    let h = logged_in(&server.uri());

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&vec![b'x'; 200 * 1024]).unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let upload = h
        .client
        .upload_file(file.path(), move |pct| sink.lock().push(pct))
        .await
        .unwrap();

    assert_eq!(upload.file_id, 11);
    let seen = seen.lock().clone();
    assert!(!seen.is_empty());
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(seen.last(), Some(&100));
}

#[tokio::test]
async fn test_missing_feedback_is_none_and_empty_delete_is_ok() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/feedback/messages/4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::Value::Null))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/conversations/9"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    let h = logged_in(&server.uri());

    assert!(h.client.get_feedback(4).await.unwrap().is_none());
    assert_ok!(h.client.delete_conversation(9).await);
}

#[tokio::test]
async fn test_admin_stats() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/admin/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_users": 4,
            "total_files": 10,
            "total_conversations": 7,
            "total_messages": 30,
            "total_storage_bytes": 1048576
        })))
        .mount(&server)
        .await;
    let h = logged_in(&server.uri());

    let stats = h.client.system_stats().await.unwrap();

    assert_eq!(stats.total_files, 10);
    assert!(stats.to_string().contains("Storage: 1.0 MiB"));
}
