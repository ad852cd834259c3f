use ragchat::api::ApiClient;
use ragchat::auth::{AuthSession, LoginResponse};
use ragchat::config::ConfigBuilder;
use ragchat::export::{DirectorySink, ExportError, ExportFormat, ExportService};
use ragchat::notify::{CollectingNotifier, Level};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn service(url: &str, dir: &std::path::Path) -> (ExportService, Arc<CollectingNotifier>) {
    let config = ConfigBuilder::new().server_url(url).export_dir(dir).build();
    let session = Arc::new(AuthSession::in_memory());
    let login: LoginResponse = serde_json::from_value(json!({
        "access_token": "tok-1",
        "user": {"id": 1, "username": "ana", "email": "a@example.com", "role": "user", "org_id": 1}
    }))
    .unwrap();
    session.establish(&login).unwrap();

    let notifier = Arc::new(CollectingNotifier::new());
    let client = Arc::new(ApiClient::new(&config.server, session, notifier.clone()).unwrap());
    let sink = Arc::new(DirectorySink::new(config.export.output_dir.clone()));
    (ExportService::new(client, sink), notifier)
}

#[tokio::test]
async fn test_pdf_export_saved_with_extension() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/export/conversation"))
        .and(body_json(json!({"conversation_id": 5, "format": "pdf"})))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4 fake".to_vec()))
        .expect(1)
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();
    let (exporter, notifier) = service(&server.uri(), dir.path());

    let saved = exporter
        .export_conversation(5, &ExportFormat::Pdf, Some("Report"))
        .await
        .unwrap();

    assert_eq!(saved, dir.path().join("Report.pdf"));
    assert_eq!(std::fs::read(&saved).unwrap(), b"%PDF-1.4 fake");
    let seen = notifier.notifications();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].level, Level::Success);
    assert_eq!(seen[0].message, "Export succeeded");
}

#[tokio::test]
async fn test_unknown_format_passed_through_and_saved_as_txt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/export/conversation"))
        .and(body_json(json!({"conversation_id": 5, "format": "docx"})))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"plain".to_vec()))
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();
    let (exporter, _) = service(&server.uri(), dir.path());

    let saved = exporter
        .export_conversation(5, &ExportFormat::parse("docx"), None)
        .await
        .unwrap();

    assert_eq!(saved, dir.path().join("conversation-export.txt"));
}

#[tokio::test]
async fn test_failure_reports_server_detail() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/export/conversation"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"detail": "Conversation has no messages"})),
        )
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();
    let (exporter, notifier) = service(&server.uri(), dir.path());

    let err = exporter
        .export_conversation(5, &ExportFormat::Markdown, Some("Empty"))
        .await
        .unwrap_err();

    assert!(matches!(err, ExportError::Api(_)));
    assert!(notifier
        .errors()
        .contains(&"Export failed: Conversation has no messages".to_string()));
    assert!(!dir.path().join("Empty.md").exists());
}
