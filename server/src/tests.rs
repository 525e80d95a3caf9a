use std::path::Path;
use std::sync::Arc;

use drive_registry::storage::{JsonFileStore, MemoryStore, RecordStore};
use drive_registry::testing::FakeCloud;
use drive_registry::{AppConfig, AppContext, FileRecord};
use rocket::data::{Limits, ToByteUnit};
use rocket::figment::Figment;
use rocket::http::{ContentType, Status};
use rocket::local::asynchronous::Client;
use serde_json::{json, Value};
use tempfile::TempDir;

const BOUNDARY: &str = "X-TEST-BOUNDARY";

struct TestServer {
    client: Client,
    cloud: Arc<FakeCloud>,
    store: Arc<MemoryStore>,
    staging: TempDir,
}

async fn client_for(
    figment: Figment,
    cloud: Arc<FakeCloud>,
    store: Arc<dyn RecordStore>,
    staging: &Path,
) -> Client {
    let config = AppConfig {
        folder_id: "folder-1".to_string(),
        staging_dir: staging.to_path_buf(),
        ..AppConfig::default()
    };
    let ctx = AppContext::new(config, cloud, store);
    Client::tracked(super::build(figment, ctx))
        .await
        .expect("valid rocket instance")
}

async fn test_server_with(
    figment: Figment,
    cloud: FakeCloud,
    records: Vec<FileRecord>,
) -> TestServer {
    let staging = TempDir::new().expect("Failed to create staging dir");
    let cloud = Arc::new(cloud);
    let store = Arc::new(MemoryStore::with_records(records));
    let client = client_for(figment, cloud.clone(), store.clone(), staging.path()).await;
    TestServer { client, cloud, store, staging }
}

async fn test_server(cloud: FakeCloud, records: Vec<FileRecord>) -> TestServer {
    test_server_with(rocket::Config::figment(), cloud, records).await
}

/// Builds a multipart/form-data body from text fields and an optional file.
fn multipart(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((filename, content)) = file {
        body.extend_from_slice(
            format!(
                concat!(
                    "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
                    "Content-Type: application/pdf\r\n\r\n",
                ),
                BOUNDARY, filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn form_data() -> ContentType {
    ContentType::new("multipart", "form-data").with_params(("boundary", BOUNDARY))
}

fn is_empty_dir(dir: &Path) -> bool {
    std::fs::read_dir(dir).map(|mut e| e.next().is_none()).unwrap_or(true)
}

#[rocket::async_test]
async fn upload_returns_file_details() {
    let cloud = FakeCloud::returning("file-1", Some("https://drive.test/file-1"));
    let server = test_server(cloud, vec![]).await;
    let body = multipart(
        &[("name", "Jane Doe"), ("email", "jane@example.com")],
        Some(("report.PDF", b"%PDF-1.4 test")),
    );

    let response = server.client.post("/upload").header(form_data()).body(body).dispatch().await;

    assert_eq!(response.status(), Status::Ok);
    let json: Value = response.into_json().await.expect("json body");
    assert_eq!(
        json,
        json!({
            "success": true,
            "fileId": "file-1",
            "name": "Jane_Doe.PDF",
            "webViewLink": "https://drive.test/file-1"
        })
    );
    assert_eq!(server.cloud.created()[0].content, b"%PDF-1.4 test");
    assert_eq!(server.store.load_all().await.unwrap().len(), 1);
    assert!(is_empty_dir(server.staging.path()));
}

#[rocket::async_test]
async fn upload_honours_desired_file_name() {
    let server = test_server(FakeCloud::returning("file-2", None), vec![]).await;
    let body = multipart(
        &[("name", "Jane Doe"), ("email", "jane@example.com"), ("desiredFileName", "order123.pdf")],
        Some(("scan.pdf", b"%PDF-1.4 test")),
    );

    let response = server.client.post("/upload").header(form_data()).body(body).dispatch().await;

    assert_eq!(response.status(), Status::Ok);
    let json: Value = response.into_json().await.unwrap();
    assert_eq!(json["name"], "order123.pdf");
    assert_eq!(json["webViewLink"], "https://drive.google.com/file/d/file-2/view");
}

#[rocket::async_test]
async fn upload_without_name_is_rejected_before_the_provider() {
    let server = test_server(FakeCloud::returning("file-1", None), vec![]).await;
    let body = multipart(&[("email", "jane@example.com")], Some(("report.pdf", b"%PDF-1.4 test")));

    let response = server.client.post("/upload").header(form_data()).body(body).dispatch().await;

    assert_eq!(response.status(), Status::BadRequest);
    let json: Value = response.into_json().await.unwrap();
    assert_eq!(json, json!({"error": "name is required."}));
    assert!(server.cloud.created().is_empty());
    assert!(server.store.load_all().await.unwrap().is_empty());
    assert!(is_empty_dir(server.staging.path()));
}

#[rocket::async_test]
async fn upload_provider_failure_is_a_server_error() {
    let cloud = FakeCloud::default().failing_uploads("Insufficient Permission");
    let server = test_server(cloud, vec![]).await;
    let body = multipart(
        &[("name", "Jane"), ("email", "jane@example.com")],
        Some(("report.pdf", b"%PDF-1.4 test")),
    );

    let response = server.client.post("/upload").header(form_data()).body(body).dispatch().await;

    assert_eq!(response.status(), Status::InternalServerError);
    let json: Value = response.into_json().await.unwrap();
    assert_eq!(json, json!({"error": "Insufficient Permission"}));
    assert!(is_empty_dir(server.staging.path()));
}

#[rocket::async_test]
async fn grant_access_records_email_once() {
    let records = vec![FileRecord::new("file-1", "a.pdf", None)];
    let server = test_server(FakeCloud::default(), records).await;

    for _ in 0..2 {
        let response = server
            .client
            .post("/grant-access")
            .header(ContentType::JSON)
            .body(json!({"fileId": "file-1", "email": "a@b.com"}).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let json: Value = response.into_json().await.unwrap();
        assert_eq!(json, json!({"success": true, "message": "Access granted to a@b.com"}));
    }

    let response = server.client.get("/files-for-email/a@b.com").dispatch().await;
    let json: Value = response.into_json().await.unwrap();
    assert_eq!(json, json!([{"id": "file-1", "name": "a.pdf", "accessEmails": ["a@b.com"]}]));
}

#[rocket::async_test]
async fn grant_access_requires_both_fields() {
    let server = test_server(FakeCloud::default(), vec![]).await;

    let response = server
        .client
        .post("/grant-access")
        .header(ContentType::JSON)
        .body(json!({"email": "a@b.com"}).to_string())
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::BadRequest);
    let json: Value = response.into_json().await.unwrap();
    assert_eq!(json, json!({"error": "fileId is required."}));
    assert!(server.cloud.grants().is_empty());
}

#[rocket::async_test]
async fn grant_access_on_unknown_file_keeps_registry() {
    let records = vec![FileRecord::new("file-1", "a.pdf", None)];
    let server = test_server(FakeCloud::default(), records).await;
    let before: Value = server.client.get("/files").dispatch().await.into_json().await.unwrap();

    let response = server
        .client
        .post("/grant-access")
        .header(ContentType::JSON)
        .body(json!({"fileId": "unknown", "email": "a@b.com"}).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let after: Value = server.client.get("/files").dispatch().await.into_json().await.unwrap();
    assert_eq!(before, after);
}

#[rocket::async_test]
async fn files_for_email_filters_exactly() {
    let mut mine = FileRecord::new("a", "a.pdf", Some("https://drive.test/a".into()));
    mine.grant("a@b.com");
    let mut theirs = FileRecord::new("b", "b.pdf", None);
    theirs.grant("other@b.com");
    let server = test_server(FakeCloud::default(), vec![mine, theirs]).await;

    let all: Value = server.client.get("/files").dispatch().await.into_json().await.unwrap();
    assert_eq!(all.as_array().map(Vec::len), Some(2));

    let response = server.client.get("/files-for-email/a@b.com").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    let json: Value = response.into_json().await.unwrap();
    assert_eq!(
        json,
        json!([{
            "id": "a",
            "name": "a.pdf",
            "webViewLink": "https://drive.test/a",
            "accessEmails": ["a@b.com"]
        }])
    );
}

#[rocket::async_test]
async fn cors_and_json_errors() {
    let server = test_server(FakeCloud::default(), vec![]).await;

    let preflight = server.client.options("/upload").dispatch().await;
    assert_eq!(preflight.status(), Status::NoContent);
    assert_eq!(preflight.headers().get_one("Access-Control-Allow-Origin"), Some("*"));

    let missing = server.client.get("/nowhere").dispatch().await;
    assert_eq!(missing.status(), Status::NotFound);
    assert_eq!(missing.headers().get_one("Access-Control-Allow-Origin"), Some("*"));
    let json: Value = missing.into_json().await.unwrap();
    assert_eq!(json, json!({"error": "Not found."}));
}

#[rocket::async_test]
async fn oversize_upload_is_payload_too_large() {
    let limits = Limits::default().limit("file", 8.bytes());
    let figment = rocket::Config::figment().merge(("limits", limits));
    let server = test_server_with(figment, FakeCloud::returning("file-1", None), vec![]).await;
    let body = multipart(
        &[("name", "Jane"), ("email", "jane@example.com")],
        Some(("report.pdf", b"%PDF-1.4 a body well past eight bytes")),
    );

    let response = server.client.post("/upload").header(form_data()).body(body).dispatch().await;

    assert_eq!(response.status(), Status::PayloadTooLarge);
    let json: Value = response.into_json().await.unwrap();
    assert_eq!(json, json!({"error": "Upload is too large."}));
    assert!(server.cloud.created().is_empty());
    assert!(server.store.load_all().await.unwrap().is_empty());
}

#[rocket::async_test]
async fn corrupt_registry_is_a_server_error_and_serving_continues() {
    let dir = TempDir::new().unwrap();
    let store_path = dir.path().join("files.json");
    std::fs::write(&store_path, "{ not json").unwrap();
    let staging = dir.path().join("uploads");
    let cloud = Arc::new(FakeCloud::default());
    let store = Arc::new(JsonFileStore::new(store_path.clone()));
    let client = client_for(rocket::Config::figment(), cloud.clone(), store, &staging).await;

    let response = client.get("/files").dispatch().await;
    assert_eq!(response.status(), Status::InternalServerError);
    let json: Value = response.into_json().await.unwrap();
    assert!(json["error"].as_str().unwrap().starts_with("Record store is corrupt"));

    let response = client
        .post("/grant-access")
        .header(ContentType::JSON)
        .body(json!({"fileId": "file-1", "email": "a@b.com"}).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::InternalServerError);
    let json: Value = response.into_json().await.unwrap();
    assert!(json["error"].as_str().unwrap().contains("registry was not updated"));
    assert_eq!(cloud.grants().len(), 1);

    std::fs::write(&store_path, "[]").unwrap();
    let response = client.get("/files").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    let json: Value = response.into_json().await.unwrap();
    assert_eq!(json, json!([]));
}

#[rocket::async_test]
async fn unwritable_registry_still_returns_the_upload() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"a file, not a directory").unwrap();
    let staging = dir.path().join("uploads");
    let cloud = Arc::new(FakeCloud::returning("file-1", None));
    let store = Arc::new(JsonFileStore::new(blocker.join("files.json")));
    let client = client_for(rocket::Config::figment(), cloud.clone(), store, &staging).await;
    let body = multipart(
        &[("name", "Jane"), ("email", "jane@example.com")],
        Some(("report.pdf", b"%PDF-1.4 test")),
    );

    let response = client.post("/upload").header(form_data()).body(body).dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    let json: Value = response.into_json().await.unwrap();
    assert_eq!(json["fileId"], "file-1");

    let body = multipart(
        &[("name", "Jane"), ("email", "jane@example.com")],
        Some(("second.pdf", b"%PDF-1.4 again")),
    );
    let response = client.post("/upload").header(form_data()).body(body).dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(cloud.created().len(), 2);
}
