use std::sync::Arc;

use actix_web::{http::StatusCode, test, web, App};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};
use tempfile::TempDir;

use gridvault::api;
use gridvault::app_state::AppState;
use gridvault::chunks::config::ChunkBackend;
use gridvault::chunks::mock_store::MockChunkStore;
use gridvault::config::AppConfig;
use gridvault::model::FileData;
use gridvault::records::config::RecordBackend;
use gridvault::records::mock_store::MockRecordStore;
use gridvault::reply::Reply;

struct Backends {
    chunks: Arc<MockChunkStore>,
    records: Arc<MockRecordStore>,
}

fn state_with(config: AppConfig) -> (AppState, Backends) {
    let chunks = Arc::new(MockChunkStore::new());
    let records = Arc::new(MockRecordStore::new());
    let state = AppState::with_backends(config, chunks.clone(), records.clone());
    (state, Backends { chunks, records })
}

fn upload_body(content_type: &str, data: &[u8]) -> Value {
    json!({
        "content_type": content_type,
        "metadata": {"upload_dt": "2024-05-01T12:30:00Z"},
        "data": STANDARD.encode(data)
    })
}

macro_rules! app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state))
                .configure(api::configure),
        )
        .await
    };
}

#[actix_web::test]
async fn test_add_then_get_round_trip() {
    let app = app!(AppState::new_for_testing());

    let req = test::TestRequest::post()
        .uri("/file/add")
        .insert_header(("X-Acc-Type", "client"))
        .insert_header(("X-Acc-Id", "507f191e810c19729de860ea"))
        .set_json(upload_body("image/png", b"\x89PNG fake image"))
        .to_request();
    let added: Reply<String> = test::call_and_read_body_json(&app, req).await;
    assert!(added.is_success(), "{:?}", added.status);
    let id = added.payload.unwrap();
    assert_eq!(id.len(), 24);

    let req = test::TestRequest::post()
        .uri("/file/get")
        .insert_header(("X-Acc-Type", "client"))
        .set_json(json!({"$oid": id}))
        .to_request();
    let got: Reply<FileData> = test::call_and_read_body_json(&app, req).await;
    let file = got.payload.unwrap();
    assert_eq!(file.id.as_deref(), Some(id.as_str()));
    assert_eq!(file.content_type.as_deref(), Some("image/png"));
    assert_eq!(file.data.as_deref(), Some(&b"\x89PNG fake image"[..]));
    assert_eq!(
        file.metadata.unwrap().uploader_id.as_deref(),
        Some("507f191e810c19729de860ea")
    );
}

#[actix_web::test]
async fn test_direct_download_streams_bytes() {
    let app = app!(AppState::new_for_testing());

    let req = test::TestRequest::post()
        .uri("/file/add")
        .insert_header(("X-Acc-Type", "agent"))
        .set_json(upload_body("application/pdf", b"%PDF-1.7 body"))
        .to_request();
    let added: Reply<String> = test::call_and_read_body_json(&app, req).await;
    let id = added.payload.unwrap();

    let req = test::TestRequest::get().uri(&format!("/file/get/{}", id)).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get("content-type").unwrap(), "application/pdf");
    assert_eq!(test::read_body(resp).await.as_ref(), b"%PDF-1.7 body");
}

#[actix_web::test]
async fn test_unknown_id() {
    let app = app!(AppState::new_for_testing());

    let req = test::TestRequest::post()
        .uri("/file/get")
        .set_json(json!("507f1f77bcf86cd799439011"))
        .to_request();
    let got: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(
        got,
        json!([{"code": "ERROR", "errors": {"file_id.err": "file not found"}}])
    );

    let req = test::TestRequest::get().uri("/file/get/507f1f77bcf86cd799439011").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(test::read_body(resp).await.is_empty());
}

#[actix_web::test]
async fn test_empty_content_type_is_rejected() {
    let (state, backends) = state_with(AppConfig::default());
    let app = app!(state);

    let req = test::TestRequest::post()
        .uri("/file/add")
        .insert_header(("X-Acc-Type", "agent"))
        .set_json(upload_body("", b"hello"))
        .to_request();
    let added: Reply<String> = test::call_and_read_body_json(&app, req).await;
    assert!(added.payload.is_none());
    assert_eq!(added.status.error_keys(), vec!["content_type.err"]);
    assert_eq!(backends.chunks.object_count(), 0);
    assert_eq!(backends.records.record_count(), 0);
}

#[actix_web::test]
async fn test_content_type_that_is_not_a_header_value_is_rejected() {
    let (state, backends) = state_with(AppConfig::default());
    let app = app!(state);

    let req = test::TestRequest::post()
        .uri("/file/add")
        .insert_header(("X-Acc-Type", "agent"))
        .set_json(upload_body("text/plain\n", b"hello"))
        .to_request();
    let added: Reply<String> = test::call_and_read_body_json(&app, req).await;
    assert!(added.payload.is_none());
    assert_eq!(added.status.error_keys(), vec!["content_type.err"]);
    assert_eq!(backends.chunks.object_count(), 0);
    assert_eq!(backends.records.record_count(), 0);
}

#[actix_web::test]
async fn test_missing_fields_are_all_reported() {
    let app = app!(AppState::new_for_testing());

    let req = test::TestRequest::post()
        .uri("/file/add")
        .insert_header(("X-Acc-Type", "admin"))
        .set_json(json!({"metadata": {"upload_dt": "not a date"}}))
        .to_request();
    let added: Reply<String> = test::call_and_read_body_json(&app, req).await;
    let status = added.status;
    assert_eq!(
        status.error_keys(),
        vec!["content_type.err", "data.err", "metadata.err", "metadata.err.+"]
    );
    assert_eq!(
        status.nested("metadata.err.+").unwrap().message("upload_dt.err"),
        Some("invalid upload date")
    );
}

#[actix_web::test]
async fn test_permission_denied_never_touches_storage() {
    let (state, backends) = state_with(AppConfig::default());
    let app = app!(state);

    let req = test::TestRequest::post()
        .uri("/file/add")
        .set_json(upload_body("text/plain", b"anonymous upload"))
        .to_request();
    let added: Reply<String> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(added.status.error_keys(), vec!["permission.err"]);
    assert_eq!(backends.chunks.object_count(), 0);
    assert_eq!(backends.records.record_count(), 0);

    let req = test::TestRequest::post()
        .uri("/file/list")
        .insert_header(("X-Acc-Type", "client"))
        .to_request();
    let listed: Reply<Vec<FileData>> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(listed.status.message("permission.err"), Some("permission denied"));
}

#[actix_web::test]
async fn test_download_guard_failure_is_bad_request() {
    let mut config = AppConfig::default();
    config.permissions = gridvault::permissions::PermissionMatrix::empty();
    let (state, _backends) = state_with(config);
    let app = app!(state);

    let req = test::TestRequest::get().uri("/file/get/507f1f77bcf86cd799439011").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(test::read_body(resp).await.is_empty());
}

#[actix_web::test]
async fn test_unparsable_body_gets_generic_message() {
    let app = app!(AppState::new_for_testing());

    let req = test::TestRequest::post()
        .uri("/file/add")
        .insert_header(("X-Acc-Type", "admin"))
        .insert_header(("content-type", "application/json"))
        .set_payload("{\"content_type\": ")
        .to_request();
    let added: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(
        added,
        json!([{"code": "ERROR", "errors": {"message": "could not add file"}}])
    );
}

#[actix_web::test]
async fn test_object_larger_than_document_ceiling() {
    let mut config = AppConfig::default();
    config.chunks.chunk_size = 1024;
    config.chunks.max_document_size = 4096;
    let (state, backends) = state_with(config);
    let app = app!(state);

    let payload: Vec<u8> = (0..10_000u32).map(|i| (i * 7 % 256) as u8).collect();
    let req = test::TestRequest::post()
        .uri("/file/add")
        .insert_header(("X-Acc-Type", "agent"))
        .set_json(upload_body("application/octet-stream", &payload))
        .to_request();
    let added: Reply<String> = test::call_and_read_body_json(&app, req).await;
    let id = added.payload.unwrap();
    assert_eq!(backends.records.record_count(), 1);

    let req = test::TestRequest::post()
        .uri("/file/get")
        .set_json(json!(id))
        .to_request();
    let got: Reply<FileData> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(got.payload.unwrap().data.unwrap(), payload);

    let req = test::TestRequest::get().uri(&format!("/file/get/{}", id)).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(test::read_body(resp).await.as_ref(), payload.as_slice());
    assert_eq!(backends.chunks.open_readers(), 0);
}

#[actix_web::test]
async fn test_list_returns_metadata_only() {
    let app = app!(AppState::new_for_testing());

    for (content_type, data) in [("text/plain", &b"first"[..]), ("text/csv", &b"a,b"[..])] {
        let req = test::TestRequest::post()
            .uri("/file/add")
            .insert_header(("X-Acc-Type", "admin"))
            .set_json(upload_body(content_type, data))
            .to_request();
        let added: Reply<String> = test::call_and_read_body_json(&app, req).await;
        assert!(added.is_success());
    }

    let req = test::TestRequest::post()
        .uri("/file/list")
        .insert_header(("X-Acc-Type", "admin"))
        .to_request();
    let listed: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(listed[0]["code"], "SUCCESS");
    let files = listed[1].as_array().unwrap();
    assert_eq!(files.len(), 2);
    assert!(files.iter().all(|file| file.get("data").is_none()));
}

#[actix_web::test]
async fn test_large_object_on_disk_backends() {
    let dir = TempDir::new().unwrap();
    let path = |name: &str| dir.path().join(name).to_str().unwrap().to_string();

    let mut config = AppConfig::default();
    config.chunks.backend = ChunkBackend::Local;
    config.chunks.base_path = path("chunks");
    config.chunks.temp_path = path("tmp");
    config.chunks.chunk_size = 1024;
    config.chunks.max_document_size = 4096;
    config.records.backend = RecordBackend::SQLite;
    config.records.db_path = path("records.db");
    let app = app!(AppState::from_config(config).unwrap());

    let payload: Vec<u8> = (0..10_000u32).map(|i| (i * 13 % 256) as u8).collect();
    let req = test::TestRequest::post()
        .uri("/file/add")
        .insert_header(("X-Acc-Type", "agent"))
        .set_json(upload_body("application/octet-stream", &payload))
        .to_request();
    let added: Reply<String> = test::call_and_read_body_json(&app, req).await;
    assert!(added.is_success(), "{:?}", added.status);
    let id = added.payload.unwrap();

    let req = test::TestRequest::post()
        .uri("/file/get")
        .set_json(json!({"$oid": id}))
        .to_request();
    let got: Reply<FileData> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(got.payload.unwrap().data.unwrap(), payload);

    let req = test::TestRequest::get().uri(&format!("/file/get/{}", id)).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "application/octet-stream"
    );
    assert_eq!(test::read_body(resp).await.as_ref(), payload.as_slice());
}

#[actix_web::test]
async fn test_unread_download_releases_reader() {
    let (state, backends) = state_with(AppConfig::default());
    let app = app!(state);

    let req = test::TestRequest::post()
        .uri("/file/add")
        .insert_header(("X-Acc-Type", "agent"))
        .set_json(upload_body("text/plain", b"never read back"))
        .to_request();
    let added: Reply<String> = test::call_and_read_body_json(&app, req).await;
    let id = added.payload.unwrap();

    let req = test::TestRequest::get().uri(&format!("/file/get/{}", id)).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(backends.chunks.open_readers(), 1);

    drop(resp);
    assert_eq!(backends.chunks.open_readers(), 0);
}
