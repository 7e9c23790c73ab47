//! HTTP endpoints for the file resource
//!
//! Every endpoint runs the operation guard before touching storage. The
//! POST endpoints always answer 200 with a `[status]` or `[status, payload]`
//! array; the direct download answers with raw bytes or an empty error body.

use actix_web::{get, post, web, HttpRequest, HttpResponse};
use bytes::Bytes;
use futures::Stream;
use log::{debug, error, warn};
use serde::Serialize;
use serde_json::Value;

use crate::app_state::AppState;
use crate::chunks::ChunkCursor;
use crate::error::StoreError;
use crate::guard::{ensure_valid, FileCall};
use crate::ids::id_to_string;
use crate::model::FileData;
use crate::reply::Reply;
use crate::service::file_service::{ADD_FAILED, GET_FAILED, LIST_FAILED};
use crate::service::SessionContext;

fn reply<T: Serialize>(reply: &Reply<T>) -> HttpResponse {
    HttpResponse::Ok().json(reply)
}

fn failure(message: &str) -> HttpResponse {
    reply(&Reply::<()>::message(message))
}

/// Parse a JSON request body; an empty body is an absent value
fn parse_body(body: &[u8]) -> Result<Option<Value>, serde_json::Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body).map(Some)
}

/// Stream a cursor's chunks, reading each one on the blocking pool.
/// Dropping the stream drops the cursor and releases its reader.
fn chunk_stream(cursor: ChunkCursor) -> impl Stream<Item = Result<Bytes, StoreError>> {
    futures::stream::unfold(Some(cursor), |state| async move {
        let mut cursor = state?;
        let read = web::block(move || {
            let chunk = cursor.next();
            (chunk, cursor)
        })
        .await;
        match read {
            Ok((Some(chunk), cursor)) => Some((chunk, Some(cursor))),
            Ok((None, _)) => None,
            Err(e) => Some((Err(StoreError::Backend(e.to_string())), None)),
        }
    })
}

#[post("/file/add")]
pub async fn add_file(
    body: web::Bytes,
    req: HttpRequest,
    app_state: web::Data<AppState>,
) -> HttpResponse {
    let session = SessionContext::from_request(&req);
    let value = match parse_body(&body) {
        Ok(value) => value,
        Err(e) => {
            warn!("Unparsable add body: {}", e);
            return failure(ADD_FAILED);
        }
    };

    let call = FileCall::Add(value.as_ref());
    if let Err(status) = ensure_valid(&app_state.permissions, session.role(), &call) {
        debug!("add rejected: {:?}", status.error_keys());
        return reply(&Reply::<String>::failed(status));
    }

    let file = match value.map(serde_json::from_value::<FileData>).transpose() {
        Ok(Some(file)) => file,
        Ok(None) => return failure(ADD_FAILED),
        Err(e) => {
            error!("Validated file could not be decoded: {}", e);
            return failure(ADD_FAILED);
        }
    };

    let service = app_state.file_service.clone();
    match web::block(move || service.add(&session, &file)).await {
        Ok(result) => reply(&result),
        Err(e) => {
            error!("add task failed: {}", e);
            failure(ADD_FAILED)
        }
    }
}

#[post("/file/get")]
pub async fn get_file(
    body: web::Bytes,
    req: HttpRequest,
    app_state: web::Data<AppState>,
) -> HttpResponse {
    let session = SessionContext::from_request(&req);
    let value = match parse_body(&body) {
        Ok(value) => value,
        Err(e) => {
            warn!("Unparsable get body: {}", e);
            return failure(GET_FAILED);
        }
    };

    let call = FileCall::Get(value.as_ref());
    if let Err(status) = ensure_valid(&app_state.permissions, session.role(), &call) {
        debug!("get rejected: {:?}", status.error_keys());
        return reply(&Reply::<FileData>::failed(status));
    }

    let Some(file_id) = value.as_ref().and_then(id_to_string) else {
        return failure(GET_FAILED);
    };

    let service = app_state.file_service.clone();
    match web::block(move || service.get(&file_id)).await {
        Ok(result) => reply(&result),
        Err(e) => {
            error!("get task failed: {}", e);
            failure(GET_FAILED)
        }
    }
}

#[post("/file/list")]
pub async fn list_files(req: HttpRequest, app_state: web::Data<AppState>) -> HttpResponse {
    let session = SessionContext::from_request(&req);
    if let Err(status) = ensure_valid(&app_state.permissions, session.role(), &FileCall::List) {
        debug!("list rejected: {:?}", status.error_keys());
        return reply(&Reply::<Vec<FileData>>::failed(status));
    }

    let service = app_state.file_service.clone();
    match web::block(move || service.list()).await {
        Ok(result) => reply(&result),
        Err(e) => {
            error!("list task failed: {}", e);
            failure(LIST_FAILED)
        }
    }
}

/// Stream a file's bytes with its stored content type
#[get("/file/get/{file_id}")]
pub async fn download_file(
    path: web::Path<String>,
    req: HttpRequest,
    app_state: web::Data<AppState>,
) -> HttpResponse {
    let session = SessionContext::from_request(&req);
    let file_id = path.into_inner();

    let param = Value::String(file_id.clone());
    let call = FileCall::Get(Some(&param));
    if let Err(status) = ensure_valid(&app_state.permissions, session.role(), &call) {
        debug!("download of {} rejected: {:?}", file_id, status.error_keys());
        return HttpResponse::BadRequest().finish();
    }

    let service = app_state.file_service.clone();
    let opened = match web::block(move || service.open(&file_id)).await {
        Ok(opened) => opened,
        Err(e) => {
            error!("download task failed: {}", e);
            return HttpResponse::NotFound().finish();
        }
    };

    match opened.payload {
        Some(download) => HttpResponse::Ok()
            .content_type(download.record.content_type.as_str())
            .no_chunking(download.record.length)
            .streaming(chunk_stream(download.cursor)),
        None => HttpResponse::NotFound().finish(),
    }
}

/// Register every file endpoint
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(add_file)
        .service(get_file)
        .service(list_files)
        .service(download_file);
}
