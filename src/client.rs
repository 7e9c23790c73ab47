//! HTTP client for the file endpoints
//!
//! Runs the same operation guard as the server before sending anything, so
//! a request the server would reject never leaves the process. A failed
//! pre-flight comes back as an ordinary `[status]` reply.

use std::time::Duration;

use bytes::Bytes;
use log::debug;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::ClientError;
use crate::guard::{ensure_valid, FileCall};
use crate::model::FileData;
use crate::permissions::PermissionMatrix;
use crate::reply::Reply;
use crate::service::session::{SessionContext, ACC_ID_HEADER, ACC_TYPE_HEADER};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Raw bytes of a downloaded file with their content type
#[derive(Debug, Clone, PartialEq)]
pub struct Download {
    pub content_type: Option<String>,
    pub data: Bytes,
}

#[derive(Debug, Clone)]
pub struct FileClient {
    client: Client,
    base_url: String,
    session: SessionContext,
    permissions: PermissionMatrix,
}

impl FileClient {
    /// Client acting as `session`, checking calls against the default permission matrix
    pub fn new(base_url: impl Into<String>, session: SessionContext) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| ClientError::Configuration(e.to_string()))?;
        Ok(Self::with_client(client, base_url, session))
    }

    pub fn with_client(
        client: Client,
        base_url: impl Into<String>,
        session: SessionContext,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
            permissions: PermissionMatrix::default(),
        }
    }

    /// Use the server's permission matrix for the pre-flight
    pub fn permissions(mut self, permissions: PermissionMatrix) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn with_session(&self, req: RequestBuilder) -> RequestBuilder {
        let req = match &self.session.acc_type {
            Some(acc_type) => req.header(ACC_TYPE_HEADER, acc_type),
            None => req,
        };
        match &self.session.acc_id {
            Some(acc_id) => req.header(ACC_ID_HEADER, acc_id),
            None => req,
        }
    }

    async fn post<B, T>(&self, path: &str, body: Option<&B>) -> Result<Reply<T>, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.with_session(self.client.post(&url));
        if let Some(body) = body {
            req = req.json(body);
        }

        let response = req.send().await.map_err(|e| ClientError::Connection(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Http {
                status: status.as_u16(),
                message,
            });
        }
        response
            .json::<Reply<T>>()
            .await
            .map_err(|e| ClientError::Deserialization(e.to_string()))
    }

    /// Upload a file; the reply carries the id assigned by the server
    pub async fn add(&self, file: &FileData) -> Result<Reply<String>, ClientError> {
        let value =
            serde_json::to_value(file).map_err(|e| ClientError::Configuration(e.to_string()))?;
        let call = FileCall::Add(Some(&value));
        if let Err(status) = ensure_valid(&self.permissions, self.session.role(), &call) {
            debug!("add pre-flight failed: {:?}", status.error_keys());
            return Ok(Reply::failed(status));
        }
        self.post("/file/add", Some(&value)).await
    }

    /// Fetch a file with its payload
    pub async fn get(&self, file_id: &str) -> Result<Reply<FileData>, ClientError> {
        let value = Value::String(file_id.to_string());
        let call = FileCall::Get(Some(&value));
        if let Err(status) = ensure_valid(&self.permissions, self.session.role(), &call) {
            debug!("get pre-flight failed: {:?}", status.error_keys());
            return Ok(Reply::failed(status));
        }
        self.post("/file/get", Some(&value)).await
    }

    /// List stored files without their payloads
    pub async fn list(&self) -> Result<Reply<Vec<FileData>>, ClientError> {
        if let Err(status) = ensure_valid(&self.permissions, self.session.role(), &FileCall::List) {
            debug!("list pre-flight failed: {:?}", status.error_keys());
            return Ok(Reply::failed(status));
        }
        self.post::<Value, _>("/file/list", None).await
    }

    /// Direct download URL; the id is percent-encoded as a single path segment
    fn download_url(&self, file_id: &str) -> Result<Url, ClientError> {
        let mut url =
            Url::parse(&self.base_url).map_err(|e| ClientError::Configuration(e.to_string()))?;
        let base = &self.base_url;
        url.path_segments_mut()
            .map_err(|_| ClientError::Configuration(format!("{} is not a base URL", base)))?
            .pop_if_empty()
            .extend(["file", "get", file_id]);
        Ok(url)
    }

    /// Download raw bytes. `None` when the server has no such file.
    pub async fn download(&self, file_id: &str) -> Result<Option<Download>, ClientError> {
        let url = self.download_url(file_id)?;
        let response = self
            .with_session(self.client.get(url))
            .send()
            .await
            .map_err(|e| ClientError::Connection(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let content_type = response
                    .headers()
                    .get(reqwest::header::CONTENT_TYPE)
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_string);
                let data = response
                    .bytes()
                    .await
                    .map_err(|e| ClientError::Connection(e.to_string()))?;
                Ok(Some(Download { content_type, data }))
            }
            status => Err(ClientError::Http {
                status: status.as_u16(),
                message: String::new(),
            }),
        }
    }
}
