//! HTTP client for the ARQIA document-analysis API.

use crate::config::Config;
use crate::error::ApiError;
use crate::models::DocumentFilters;
use crate::normalize::{document_list_payload, normalize_document, normalize_documents};
use crate::services::detail_poller::DocumentSource;
use crate::services::document_list::DocumentLister;
use crate::session::Session;
use crate::types::{DocumentRecord, UploadReceipt};
use crate::upload::validate_upload;
use reqwest::{multipart, Client, Response, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;

const TOKEN_PATH: &str = "/api/token/";
const ANALYZE_PATH: &str = "/api/analisar/";
const DOCUMENTS_PATH: &str = "/api/documentos/";

/// Keys that may carry the new document's id in the analysis response.
const DOCUMENT_ID_KEYS: &[&str] = &["documento_id", "document_id", "id"];
/// Keys that may carry the server's explanation for a refused upload.
const UPLOAD_ERROR_KEYS: &[&str] = &["erro", "detail"];

#[derive(Serialize)]
struct TokenRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    client: Client,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::from_reqwest)?;
        Ok(Self {
            base_url: crate::config::normalize_base_url(base_url),
            client,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        Self::new(&config.api_base_url, config.http_timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Exchange credentials for an access/refresh pair.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, ApiError> {
        let url = self.url(TOKEN_PATH);
        tracing::debug!(%url, username, "requesting token");
        let response = self
            .client
            .post(&url)
            .json(&TokenRequest { username, password })
            .send()
            .await
            .map_err(ApiError::from_reqwest)?;

        let status = response.status();
        if status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        if !status.is_success() {
            tracing::info!(username, %status, "login rejected");
            return Err(ApiError::InvalidCredentials);
        }

        let body: Value = response.json().await.map_err(ApiError::from_reqwest)?;
        let text = |key: &str| {
            body.get(key)
                .and_then(|v| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        };
        let access = text("access").ok_or(ApiError::InvalidCredentials)?;
        let refresh = text("refresh").unwrap_or_default();
        tracing::info!(username, "logged in");
        Ok(Session::new(username, access, refresh))
    }

    /// Fetch the document list; non-empty filters are also sent as query parameters.
    pub async fn list_documents(
        &self,
        session: &Session,
        filters: &DocumentFilters,
    ) -> Result<Vec<DocumentRecord>, ApiError> {
        session.ensure_active()?;
        let url = self.url(DOCUMENTS_PATH);
        let params = filters.query_params();
        tracing::debug!(%url, ?params, "listing documents");
        let response = self
            .client
            .get(&url)
            .query(&params)
            .header(reqwest::header::AUTHORIZATION, session.bearer())
            .send()
            .await
            .map_err(ApiError::from_reqwest)?;
        let body = json_body(response).await?;
        let documents = normalize_documents(document_list_payload(&body));
        tracing::info!(count = documents.len(), "documents loaded");
        Ok(documents)
    }

    pub async fn get_document(&self, session: &Session, id: &str) -> Result<DocumentRecord, ApiError> {
        session.ensure_active()?;
        let id = id.trim();
        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ApiError::InvalidDocumentId(id.to_string()));
        }
        let url = self.url(&format!("{}{}/", DOCUMENTS_PATH, id));
        tracing::debug!(%url, "fetching document");
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, session.bearer())
            .send()
            .await
            .map_err(ApiError::from_reqwest)?;
        let body = json_body(response).await?;
        Ok(normalize_document(&body))
    }

    /// Validate locally, then send the PDF and its category for analysis.
    pub async fn upload_document(
        &self,
        session: &Session,
        path: &Path,
        category: &str,
    ) -> Result<UploadReceipt, ApiError> {
        session.ensure_active()?;
        let upload = validate_upload(path, category)?;
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ApiError::Upload(e.into()))?;

        let part = multipart::Part::bytes(bytes)
            .file_name(upload.file_name.clone())
            .mime_str("application/pdf")
            .map_err(ApiError::from_reqwest)?;
        let form = multipart::Form::new()
            .part("arquivo", part)
            .text("categoria", upload.category);

        let url = self.url(ANALYZE_PATH);
        tracing::debug!(%url, file = %upload.file_name, size = upload.size, category = upload.category, "uploading document");
        let response = self
            .client
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, session.bearer())
            .multipart(form)
            .send()
            .await
            .map_err(ApiError::from_reqwest)?;

        let status = response.status();
        if is_auth_failure(status) {
            return Err(ApiError::Unauthenticated);
        }
        let text = response.text().await.map_err(ApiError::from_reqwest)?;
        let body: Value = serde_json::from_str(&text).unwrap_or(Value::Null);

        if !status.is_success() {
            if let Some(message) = first_string(&body, UPLOAD_ERROR_KEYS) {
                return Err(ApiError::Rejected(message));
            }
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let document_id = first_string(&body, DOCUMENT_ID_KEYS).ok_or(ApiError::MissingDocumentId)?;
        tracing::info!(%document_id, file = %upload.file_name, "document submitted for analysis");
        Ok(UploadReceipt { document_id })
    }

    /// Bind a session for calls that need one, such as the detail poller.
    pub fn with_session<'a>(&'a self, session: &'a Session) -> SessionClient<'a> {
        SessionClient { api: self, session }
    }
}

fn is_auth_failure(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}

/// Success body as JSON; auth failures and other non-2xx statuses become errors.
async fn json_body(response: Response) -> Result<Value, ApiError> {
    let status = response.status();
    if is_auth_failure(status) {
        return Err(ApiError::Unauthenticated);
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::Status {
            status: status.as_u16(),
            body,
        });
    }
    response.json().await.map_err(ApiError::from_reqwest)
}

/// First key holding a non-empty string or a number, as text.
fn first_string(body: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| body.get(*k))
        .find_map(|v| match v {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

/// An [`ApiClient`] paired with the session its requests run under.
#[derive(Debug, Clone, Copy)]
pub struct SessionClient<'a> {
    api: &'a ApiClient,
    session: &'a Session,
}

impl DocumentSource for SessionClient<'_> {
    async fn fetch_document(&self, id: &str) -> Result<DocumentRecord, ApiError> {
        self.api.get_document(self.session, id).await
    }
}

impl DocumentLister for SessionClient<'_> {
    async fn list_documents(&self, filters: &DocumentFilters) -> Result<Vec<DocumentRecord>, ApiError> {
        self.api.list_documents(self.session, filters).await
    }
}
