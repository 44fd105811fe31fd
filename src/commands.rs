//! Operations behind the `arqia` subcommands.

use crate::api::ApiClient;
use crate::config::Config;
use crate::error::ApiError;
use crate::models::{DocumentFilters, PageSize, SortKey};
use crate::services::detail_poller::{DetailPoller, DetailState, DocumentSource, PollConfig, PollOutcome};
use crate::services::document_list::{DocumentListController, DocumentLister, ListPage};
use crate::session::Session;
use crate::types::{DocumentRecord, UploadReceipt};
use std::path::Path;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

pub struct AppContext {
    pub config: Config,
    pub api: ApiClient,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self, ApiError> {
        let api = ApiClient::from_config(&config)?;
        Ok(Self { config, api })
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            interval: self.config.poll_interval,
            max_attempts: self.config.poll_max_attempts,
        }
    }
}

/// Ways to obtain a session, in order of preference: a saved access token, then a login.
#[derive(Clone, Default)]
pub struct Credentials {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Reuse a still-valid access token, else log in with username/password.
pub async fn resolve_session(ctx: &AppContext, creds: &Credentials) -> Result<Session, ApiError> {
    if let Some(access) = creds.access_token.as_deref() {
        let session = Session::new(
            creds.username.clone().unwrap_or_default(),
            access,
            creds.refresh_token.clone().unwrap_or_default(),
        );
        match session.ensure_active() {
            Ok(()) => return Ok(session),
            Err(_) => tracing::info!("saved access token expired"),
        }
    }
    match (creds.username.as_deref(), creds.password.as_deref()) {
        (Some(username), Some(password)) => login(ctx, username, password).await,
        _ => Err(ApiError::Unauthenticated),
    }
}

pub async fn login(ctx: &AppContext, username: &str, password: &str) -> Result<Session, ApiError> {
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return Err(ApiError::InvalidCredentials);
    }
    ctx.api.login(username, password).await
}

pub async fn upload(
    ctx: &AppContext,
    session: &Session,
    path: &Path,
    category: &str,
) -> Result<UploadReceipt, ApiError> {
    ctx.api.upload_document(session, path, category).await
}

/// Filters, ordering and page for a one-shot listing.
#[derive(Debug, Clone, Default)]
pub struct ListRequest {
    pub filters: DocumentFilters,
    pub sort: SortKey,
    pub page_size: PageSize,
    pub page: usize,
}

/// Fetch with the request's filters, then filter, sort and page locally.
pub async fn list_page<L: DocumentLister>(lister: &L, request: &ListRequest) -> Result<ListPage, ApiError> {
    let documents = lister.list_documents(&request.filters).await?;
    let mut controller = DocumentListController::new();
    controller.apply_filters(request.filters.clone());
    controller.set_documents(documents);
    controller.set_sort(request.sort);
    controller.set_page_size(request.page_size);
    controller.set_page(request.page);
    Ok(controller.view())
}

pub async fn list(ctx: &AppContext, session: &Session, request: &ListRequest) -> Result<ListPage, ApiError> {
    list_page(&ctx.api.with_session(session), request).await
}

pub async fn show(ctx: &AppContext, session: &Session, id: &str) -> Result<DocumentRecord, ApiError> {
    ctx.api.get_document(session, id).await
}

/// Run the poller and hand every published state to `on_update` as it arrives.
pub async fn watch_with<S, F>(
    poller: &DetailPoller,
    source: &S,
    id: &str,
    cancel: &CancellationToken,
    mut on_update: F,
) -> PollOutcome
where
    S: DocumentSource,
    F: FnMut(&DetailState),
{
    let (tx, mut rx) = watch::channel(DetailState::default());
    let run = poller.run(source, id, cancel, &tx);
    tokio::pin!(run);

    loop {
        tokio::select! {
            outcome = &mut run => {
                if rx.has_changed().unwrap_or(false) {
                    let state = rx.borrow_and_update().clone();
                    on_update(&state);
                }
                return outcome;
            }
            Ok(()) = rx.changed() => {
                let state = rx.borrow_and_update().clone();
                on_update(&state);
            }
        }
    }
}

pub async fn watch_document<F>(
    ctx: &AppContext,
    session: &Session,
    id: &str,
    cancel: &CancellationToken,
    on_update: F,
) -> PollOutcome
where
    F: FnMut(&DetailState),
{
    let poller = DetailPoller::new(ctx.poll_config());
    watch_with(&poller, &ctx.api.with_session(session), id, cancel, on_update).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FilterField;
    use crate::normalize::normalize_document;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    struct FixedLister(Vec<DocumentRecord>);

    impl DocumentLister for FixedLister {
        async fn list_documents(&self, _filters: &DocumentFilters) -> Result<Vec<DocumentRecord>, ApiError> {
            Ok(self.0.clone())
        }
    }

    struct FailingLister;

    impl DocumentLister for FailingLister {
        async fn list_documents(&self, _filters: &DocumentFilters) -> Result<Vec<DocumentRecord>, ApiError> {
            Err(ApiError::Timeout)
        }
    }

    fn numbered(n: i64) -> DocumentRecord {
        normalize_document(&json!({
            "id": n,
            "fornecedor": format!("Fornecedor {:02}", n),
            "valor": n * 10,
            "data_emissao": format!("2024-01-{:02}", n),
        }))
    }

    #[tokio::test]
    async fn list_page_sorts_and_clamps() {
        let lister = FixedLister((1..=25).map(numbered).collect());
        let request = ListRequest {
            page: 9,
            sort: SortKey::AmountAsc,
            ..Default::default()
        };
        let page = list_page(&lister, &request).await.unwrap();
        assert_eq!(page.page, 3);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items.len(), 5);
        assert_eq!(page.items[0].id, Some(21));
        assert_eq!(page.summary(), "25 results · Page 3 of 3");
    }

    #[tokio::test]
    async fn list_page_applies_filters_locally() {
        let lister = FixedLister((1..=25).map(numbered).collect());
        let mut filters = DocumentFilters::default();
        filters.set(FilterField::AmountMin, "200");
        let request = ListRequest {
            filters,
            page_size: PageSize::Twenty,
            ..Default::default()
        };
        let page = list_page(&lister, &request).await.unwrap();
        assert_eq!(page.total_results, 6);
        assert_eq!(page.items[0].id, Some(25));
    }

    #[tokio::test]
    async fn list_page_propagates_fetch_errors() {
        let err = list_page(&FailingLister, &ListRequest::default()).await.unwrap_err();
        assert!(matches!(err, ApiError::Timeout));
    }

    struct Script(Mutex<VecDeque<&'static str>>);

    impl DocumentSource for Script {
        async fn fetch_document(&self, _id: &str) -> Result<DocumentRecord, ApiError> {
            let status = self.0.lock().unwrap().pop_front().unwrap_or("completed");
            Ok(normalize_document(&json!({ "id": 4, "status": status })))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn watch_reports_final_state() {
        let source = Script(Mutex::new(VecDeque::from(["queued", "processing", "done"])));
        let poller = DetailPoller::new(PollConfig {
            interval: Duration::from_millis(100),
            max_attempts: 10,
        });
        let mut seen = Vec::new();
        let outcome = watch_with(&poller, &source, "4", &CancellationToken::new(), |state| {
            if let Some(doc) = &state.document {
                seen.push(doc.status_label.clone());
            }
        })
        .await;

        assert!(matches!(outcome, PollOutcome::Settled(_)));
        assert_eq!(seen.last().map(String::as_str), Some("Completed"));
        assert!(seen.contains(&"Processing".to_string()));
    }

    #[tokio::test]
    async fn expired_token_without_password_is_unauthenticated() {
        let config = Config::from_lookup(|name| {
            (name == "ARQIA_API_BASE_URL").then(|| "http://127.0.0.1:9".to_string())
        })
        .unwrap();
        let ctx = AppContext::new(config).unwrap();
        // {"exp":1} -> expired long ago
        let creds = Credentials {
            access_token: Some("e30.eyJleHAiOjF9.sig".into()),
            ..Default::default()
        };
        let err = resolve_session(&ctx, &creds).await.unwrap_err();
        assert!(err.is_unauthenticated());

        let opaque = Credentials {
            access_token: Some("opaque-token".into()),
            username: Some("ana".into()),
            ..Default::default()
        };
        let session = resolve_session(&ctx, &opaque).await.unwrap();
        assert_eq!(session.username, "ana");
        assert_eq!(session.bearer(), "Bearer opaque-token");
    }
}
