//! Fetch one document and keep re-fetching while its analysis is still running.

use crate::config::{DEFAULT_POLL_INTERVAL_MS, DEFAULT_POLL_MAX_ATTEMPTS};
use crate::error::{ApiError, DETAIL_LOAD_ERROR};
use crate::types::{DocumentRecord, DocumentStatus};
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Anything that can fetch a single document by id.
pub trait DocumentSource {
    fn fetch_document(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<DocumentRecord, ApiError>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    /// Re-fetches allowed after the first fetch.
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_attempts: DEFAULT_POLL_MAX_ATTEMPTS,
        }
    }
}

/// What the detail view renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailState {
    pub document: Option<DocumentRecord>,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Status is terminal (or unrecognised); nothing left to wait for.
    Settled(DocumentRecord),
    /// Still running when the attempt budget ran out.
    AttemptsExhausted(DocumentRecord),
    /// A fetch failed; no further poll was scheduled.
    FetchFailed(String),
    Cancelled,
}

/// Text shown under the status line of the detail view.
pub fn status_notice(doc: &DocumentRecord) -> Option<String> {
    match doc.status_code? {
        DocumentStatus::Pending | DocumentStatus::Processing => {
            Some("Analysis in progress. This view refreshes automatically.".to_string())
        }
        DocumentStatus::Failed => Some(if doc.error_message.trim().is_empty() {
            "The document could not be processed.".to_string()
        } else {
            doc.error_message.clone()
        }),
        DocumentStatus::Completed => Some(if doc.analysis_result.trim().is_empty() {
            "No result available.".to_string()
        } else {
            doc.analysis_result.clone()
        }),
    }
}

#[derive(Debug, Clone, Default)]
pub struct DetailPoller {
    config: PollConfig,
}

impl DetailPoller {
    pub fn new(config: PollConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> PollConfig {
        self.config
    }

    /// Poll `id` until it settles, the attempt budget runs out, a fetch fails, or
    /// `cancel` fires. Every update goes to `state`; nothing is published once the
    /// token is cancelled, including a fetch that was already in flight.
    #[tracing::instrument(level = "debug", skip_all, fields(id = %id))]
    pub async fn run<S: DocumentSource>(
        &self,
        source: &S,
        id: &str,
        cancel: &CancellationToken,
        state: &watch::Sender<DetailState>,
    ) -> PollOutcome {
        let mut scheduled = 0u32;
        if cancel.is_cancelled() {
            return PollOutcome::Cancelled;
        }
        state.send_modify(|s| s.loading = true);

        loop {
            state.send_modify(|s| s.error = None);

            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => return PollOutcome::Cancelled,
                result = source.fetch_document(id) => result,
            };
            if cancel.is_cancelled() {
                return PollOutcome::Cancelled;
            }

            let document = match fetched {
                Ok(doc) => doc,
                Err(e) => {
                    tracing::warn!(error = %e, "document fetch failed");
                    let message = e.user_message(DETAIL_LOAD_ERROR);
                    state.send_modify(|s| {
                        s.error = Some(message.clone());
                        s.loading = false;
                    });
                    return PollOutcome::FetchFailed(message);
                }
            };

            tracing::debug!(status = %document.status_label, attempt = scheduled, "document fetched");
            state.send_modify(|s| {
                s.document = Some(document.clone());
                s.loading = false;
            });

            if !document.is_in_progress() {
                return PollOutcome::Settled(document);
            }
            if scheduled >= self.config.max_attempts {
                tracing::info!(attempts = scheduled, "polling budget exhausted");
                return PollOutcome::AttemptsExhausted(document);
            }
            scheduled += 1;

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return PollOutcome::Cancelled,
                _ = tokio::time::sleep(self.config.interval) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize_document;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn doc(status: &str) -> DocumentRecord {
        normalize_document(&json!({ "id": 7, "nome_arquivo": "nota.pdf", "status": status }))
    }

    /// Replays a fixed list of responses; optionally cancels a token while serving a call.
    #[derive(Default)]
    struct ScriptedSource {
        responses: Mutex<VecDeque<Result<DocumentRecord, ApiError>>>,
        calls: AtomicUsize,
        cancel_on_call: Option<(usize, CancellationToken)>,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Result<DocumentRecord, ApiError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                ..Default::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn remaining(&self) -> usize {
            self.responses.lock().unwrap().len()
        }
    }

    impl DocumentSource for ScriptedSource {
        async fn fetch_document(&self, _id: &str) -> Result<DocumentRecord, ApiError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some((at, token)) = &self.cancel_on_call {
                if *at == call {
                    token.cancel();
                }
            }
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ApiError::Network("script exhausted".into())))
        }
    }

    fn poller(max_attempts: u32) -> DetailPoller {
        DetailPoller::new(PollConfig {
            interval: Duration::from_millis(2500),
            max_attempts,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn stops_after_terminal_status() {
        let source = ScriptedSource::new(vec![
            Ok(doc("pending")),
            Ok(doc("processing")),
            Ok(doc("completed")),
            Ok(doc("completed")),
        ]);
        let (tx, rx) = watch::channel(DetailState::default());
        let cancel = CancellationToken::new();

        let outcome = poller(40).run(&source, "7", &cancel, &tx).await;

        assert_eq!(outcome, PollOutcome::Settled(doc("completed")));
        assert_eq!(source.calls(), 3);
        assert_eq!(source.remaining(), 1);
        let state = rx.borrow().clone();
        assert_eq!(state.document, Some(doc("completed")));
        assert!(!state.loading);
        assert_eq!(state.error, None);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_the_interval_between_fetches() {
        let source = ScriptedSource::new(vec![Ok(doc("queued")), Ok(doc("done"))]);
        let (tx, _rx) = watch::channel(DetailState::default());
        let start = tokio::time::Instant::now();
        poller(40).run(&source, "7", &CancellationToken::new(), &tx).await;
        assert!(start.elapsed() >= Duration::from_millis(2500));
        assert!(start.elapsed() < Duration::from_millis(5000));
    }

    #[tokio::test(start_paused = true)]
    async fn attempt_budget_is_a_hard_cap() {
        let source = ScriptedSource::new((0..10).map(|_| Ok(doc("pending"))).collect());
        let (tx, _rx) = watch::channel(DetailState::default());
        let outcome = poller(3).run(&source, "7", &CancellationToken::new(), &tx).await;
        assert_eq!(outcome, PollOutcome::AttemptsExhausted(doc("pending")));
        assert_eq!(source.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_fetch_halts_polling() {
        let source = ScriptedSource::new(vec![
            Ok(doc("processing")),
            Err(ApiError::Timeout),
            Ok(doc("completed")),
        ]);
        let (tx, rx) = watch::channel(DetailState::default());
        let outcome = poller(40).run(&source, "7", &CancellationToken::new(), &tx).await;

        assert_eq!(outcome, PollOutcome::FetchFailed(DETAIL_LOAD_ERROR.to_string()));
        assert_eq!(source.calls(), 2);
        let state = rx.borrow().clone();
        assert_eq!(state.error.as_deref(), Some(DETAIL_LOAD_ERROR));
        assert_eq!(state.document, Some(doc("processing")));
    }

    #[tokio::test(start_paused = true)]
    async fn result_arriving_after_cancel_is_discarded() {
        let cancel = CancellationToken::new();
        let source = ScriptedSource {
            cancel_on_call: Some((1, cancel.clone())),
            ..ScriptedSource::new(vec![Ok(doc("completed"))])
        };
        let (tx, rx) = watch::channel(DetailState::default());
        let outcome = poller(40).run(&source, "7", &cancel, &tx).await;

        assert_eq!(outcome, PollOutcome::Cancelled);
        assert_eq!(rx.borrow().document, None);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_wait_stops_polling() {
        let source = Arc::new(ScriptedSource::new(
            (0..5).map(|_| Ok(doc("processing"))).collect(),
        ));
        let (tx, mut rx) = watch::channel(DetailState::default());
        let cancel = CancellationToken::new();

        let task = {
            let source = source.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { poller(40).run(&*source, "7", &cancel, &tx).await })
        };

        rx.wait_for(|s| s.document.is_some()).await.unwrap();
        cancel.cancel();

        assert_eq!(task.await.unwrap(), PollOutcome::Cancelled);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn already_cancelled_token_publishes_nothing() {
        let source = ScriptedSource::new(vec![Ok(doc("completed"))]);
        let (tx, rx) = watch::channel(DetailState::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = poller(40).run(&source, "7", &cancel, &tx).await;

        assert_eq!(outcome, PollOutcome::Cancelled);
        assert_eq!(source.calls(), 0);
        assert!(!rx.has_changed().unwrap());
        assert_eq!(*rx.borrow(), DetailState::default());
    }

    #[test]
    fn notices_per_status() {
        assert!(status_notice(&doc("pending")).unwrap().contains("in progress"));
        assert_eq!(
            status_notice(&doc("failed")).as_deref(),
            Some("The document could not be processed.")
        );
        let mut done = doc("done");
        assert_eq!(status_notice(&done).as_deref(), Some("No result available."));
        done.analysis_result = "CNPJ ativo".into();
        assert_eq!(status_notice(&done).as_deref(), Some("CNPJ ativo"));
        assert_eq!(status_notice(&doc("archived")), None);
    }
}
