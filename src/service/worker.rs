//! Background worker that owns the service and answers controller messages.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::message::{ReplyError, ServiceReply, ServiceRequest};
use super::SuggestionService;
use crate::util::preview;

const QUEUE_DEPTH: usize = 32;

#[derive(Debug, Error)]
pub enum HandleError {
    #[error("service worker is not running")]
    Closed,
    #[error("service worker dropped the request without replying")]
    NoReply,
}

struct Envelope {
    request: ServiceRequest,
    reply: oneshot::Sender<ServiceReply>,
}

/// Cheap, cloneable sender side of the worker's queue.
#[derive(Clone)]
pub struct ServiceHandle {
    tx: mpsc::Sender<Envelope>,
}

impl ServiceHandle {
    /// Send one request and wait for its single reply.
    pub async fn request(&self, request: ServiceRequest) -> Result<ServiceReply, HandleError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Envelope {
                request,
                reply: reply_tx,
            })
            .await
            .map_err(|_| HandleError::Closed)?;
        reply_rx.await.map_err(|_| HandleError::NoReply)
    }
}

/// Answer a single request. Failures become an `Error` reply.
pub async fn handle_request(service: &SuggestionService, request: ServiceRequest) -> ServiceReply {
    debug!("Handling request for \"{}\"", preview(request.prompt(), 60));
    match request {
        ServiceRequest::RefinePrompt { prompt } => match service.refine(&prompt).await {
            Ok(result) => ServiceReply::Suggestions(result),
            Err(err) => {
                warn!("REFINE_PROMPT failed: {}", err);
                ServiceReply::Error(ReplyError::from(&err))
            }
        },
        ServiceRequest::RefineOptions { prompt } => match service.refine_options(&prompt).await {
            Ok(result) => ServiceReply::Options(result),
            Err(err) => {
                warn!("REFINE_OPTIONS failed: {}", err);
                ServiceReply::Error(ReplyError::from(&err))
            }
        },
    }
}

/// Start the worker. Requests are served concurrently; each gets at most one
/// reply. The worker stops once every handle is dropped.
pub fn spawn_worker(service: Arc<SuggestionService>) -> (ServiceHandle, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<Envelope>(QUEUE_DEPTH);

    let task = tokio::spawn(async move {
        debug!("Service worker started ({})", service.provider());
        while let Some(envelope) = rx.recv().await {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                let reply = handle_request(&service, envelope.request).await;
                if envelope.reply.send(reply).is_err() {
                    debug!("Requester went away before the reply was ready");
                }
            });
        }
        debug!("Service worker stopped");
    });

    (ServiceHandle { tx }, task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::MockLlmClient;

    fn mock_service() -> Arc<SuggestionService> {
        Arc::new(SuggestionService::new(Box::new(MockLlmClient::new())))
    }

    #[tokio::test]
    async fn test_refine_prompt_round_trip() {
        let (handle, _task) = spawn_worker(mock_service());
        let reply = handle
            .request(ServiceRequest::RefinePrompt {
                prompt: "Create a card grid layout".to_string(),
            })
            .await
            .unwrap();
        assert!(matches!(reply, ServiceReply::Suggestions(_)));
    }

    #[tokio::test]
    async fn test_concurrent_requests_each_get_their_reply() {
        let (handle, _task) = spawn_worker(mock_service());
        let (suggestions, options) = tokio::join!(
            handle.request(ServiceRequest::RefinePrompt {
                prompt: "cards".to_string()
            }),
            handle.request(ServiceRequest::RefineOptions {
                prompt: "cards".to_string()
            })
        );
        assert!(matches!(suggestions.unwrap(), ServiceReply::Suggestions(_)));
        assert!(matches!(options.unwrap(), ServiceReply::Options(_)));
    }

    #[tokio::test]
    async fn test_empty_prompt_yields_error_reply() {
        let reply = handle_request(
            &mock_service(),
            ServiceRequest::RefinePrompt {
                prompt: " ".to_string(),
            },
        )
        .await;
        assert!(matches!(reply, ServiceReply::Error(_)));
    }

    #[tokio::test]
    async fn test_stopped_worker_reports_closed() {
        let (handle, task) = spawn_worker(mock_service());
        task.abort();
        let _ = task.await;
        let err = handle
            .request(ServiceRequest::RefinePrompt {
                prompt: "x".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, HandleError::Closed));
    }
}
