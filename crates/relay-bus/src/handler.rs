//! # Subscriber Handlers
//!
//! A handler receives every envelope whose topic matches the pattern it was
//! registered under and reports whether it handled the message.

use crate::error::HandlerError;
use async_trait::async_trait;
use relay_types::Envelope;
use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinError;

/// Result of a single handler invocation: `Ok(true)` handled,
/// `Ok(false)` declined.
pub type HandlerResult = Result<bool, HandlerError>;

/// Trait implemented by subscribers.
///
/// Handlers run on their own tokio task, concurrently with the other
/// handlers of the same publish. The envelope carries the metadata.
#[async_trait]
pub trait MessageHandler<P>: Send + Sync {
    async fn handle(&self, envelope: Arc<Envelope<P>>) -> HandlerResult;
}

#[async_trait]
impl<P, F, Fut> MessageHandler<P> for F
where
    P: Send + Sync + 'static,
    F: Fn(Arc<Envelope<P>>) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    async fn handle(&self, envelope: Arc<Envelope<P>>) -> HandlerResult {
        (self)(envelope).await
    }
}

/// Outcome of one handler invocation, kept for logging and statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutcome {
    Handled,
    Declined,
    Failed(HandlerError),
}

impl HandlerOutcome {
    /// Classify a joined handler task.
    pub(crate) fn from_join(result: Result<HandlerResult, JoinError>) -> Self {
        match result {
            Ok(Ok(true)) => Self::Handled,
            Ok(Ok(false)) => Self::Declined,
            Ok(Err(err)) => Self::Failed(err),
            Err(join_err) if join_err.is_panic() => {
                Self::Failed(HandlerError::Panicked(panic_message(join_err.into_panic())))
            }
            Err(join_err) => Self::Failed(HandlerError::Failed(join_err.to_string())),
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
