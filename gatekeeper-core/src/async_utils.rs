//! Async utilities
//!
//! Every console operation runs against a [`CancelToken`]. Requests are never retried
//! and carry no timeout of their own; cancellation is the only way to abandon one.

use crate::error::{GatekeeperError, GatekeeperResult};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// Cooperative cancellation signal shared by a view and the operations it started
#[derive(Debug, Clone)]
pub struct CancelToken {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    /// Token for call sites that never cancel
    pub fn never() -> Self {
        Self::new()
    }

    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once [`CancelToken::cancel`] has been called on any clone
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        // The sender lives as long as any clone of the token, so this only errors
        // when no one can cancel anymore; park forever in that case.
        if receiver.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Race `future` against `token`, yielding `Cancelled` if the token wins
pub async fn run_cancellable<F, T>(
    future: F,
    token: &CancelToken,
    operation: &str,
) -> GatekeeperResult<T>
where
    F: Future<Output = GatekeeperResult<T>>,
{
    if token.is_cancelled() {
        return Err(GatekeeperError::Cancelled {
            operation: operation.to_string(),
        });
    }

    tokio::select! {
        biased;
        _ = token.cancelled() => {
            debug!(operation = operation, "Operation cancelled before completion");
            Err(GatekeeperError::Cancelled { operation: operation.to_string() })
        }
        result = future => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn completes_when_not_cancelled() {
        let token = CancelToken::new();
        let result = run_cancellable(async { Ok(7) }, &token, "answer").await;
        assert_eq!(result.ok(), Some(7));
    }

    #[tokio::test]
    async fn cancel_from_clone_interrupts_pending_future() {
        let token = CancelToken::new();
        let handle = token.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            handle.cancel();
        });

        let result: GatekeeperResult<()> = run_cancellable(
            async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            },
            &token,
            "slow",
        )
        .await;

        assert!(matches!(result, Err(GatekeeperError::Cancelled { .. })));
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn already_cancelled_token_short_circuits() {
        let token = CancelToken::new();
        token.cancel();
        let result = run_cancellable(async { Ok(1) }, &token, "noop").await;
        assert!(result.unwrap_err().is_cancelled());
    }
}
