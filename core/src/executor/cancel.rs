use std::future::Future;

use tokio::sync::watch;

use crate::error::CrewError;

/// Signals cancellation to every task of a run.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

/// Observes cancellation. Cloned into every controller.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: Option<watch::Receiver<bool>>,
}

pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx: Some(rx) })
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: Some(self.tx.subscribe()),
        }
    }
}

impl CancelToken {
    /// A token that is never cancelled.
    pub fn never() -> Self {
        Self { rx: None }
    }

    pub fn is_cancelled(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolves once cancellation is signalled. Pends forever if the handle
    /// is dropped without cancelling.
    pub async fn cancelled(&self) {
        let Some(mut rx) = self.rx.clone() else {
            return std::future::pending().await;
        };
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                return std::future::pending().await;
            }
        }
    }

    /// Race `fut` against cancellation. In-flight service calls are dropped
    /// when the run is cancelled.
    pub async fn guard<F: Future>(&self, fut: F) -> Result<F::Output, CrewError> {
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(CrewError::Cancelled),
            out = fut => Ok(out),
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::never()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_guard_passes_through_when_not_cancelled() {
        let token = CancelToken::never();
        assert_eq!(token.guard(async { 7 }).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_guard_aborts_pending_future() {
        let (handle, token) = cancel_pair();
        let waiter = tokio::spawn(async move {
            token
                .guard(tokio::time::sleep(Duration::from_secs(30)))
                .await
        });
        handle.cancel();
        let res = waiter.await.unwrap();
        assert!(matches!(res, Err(CrewError::Cancelled)));
    }

    #[test]
    fn test_token_from_handle_sees_cancel() {
        let (handle, _token) = cancel_pair();
        let token = handle.token();
        assert!(!token.is_cancelled());
        handle.cancel();
        assert!(token.is_cancelled());
    }
}
