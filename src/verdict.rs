//! Approve/reject answers that may arrive now or later.
//!
//! Interceptors and route probes answer with a [`Verdict`]. A synchronous
//! answer is `Verdict::Ready`; an asynchronous one hands out an [`Advance`]
//! continuation and returns `Verdict::Pending`. Callers only ever `resolve()`.

use std::future::Future;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::sync::oneshot;

/// An approval that is either known or still pending.
pub enum Verdict {
    Ready(bool),
    Pending(BoxFuture<'static, bool>),
}

/// Continuation used to answer a pending [`Verdict`].
///
/// Dropping it without calling [`Advance::advance`] counts as a rejection.
#[derive(Debug)]
pub struct Advance {
    tx: oneshot::Sender<bool>,
}

impl Advance {
    /// Resolve the pending verdict.
    pub fn advance(self, approved: bool) {
        // The receiver is gone when the pipeline was torn down; nothing to report.
        let _ = self.tx.send(approved);
    }
}

impl Verdict {
    pub fn approve() -> Self {
        Verdict::Ready(true)
    }

    pub fn reject() -> Self {
        Verdict::Ready(false)
    }

    /// A pending verdict and the continuation that will settle it.
    pub fn deferred() -> (Advance, Self) {
        let (tx, rx) = oneshot::channel();
        let fut = async move {
            match rx.await {
                Ok(approved) => approved,
                Err(_) => {
                    tracing::warn!("Continuation dropped without an answer, treating as rejection");
                    false
                }
            }
        };
        (Advance { tx }, Verdict::Pending(fut.boxed()))
    }

    /// Wrap any future yielding an approval.
    pub fn from_future<F>(fut: F) -> Self
    where
        F: Future<Output = bool> + Send + 'static,
    {
        Verdict::Pending(fut.boxed())
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Verdict::Ready(_))
    }

    /// Wait for the answer.
    pub async fn resolve(self) -> bool {
        match self {
            Verdict::Ready(approved) => approved,
            Verdict::Pending(fut) => fut.await,
        }
    }
}

impl From<bool> for Verdict {
    fn from(approved: bool) -> Self {
        Verdict::Ready(approved)
    }
}

impl std::fmt::Debug for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Ready(approved) => f.debug_tuple("Ready").field(approved).finish(),
            Verdict::Pending(_) => f.write_str("Pending"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ready() {
        assert!(Verdict::approve().resolve().await);
        assert!(!Verdict::from(false).resolve().await);
    }

    #[tokio::test]
    async fn test_deferred_answer_from_task() {
        let (advance, verdict) = Verdict::deferred();
        assert!(!verdict.is_ready());
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            advance.advance(true);
        });
        assert!(verdict.resolve().await);
    }

    #[tokio::test]
    async fn test_dropped_continuation_rejects() {
        let (advance, verdict) = Verdict::deferred();
        drop(advance);
        assert!(!verdict.resolve().await);
    }
}
