//! Cancellation composition for relay cycles
//!
//! A relay cycle is governed by three independent signals: the enclosing
//! connection's lifetime, an explicit stop, and an explicit pause. The first
//! two live as long as the service; the pause token is allocated fresh for
//! every cycle so a later resume is not pre-cancelled.

use std::future::pending;

use tokio_util::sync::CancellationToken;

/// Composed cancellation signal observed by one relay cycle.
///
/// Logical OR of up to three tokens. An empty scope never fires, which is
/// how cancellation-immune writes and flushes are expressed.
#[derive(Debug, Clone, Default)]
pub struct CancelScope {
    closed: Option<CancellationToken>,
    stopped: Option<CancellationToken>,
    paused: Option<CancellationToken>,
}

impl CancelScope {
    /// Compose the active signal for a cycle from the three sources.
    pub fn compose(
        closed: &CancellationToken,
        stopped: &CancellationToken,
        paused: &CancellationToken,
    ) -> Self {
        Self {
            closed: Some(closed.clone()),
            stopped: Some(stopped.clone()),
            paused: Some(paused.clone()),
        }
    }

    /// Scope tied to a single token.
    pub fn single(token: &CancellationToken) -> Self {
        Self {
            closed: Some(token.clone()),
            stopped: None,
            paused: None,
        }
    }

    /// Scope that never fires. I/O issued under it cannot be cancelled.
    pub fn never() -> Self {
        Self::default()
    }

    /// Whether any of the composed tokens has fired.
    pub fn is_cancelled(&self) -> bool {
        fn fired(slot: &Option<CancellationToken>) -> bool {
            slot.as_ref().is_some_and(|t| t.is_cancelled())
        }
        fired(&self.closed) || fired(&self.stopped) || fired(&self.paused)
    }

    /// Suspend until any composed token fires; pends forever on an empty scope.
    pub async fn cancelled(&self) {
        async fn wait(slot: &Option<CancellationToken>) {
            match slot {
                Some(token) => token.cancelled().await,
                None => pending().await,
            }
        }

        tokio::select! {
            _ = wait(&self.closed) => {}
            _ = wait(&self.stopped) => {}
            _ = wait(&self.paused) => {}
        }
    }
}
