// SPDX-License-Identifier: MIT OR Apache-2.0
//! Cooperative cancellation for in-flight invocations.

use std::sync::Arc;
use tokio::sync::watch;

/// Cooperative cancellation token.
///
/// Cloneable; cancelling any clone makes every pending
/// [`execute_with_cancel`](crate::execute_with_cancel) that holds it take the
/// kill path. Cancellation is sticky and cannot be undone.
#[derive(Clone, Debug)]
pub struct CancelToken {
    state: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    /// Create a new, non-cancelled token.
    pub fn new() -> Self {
        let (state, _) = watch::channel(false);
        Self {
            state: Arc::new(state),
        }
    }

    /// Signal cancellation to all waiters.
    pub fn cancel(&self) {
        self.state.send_replace(true);
    }

    /// Returns `true` if cancellation has been signalled.
    pub fn is_cancelled(&self) -> bool {
        *self.state.borrow()
    }

    /// Resolve once the token is cancelled (immediately if it already is).
    pub async fn cancelled(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives as long as `self`, so this cannot observe a close.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
