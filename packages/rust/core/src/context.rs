//! Cancellable execution context for the scoring stage.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Cancellation token plus an optional deadline for one scoring call.
#[derive(Debug, Clone, Default)]
pub struct ScoreContext {
    token: CancellationToken,
    timeout: Option<Duration>,
}

impl ScoreContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an existing token, e.g. one also cancelled by a signal handler.
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            token,
            timeout: None,
        }
    }

    /// Fail the scoring call if it has not finished within `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}
