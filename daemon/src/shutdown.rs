//! Process shutdown: OS signals in, one cancellation token out.

use tokio::signal;
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

/// Which signal ended the process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    Interrupt,
    Terminate,
}

/// Owns the token the HTTP server drains on.
#[derive(Clone, Default)]
pub struct ShutdownController {
    token: CancellationToken,
}

impl ShutdownController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Resolves once [`shutdown`](Self::shutdown) has been called; pass it to
    /// `with_graceful_shutdown`.
    pub fn signalled(&self) -> WaitForCancellationFutureOwned {
        self.token.clone().cancelled_owned()
    }

    /// Block until SIGINT or SIGTERM, then cancel the token.
    ///
    /// Returns early without a reason if shutdown was already requested.
    pub async fn listen(&self) -> Option<StopReason> {
        let reason = tokio::select! {
            reason = next_stop_signal() => reason,
            _ = self.token.cancelled() => return None,
        };
        tracing::info!(?reason, "stop signal received, draining requests");
        self.shutdown();
        Some(reason)
    }
}

async fn next_stop_signal() -> StopReason {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = signal::ctrl_c() => StopReason::Interrupt,
        _ = terminate => StopReason::Terminate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn shutdown_releases_the_server_future() {
        let controller = ShutdownController::new();
        let drained = controller.signalled();
        controller.clone().shutdown();
        tokio::time::timeout(Duration::from_secs(1), drained)
            .await
            .expect("server future should resolve");
    }

    #[tokio::test]
    async fn listener_returns_when_shutdown_comes_from_elsewhere() {
        let controller = ShutdownController::new();
        let listener = controller.clone();
        let task = tokio::spawn(async move { listener.listen().await });
        controller.shutdown();
        let reason = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("listener should stop")
            .unwrap();
        assert_eq!(reason, None);
    }
}
