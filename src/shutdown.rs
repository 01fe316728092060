use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Handles graceful shutdown of the client
///
/// Listens for SIGTERM and SIGINT/CTRL+C and cancels the root token. Every
/// job token is a child of it, so the running upload and poll loop stop at
/// their next suspension point and report a cancelled outcome.
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    /// Create a new shutdown coordinator
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Root token to derive job tokens from.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Cancel everything derived from the root token.
    pub fn trigger(&self, reason: &str) {
        if !self.token.is_cancelled() {
            info!("{}, initiating graceful shutdown...", reason);
            self.token.cancel();
        }
    }

    /// Watch for signals in the background until shutdown happens.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            tokio::select! {
                reason = wait_for_signal() => self.trigger(reason),
                _ = self.token.cancelled() => {}
            }
        })
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves with a description of the first termination signal received.
async fn wait_for_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install CTRL+C signal handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "Received CTRL+C signal",
        _ = terminate => "Received SIGTERM signal",
    }
}
