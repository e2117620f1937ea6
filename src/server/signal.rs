// Signal handling module
//
// Supported signals:
// - SIGTERM: Graceful shutdown
// - SIGINT:  Graceful shutdown (Ctrl+C)
// - SIGUSR1: Reopen log files

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

use crate::logger;

/// Signal handler state
pub struct SignalHandler {
    /// Wakes the accept loop when shutdown is requested
    pub shutdown: Notify,
    shutdown_requested: AtomicBool,
}

impl SignalHandler {
    pub fn new() -> Self {
        Self {
            shutdown: Notify::new(),
            shutdown_requested: AtomicBool::new(false),
        }
    }

    /// Ask the server to stop accepting and drain
    pub fn request_shutdown(&self) {
        self.shutdown_requested.store(true, Ordering::SeqCst);
        // notify_one keeps a permit if the loop is not waiting right now
        self.shutdown.notify_one();
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::SeqCst)
    }
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Start signal handlers (Unix)
///
/// | Signal  | Action            |
/// |---------|-------------------|
/// | SIGTERM | Graceful stop     |
/// | SIGINT  | Graceful stop     |
/// | SIGUSR1 | Reopen log files  |
#[cfg(unix)]
pub fn start_signal_handler(handler: Arc<SignalHandler>) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let registered = signal(SignalKind::terminate()).and_then(|term| {
            Ok((
                term,
                signal(SignalKind::interrupt())?,
                signal(SignalKind::user_defined1())?,
            ))
        });
        let (mut sigterm, mut sigint, mut sigusr1) = match registered {
            Ok(signals) => signals,
            Err(e) => {
                logger::log_error(&format!("Failed to register signal handlers: {e}"));
                return;
            }
        };

        logger::log_info(&format!(
            "Signal handlers registered (pid {}): SIGTERM/SIGINT stop, SIGUSR1 reopens logs",
            std::process::id()
        ));

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    logger::log_info("SIGTERM received, shutting down gracefully");
                    handler.request_shutdown();
                    break;
                }
                _ = sigint.recv() => {
                    logger::log_info("SIGINT received, shutting down gracefully");
                    handler.request_shutdown();
                    break;
                }
                _ = sigusr1.recv() => {
                    logger::reopen();
                }
            }
        }
    });
}

/// Non-Unix fallback - only handles Ctrl+C
#[cfg(not(unix))]
pub fn start_signal_handler(handler: Arc<SignalHandler>) {
    tokio::spawn(async move {
        if let Ok(()) = tokio::signal::ctrl_c().await {
            logger::log_info("Ctrl+C received, shutting down gracefully");
            handler.request_shutdown();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_shutdown_permit_is_kept() {
        let handler = SignalHandler::new();
        assert!(!handler.is_shutdown_requested());

        // requested before anyone waits
        handler.request_shutdown();
        assert!(handler.is_shutdown_requested());

        tokio::time::timeout(Duration::from_secs(1), handler.shutdown.notified())
            .await
            .expect("stored permit wakes the waiter");
    }
}
