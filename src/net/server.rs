//! Control channel client loop.
//!
//! # Responsibilities
//! - Dial the controlling application's WebSocket endpoint
//! - Run one `ChannelSession` per established connection
//! - Redial with backoff after a failed dial or a lost session
//! - Stop on shutdown, or after too many consecutive failed dials

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Semaphore};
use tokio_tungstenite::connect_async;

use crate::channel::{ChannelSession, SessionEnd};
use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::executor::RequestExecutor;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::resilience::backoff::{calculate_backoff, Backoff};

/// Keeps the bridge attached to its controller.
#[derive(Debug)]
pub struct Server {
    config: BridgeConfig,
    executor: Arc<RequestExecutor>,
    limit: Arc<Semaphore>,
}

impl Server {
    pub fn new(config: BridgeConfig, executor: Arc<RequestExecutor>) -> Self {
        let limit = Arc::new(Semaphore::new(config.dispatcher.max_concurrency));
        Self {
            config,
            executor,
            limit,
        }
    }

    pub fn endpoint(&self) -> String {
        self.config.channel.endpoint()
    }

    /// Run until shutdown. Fails only when the reconnect policy gives up.
    pub async fn run(&self, shutdown: &Shutdown) -> BridgeResult<()> {
        let endpoint = self.endpoint();
        let dial_timeout = self.config.channel.dial_timeout();
        let mut backoff = Backoff::new(self.config.reconnect.clone());
        let mut shutdown_rx = shutdown.subscribe();
        let mut sessions = 0u64;

        loop {
            let dial = tokio::select! {
                result = tokio::time::timeout(dial_timeout, connect_async(endpoint.as_str())) => result,
                _ = shutdown_rx.recv() => return Ok(()),
            };

            let failure = match dial {
                Ok(Ok((socket, _))) => {
                    if sessions > 0 {
                        metrics::record_reconnect();
                    }
                    sessions += 1;
                    backoff.reset();

                    let session = ChannelSession::new(self.executor.clone(), self.limit.clone());
                    tracing::info!(session_id = %session.id(), endpoint = %endpoint, "Control channel connected");

                    match session.run(socket, &mut shutdown_rx).await {
                        SessionEnd::Shutdown => return Ok(()),
                        SessionEnd::Disconnected(reason) => {
                            tracing::warn!(
                                session_id = %session.id(),
                                reason = %reason,
                                "Control channel lost, reconnecting"
                            );
                        }
                    }

                    // Avoid a hot loop against a controller that accepts and drops.
                    let delay = calculate_backoff(1, self.config.reconnect.base_delay_ms, self.config.reconnect.max_delay_ms);
                    if !pause(delay, &mut shutdown_rx).await {
                        return Ok(());
                    }
                    continue;
                }
                Ok(Err(e)) => e.to_string(),
                Err(_) => format!("dial timed out after {:?}", dial_timeout),
            };

            match backoff.next_delay() {
                Some(delay) => {
                    tracing::warn!(
                        endpoint = %endpoint,
                        attempt = backoff.attempt(),
                        delay_ms = delay.as_millis() as u64,
                        error = %failure,
                        "Control channel dial failed"
                    );
                    if !pause(delay, &mut shutdown_rx).await {
                        return Ok(());
                    }
                }
                None => {
                    tracing::error!(endpoint = %endpoint, attempts = backoff.attempt(), error = %failure, "Giving up on control channel");
                    return Err(BridgeError::ChannelClosed(format!(
                        "{} unreachable after {} attempts: {}",
                        endpoint,
                        backoff.attempt(),
                        failure
                    )));
                }
            }
        }
    }
}

/// Sleep for `delay`. Returns `false` if shutdown arrived first.
async fn pause(delay: Duration, shutdown: &mut broadcast::Receiver<()>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(delay) => true,
        _ = shutdown.recv() => false,
    }
}
