//! Control channel session.
//!
//! # Responsibilities
//! - Read frames from one WebSocket connection and decode them
//! - Submit requests to the session's dispatcher
//! - Funnel every completion through a single writer task
//! - Tear down cleanly: cancel in-flight work, flush, close
//!
//! # State Machine
//! ```text
//! Connecting → Open:     run() starts on a handshaken socket
//! Open → Closing:        read error, peer close, writer failure, shutdown
//! Closing → Closed:      in-flight cancelled, writer drained
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::{broadcast, mpsc, Semaphore};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use crate::channel::frame::{decode_request, encode_completion};
use crate::dispatch::{Completion, RequestDispatcher};
use crate::executor::{ErrorNotification, RequestExecutor};
use crate::net::connection::{SessionId, SessionState, StateCell};
use crate::observability::metrics;

/// How long a closing session waits for queued completions to be written.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Why a session stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// The process is shutting down.
    Shutdown,
    /// The channel was lost; the server should reconnect.
    Disconnected(String),
}

/// One control channel connection and its in-flight requests.
#[derive(Debug)]
pub struct ChannelSession {
    id: SessionId,
    state: StateCell,
    dispatcher: RequestDispatcher,
}

impl ChannelSession {
    /// Create a session in the `Connecting` state.
    pub fn new(executor: Arc<RequestExecutor>, limit: Arc<Semaphore>) -> Self {
        Self {
            id: SessionId::new(),
            state: StateCell::default(),
            dispatcher: RequestDispatcher::new(executor, limit),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    pub fn in_flight(&self) -> usize {
        self.dispatcher.in_flight()
    }

    /// Serve the channel until it closes or shutdown is signalled.
    pub async fn run<S>(&self, socket: S, shutdown: &mut broadcast::Receiver<()>) -> SessionEnd
    where
        S: Stream<Item = Result<Message, WsError>> + Sink<Message, Error = WsError> + Send + 'static,
    {
        self.state.set(SessionState::Open);
        tracing::info!(session_id = %self.id, "Session open");

        let (sink, mut stream) = socket.split();
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let mut writer = tokio::spawn(write_frames(self.id, sink, out_rx));
        let mut writer_finished = false;

        let end = loop {
            tokio::select! {
                frame = stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => self.handle_frame(text.as_bytes(), &out_tx),
                    Some(Ok(Message::Binary(data))) => self.handle_frame(&data, &out_tx),
                    Some(Ok(Message::Close(frame))) => {
                        break SessionEnd::Disconnected(format!("peer closed the channel: {:?}", frame));
                    }
                    // Ping/pong are answered by the WebSocket layer.
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break SessionEnd::Disconnected(e.to_string()),
                    None => break SessionEnd::Disconnected("channel stream ended".to_string()),
                },
                result = &mut writer => {
                    writer_finished = true;
                    let reason = match result {
                        Ok(Err(e)) => e.to_string(),
                        Ok(Ok(())) => "writer stopped".to_string(),
                        Err(e) => e.to_string(),
                    };
                    break SessionEnd::Disconnected(reason);
                }
                _ = shutdown.recv() => break SessionEnd::Shutdown,
            }
        };

        self.state.set(SessionState::Closing);
        let cancelled = self.dispatcher.cancel_all();
        tracing::info!(session_id = %self.id, cancelled, reason = ?end, "Session closing");

        // Aborted requests drop their senders; the writer ends once every
        // sender is gone and the queue is flushed.
        drop(out_tx);
        if !writer_finished {
            match tokio::time::timeout(DRAIN_TIMEOUT, &mut writer).await {
                Ok(Ok(Err(e))) => tracing::debug!(session_id = %self.id, error = %e, "Writer ended with error"),
                Ok(_) => {}
                Err(_) => {
                    tracing::warn!(session_id = %self.id, "Writer did not drain in time");
                    writer.abort();
                }
            }
        }

        self.state.set(SessionState::Closed);
        tracing::info!(session_id = %self.id, "Session closed");
        end
    }

    fn handle_frame(&self, frame: &[u8], out: &mpsc::UnboundedSender<Message>) {
        let request = match decode_request(frame) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(session_id = %self.id, error = %e, "Dropping malformed frame");
                metrics::record_malformed_frame();
                return;
            }
        };

        tracing::debug!(
            session_id = %self.id,
            request_id = %request.request_id,
            method = %request.method,
            url = %request.url,
            "Request received"
        );

        let request_id = request.request_id.clone();
        let session_id = self.id;
        let tx = out.clone();
        let submitted = self
            .dispatcher
            .submit(request, move |completion| deliver(session_id, &tx, completion));

        if let Err(e) = submitted {
            tracing::warn!(session_id = %self.id, request_id = %request_id, error = %e, "Request rejected");
            deliver(self.id, out, Completion::Failed(ErrorNotification::new(request_id, &e)));
        }
    }
}

fn deliver(session_id: SessionId, out: &mpsc::UnboundedSender<Message>, completion: Completion) {
    match encode_completion(&completion) {
        Ok(json) => {
            if out.send(Message::text(json)).is_err() {
                tracing::debug!(
                    session_id = %session_id,
                    request_id = %completion.request_id(),
                    "Writer gone, completion dropped"
                );
            }
        }
        Err(e) => tracing::error!(
            session_id = %session_id,
            request_id = %completion.request_id(),
            error = %e,
            "Failed to encode completion"
        ),
    }
}

/// The only task that writes to the channel, so frames never interleave.
async fn write_frames<S>(
    session_id: SessionId,
    mut sink: SplitSink<S, Message>,
    mut frames: mpsc::UnboundedReceiver<Message>,
) -> Result<(), WsError>
where
    S: Sink<Message, Error = WsError>,
{
    while let Some(frame) = frames.recv().await {
        if let Err(e) = sink.send(frame).await {
            tracing::warn!(session_id = %session_id, error = %e, "Failed to write frame");
            return Err(e);
        }
    }
    let _ = sink.close().await;
    Ok(())
}
