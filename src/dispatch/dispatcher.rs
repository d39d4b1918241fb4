//! Request dispatcher.
//!
//! # Responsibilities
//! - Own the in-flight entries of one session, keyed by request id
//! - Reject a request id that is already in flight
//! - Run each request as its own task, bounded by a shared semaphore
//! - Deliver exactly one completion per request unless it was cancelled
//! - Abort every in-flight request when the session goes away

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::Semaphore;
use tokio::task::AbortHandle;

use crate::error::{BridgeError, BridgeResult};
use crate::executor::{ErrorNotification, RequestDescriptor, RequestExecutor, ResponseDescriptor};
use crate::observability::metrics;

/// Outcome of one request, delivered to the completion callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Response(ResponseDescriptor),
    Failed(ErrorNotification),
}

impl Completion {
    pub fn request_id(&self) -> &str {
        match self {
            Completion::Response(r) => &r.request_id,
            Completion::Failed(n) => &n.request_id,
        }
    }
}

/// Ownership record for one running request.
#[derive(Debug)]
struct InFlightEntry {
    /// Distinguishes successive requests that reuse an id.
    ticket: u64,
    /// Attached right after the task is spawned.
    abort: Option<AbortHandle>,
}

type InFlightMap = DashMap<String, InFlightEntry>;

/// Schedules request executions for one session.
#[derive(Debug)]
pub struct RequestDispatcher {
    executor: Arc<RequestExecutor>,
    limit: Arc<Semaphore>,
    in_flight: Arc<InFlightMap>,
    next_ticket: AtomicU64,
}

impl RequestDispatcher {
    /// Create a dispatcher. `limit` is shared by every session of the process.
    pub fn new(executor: Arc<RequestExecutor>, limit: Arc<Semaphore>) -> Self {
        Self {
            executor,
            limit,
            in_flight: Arc::new(DashMap::new()),
            next_ticket: AtomicU64::new(1),
        }
    }

    /// Accept a request for execution.
    ///
    /// `completion` runs exactly once when the request finishes, and never if
    /// the request is cancelled first.
    pub fn submit<F>(&self, request: RequestDescriptor, completion: F) -> BridgeResult<()>
    where
        F: FnOnce(Completion) + Send + 'static,
    {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);

        // Reserve the id first. The shard lock is released before the task
        // is spawned, so the task's own removal never waits on `submit`.
        match self.in_flight.entry(request.request_id.clone()) {
            Entry::Occupied(_) => return Err(BridgeError::DuplicateRequestId(request.request_id)),
            Entry::Vacant(slot) => {
                slot.insert(InFlightEntry { ticket, abort: None });
            }
        }

        let request_id = request.request_id.clone();
        let task = tokio::spawn(run_request(
            Arc::clone(&self.executor),
            Arc::clone(&self.limit),
            Arc::clone(&self.in_flight),
            ticket,
            request,
            completion,
        ));

        match self.in_flight.get_mut(&request_id) {
            Some(mut entry) if entry.ticket == ticket => entry.abort = Some(task.abort_handle()),
            // Already finished, or cancelled before the handle was attached.
            _ => task.abort(),
        }
        metrics::record_in_flight(self.in_flight.len());
        Ok(())
    }

    /// Abort every in-flight request. Returns how many were cancelled.
    pub fn cancel_all(&self) -> usize {
        let ids: Vec<String> = self.in_flight.iter().map(|e| e.key().clone()).collect();

        let mut cancelled = 0;
        for id in ids {
            if let Some((_, entry)) = self.in_flight.remove(&id) {
                if let Some(abort) = entry.abort {
                    abort.abort();
                }
                cancelled += 1;
            }
        }

        if cancelled > 0 {
            tracing::info!(cancelled, "Cancelled in-flight requests");
        }
        metrics::record_in_flight(self.in_flight.len());
        cancelled
    }

    /// Number of requests currently in flight.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_in_flight(&self, request_id: &str) -> bool {
        self.in_flight.contains_key(request_id)
    }
}

impl Drop for RequestDispatcher {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

async fn run_request<F>(
    executor: Arc<RequestExecutor>,
    limit: Arc<Semaphore>,
    in_flight: Arc<InFlightMap>,
    ticket: u64,
    request: RequestDescriptor,
    completion: F,
) where
    F: FnOnce(Completion) + Send + 'static,
{
    let start = Instant::now();

    let outcome = match limit.acquire().await {
        Ok(_permit) => executor.execute(&request).await,
        Err(_) => Err(BridgeError::ChannelClosed("dispatcher stopped".to_string())),
    };

    // Cancellation removes the entry first; a missing entry means nobody is
    // waiting for this completion any more.
    if in_flight
        .remove_if(&request.request_id, |_, entry| entry.ticket == ticket)
        .is_none()
    {
        tracing::debug!(request_id = %request.request_id, "Dropping completion of cancelled request");
        return;
    }
    metrics::record_in_flight(in_flight.len());

    let completion_value = match outcome {
        Ok(response) => {
            tracing::debug!(
                request_id = %request.request_id,
                status = response.status,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Request completed"
            );
            metrics::record_completion("ok", start);
            Completion::Response(response)
        }
        Err(e) => {
            tracing::warn!(
                request_id = %request.request_id,
                kind = e.kind().as_str(),
                error = %e,
                "Request failed"
            );
            metrics::record_completion(e.kind().as_str(), start);
            Completion::Failed(ErrorNotification::new(request.request_id.clone(), &e))
        }
    };

    completion(completion_value);
}
