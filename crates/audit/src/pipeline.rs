//! The append-only audit pipeline.
//!
//! Events are sealed and stored first, then fanned out: broadcast to
//! in-process subscribers and forwarded to attached sinks. A sink failure
//! is logged, never propagated; the in-process log already holds the event.

use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex, mpsc};
use std::time::Duration;

use chrono::{DateTime, Utc};

use vigil_core::{DependencyResult, IdentityId};

use crate::event::{AuditCategory, AuditEvent, AuditSeverity};
use crate::integrity::{IntegrityKey, SealedEvent};

/// A subscription to the sealed-event stream.
///
/// Each subscriber receives a copy of every event appended after it
/// subscribed. Intended for single-threaded consumption.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

/// External persistence/forwarding capability for finalized events.
pub trait AuditSink: Send + Sync {
    fn deliver(&self, event: &SealedEvent) -> DependencyResult<()>;
}

impl<S> AuditSink for Arc<S>
where
    S: AuditSink + ?Sized,
{
    fn deliver(&self, event: &SealedEvent) -> DependencyResult<()> {
        (**self).deliver(event)
    }
}

/// In-memory sink for tests/dev.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SealedEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SealedEvent> {
        self.events.lock().expect("sink lock").clone()
    }
}

impl AuditSink for RecordingSink {
    fn deliver(&self, event: &SealedEvent) -> DependencyResult<()> {
        self.events.lock().expect("sink lock").push(event.clone());
        Ok(())
    }
}

pub struct AuditPipeline {
    key: Arc<dyn IntegrityKey>,
    events: Mutex<Vec<SealedEvent>>,
    subscribers: Mutex<Vec<mpsc::Sender<SealedEvent>>>,
    sinks: Mutex<Vec<Arc<dyn AuditSink>>>,
}

impl AuditPipeline {
    pub fn new(key: Arc<dyn IntegrityKey>) -> Self {
        Self {
            key,
            events: Mutex::new(Vec::new()),
            subscribers: Mutex::new(Vec::new()),
            sinks: Mutex::new(Vec::new()),
        }
    }

    pub fn attach_sink(&self, sink: Arc<dyn AuditSink>) {
        self.sinks.lock().expect("sink lock").push(sink);
    }

    /// Seal and append an event, then fan it out.
    ///
    /// Append order is the caller's responsibility; within one request the
    /// orchestrator appends decision first, outcome update second.
    pub fn append(&self, event: AuditEvent) -> SealedEvent {
        let sealed = SealedEvent::seal(event, &*self.key);

        self.events
            .lock()
            .expect("audit log lock")
            .push(sealed.clone());

        // Drop any dead subscribers while publishing.
        let mut subscribers = self.subscribers.lock().expect("subscriber lock");
        subscribers.retain(|tx| tx.send(sealed.clone()).is_ok());
        drop(subscribers);

        let sinks = self.sinks.lock().expect("sink lock");
        for sink in sinks.iter() {
            if let Err(e) = sink.deliver(&sealed) {
                tracing::error!(error = %e, "audit sink delivery failed");
            }
        }

        sealed
    }

    pub fn subscribe(&self) -> Subscription<SealedEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.lock().expect("subscriber lock").push(tx);
        Subscription::new(rx)
    }

    /// All events whose integrity tags verify, in append order.
    ///
    /// Tampered records are skipped and logged; they must not feed risk
    /// signals.
    pub fn verified_events(&self) -> Vec<AuditEvent> {
        let events = self.events.lock().expect("audit log lock");
        events
            .iter()
            .filter(|sealed| {
                let ok = sealed.verify(&*self.key);
                if !ok {
                    tracing::error!(event_id = %sealed.event.event_id, "audit event failed integrity check");
                }
                ok
            })
            .map(|sealed| sealed.event.clone())
            .collect()
    }

    /// Verified events for one identity since an instant. The request
    /// velocity signal.
    pub fn recent_count(
        &self,
        identity: IdentityId,
        since: DateTime<Utc>,
        category: Option<AuditCategory>,
    ) -> usize {
        self.verified_events()
            .iter()
            .filter(|e| e.identity == Some(identity))
            .filter(|e| e.timestamp >= since)
            .filter(|e| category.is_none_or(|c| e.category == c))
            .count()
    }

    /// Most recent verified events for an identity, newest first.
    pub fn events_for(&self, identity: IdentityId, limit: usize) -> Vec<AuditEvent> {
        let mut events: Vec<AuditEvent> = self
            .verified_events()
            .into_iter()
            .filter(|e| e.identity == Some(identity))
            .collect();
        events.reverse();
        events.truncate(limit);
        events
    }

    /// Verified warning-or-worse security events since an instant.
    pub fn security_events_since(&self, since: DateTime<Utc>) -> Vec<AuditEvent> {
        self.verified_events()
            .into_iter()
            .filter(|e| e.timestamp >= since)
            .filter(|e| {
                e.category == AuditCategory::Security || e.severity != AuditSeverity::Info
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().expect("audit log lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    fn inject_sealed(&self, sealed: SealedEvent) {
        self.events.lock().expect("audit log lock").push(sealed);
    }
}
