//! `vigil-audit` — tamper-evident audit trail.
//!
//! An append-only event stream: every appended event is sealed with a keyed
//! integrity tag, fanned out to subscribers, and forwarded to attached
//! sinks. Readers verify tags before trusting historical events.

pub mod event;
pub mod integrity;
pub mod pipeline;

pub use event::{AuditCategory, AuditEvent, AuditOutcome, AuditSeverity};
pub use integrity::{HmacIntegrityKey, IntegrityKey, SealedEvent};
pub use pipeline::{AuditPipeline, AuditSink, RecordingSink, Subscription};
