//! # Audit Log
//!
//! Every scan or decision event, from the level filter through redaction
//! and fan-out, passes through here. The ambient `tracing` event fires
//! unconditionally; the level filter, in-memory ring buffer, durable
//! store, and transports only see entries that pass the configured
//! [`AuditLevel`].

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::models::{AuditEntry, AuditLevel};
use crate::storage::AuditStore;
use crate::transport::AuditTransport;

pub const DEFAULT_RING_CAPACITY: usize = 1000;

pub struct AuditLog {
    level: AuditLevel,
    redact: bool,
    ring_capacity: usize,
    ring: Mutex<VecDeque<AuditEntry>>,
    transports: Vec<AuditTransport>,
    store: Option<AuditStore>,
}

impl AuditLog {
    pub fn new(level: AuditLevel) -> Self {
        Self {
            level,
            redact: false,
            ring_capacity: DEFAULT_RING_CAPACITY,
            ring: Mutex::new(VecDeque::new()),
            transports: Vec::new(),
            store: None,
        }
    }

    pub fn with_redaction(mut self, redact: bool) -> Self {
        self.redact = redact;
        self
    }

    pub fn with_ring_capacity(mut self, capacity: usize) -> Self {
        self.ring_capacity = capacity;
        self
    }

    pub fn with_transport(mut self, transport: AuditTransport) -> Self {
        self.transports.push(transport);
        self
    }

    pub fn with_store(mut self, store: AuditStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Records `entry`. The ambient tracing event always fires; everything
    /// else (ring buffer, durable store, transports) is gated on the
    /// configured level.
    pub fn log(&self, entry: AuditEntry) {
        emit_tracing_event(&entry);

        if !self.level.accepts(entry.decision) {
            return;
        }

        let recorded = if self.redact { entry.redacted() } else { entry };

        if let Some(store) = &self.store {
            if let Err(err) = store.append(&recorded) {
                tracing::warn!(error = %err, "failed to persist audit entry");
            }
        }

        {
            let mut ring = self.ring.lock().expect("audit ring lock poisoned");
            if ring.len() >= self.ring_capacity {
                ring.pop_front();
            }
            ring.push_back(recorded.clone());
        }

        for transport in &self.transports {
            transport.dispatch(&recorded);
        }
    }

    /// Snapshot of the in-memory ring buffer, oldest first.
    pub fn recent(&self) -> Vec<AuditEntry> {
        self.ring.lock().expect("audit ring lock poisoned").iter().cloned().collect()
    }
}

fn emit_tracing_event(entry: &AuditEntry) {
    match entry.tracing_level() {
        tracing::Level::WARN => {
            tracing::warn!(event = %entry.event, decision = ?entry.decision, "audit")
        }
        tracing::Level::INFO => {
            tracing::info!(event = %entry.event, decision = ?entry.decision, "audit")
        }
        _ => tracing::debug!(event = %entry.event, decision = ?entry.decision, "audit"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Decision;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn violations_only_log_drops_non_blocked_entries() {
        let log = AuditLog::new(AuditLevel::ViolationsOnly);
        log.log(AuditEntry::new("scan_pass", Decision::Allowed));
        log.log(AuditEntry::new("action_block", Decision::Blocked));
        let recent = log.recent();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].event, "action_block");
    }

    #[test]
    fn redaction_strips_context_before_storing() {
        let log = AuditLog::new(AuditLevel::All).with_redaction(true);
        log.log(AuditEntry::new("action_block", Decision::Blocked).with_context("tool", "send_email"));
        assert_eq!(log.recent()[0].context.get("tool"), Some(&"[REDACTED]".to_string()));
    }

    #[test]
    fn ring_buffer_evicts_oldest_past_capacity() {
        let log = AuditLog::new(AuditLevel::All).with_ring_capacity(2);
        log.log(AuditEntry::new("one", Decision::Info));
        log.log(AuditEntry::new("two", Decision::Info));
        log.log(AuditEntry::new("three", Decision::Info));
        let recent = log.recent();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].event, "two");
        assert_eq!(recent[1].event, "three");
    }

    #[test]
    fn dispatches_to_every_configured_transport() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c1 = calls.clone();
        let c2 = calls.clone();
        let log = AuditLog::new(AuditLevel::All)
            .with_transport(AuditTransport::custom(move |_| {
                c1.fetch_add(1, Ordering::SeqCst);
            }))
            .with_transport(AuditTransport::custom(move |_| {
                c2.fetch_add(1, Ordering::SeqCst);
            }));
        log.log(AuditEntry::new("action_approve", Decision::Allowed));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn filtered_entries_never_reach_transports() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let log = AuditLog::new(AuditLevel::ViolationsOnly).with_transport(AuditTransport::custom(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        }));
        log.log(AuditEntry::new("scan_pass", Decision::Allowed));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
