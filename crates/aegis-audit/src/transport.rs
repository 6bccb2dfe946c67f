//! # Audit Transports
//!
//! Where a recorded entry is dispatched, in addition to the ambient
//! `tracing` event every [`crate::log::AuditLog::log`] call already emits
//! regardless of transport configuration.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::models::AuditEntry;

pub enum AuditTransport {
    /// One JSON object per line on stdout.
    Console,
    /// Appends one JSON object per line to a file.
    JsonFile(Mutex<BufWriter<File>>),
    /// Emits a `tracing` event on the `aegis_audit::otel` target, for a
    /// `tracing-opentelemetry` layer installed by the host application to
    /// pick up and export. Keeps this crate free of an exporter dependency
    /// while still reaching OTel through the ecosystem's standard bridge.
    Otel,
    /// Caller-supplied sink.
    Custom(Arc<dyn Fn(&AuditEntry) + Send + Sync>),
}

impl AuditTransport {
    pub fn json_file(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(AuditTransport::JsonFile(Mutex::new(BufWriter::new(file))))
    }

    pub fn custom(sink: impl Fn(&AuditEntry) + Send + Sync + 'static) -> Self {
        AuditTransport::Custom(Arc::new(sink))
    }

    /// Dispatches `entry`. Failures are swallowed - a broken sink must
    /// never block the decision pipeline that produced the entry.
    pub fn dispatch(&self, entry: &AuditEntry) {
        match self {
            AuditTransport::Console => {
                if let Ok(line) = serde_json::to_string(entry) {
                    println!("{line}");
                }
            }
            AuditTransport::JsonFile(writer) => {
                if let Ok(line) = serde_json::to_string(entry) {
                    if let Ok(mut w) = writer.lock() {
                        let _ = writeln!(w, "{line}");
                        let _ = w.flush();
                    }
                }
            }
            AuditTransport::Otel => {
                tracing::info!(
                    target: "aegis_audit::otel",
                    event = %entry.event,
                    decision = ?entry.decision,
                    session_id = entry.session_id.as_deref().unwrap_or(""),
                    "audit entry"
                );
            }
            AuditTransport::Custom(sink) => sink(entry),
        }
    }
}

impl std::fmt::Debug for AuditTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            AuditTransport::Console => "Console",
            AuditTransport::JsonFile(_) => "JsonFile",
            AuditTransport::Otel => "Otel",
            AuditTransport::Custom(_) => "Custom",
        };
        write!(f, "AuditTransport::{label}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Decision;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn json_file_transport_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let transport = AuditTransport::json_file(&path).unwrap();
        transport.dispatch(&AuditEntry::new("action_block", Decision::Blocked));
        transport.dispatch(&AuditEntry::new("action_approve", Decision::Allowed));
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.contains("action_block"));
    }

    #[test]
    fn custom_transport_invokes_sink() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let transport = AuditTransport::custom(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });
        transport.dispatch(&AuditEntry::new("scan_pass", Decision::Info));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
