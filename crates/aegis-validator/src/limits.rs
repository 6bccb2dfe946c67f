//! # Resource Counters
//!
//! Per-tool fixed-window rate-limit counters and per-session rolling-window
//! denial-of-wallet counters. Follows the same check-then-consume discipline
//! as a gas budget: caps are read-only once constructed, only the counts
//! move, and a pre-flight check never mutates state on its own.

use std::collections::HashMap;
use std::time::Instant;

use crate::policy::{DenialOfWalletCaps, RateLimit};

#[derive(Debug, Clone)]
struct Window {
    started_at: Instant,
    count: u32,
}

/// Fixed-window counters, one per tool name.
#[derive(Debug, Default)]
pub struct RateLimiter {
    windows: HashMap<String, Window>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one call to `tool` against `limit` if the current window
    /// still has room; returns false (without recording) if the limit is
    /// already reached.
    pub fn check_and_record(&mut self, tool: &str, limit: RateLimit, now: Instant) -> bool {
        let window = self
            .windows
            .entry(tool.to_string())
            .or_insert(Window { started_at: now, count: 0 });
        if now.duration_since(window.started_at) >= limit.window {
            window.started_at = now;
            window.count = 0;
        }
        if window.count >= limit.max {
            return false;
        }
        window.count += 1;
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DowCounter {
    TotalOperations,
    ToolCalls,
    SandboxTriggers,
}

/// Per-session rolling-window counters for the three denial-of-wallet caps.
#[derive(Debug)]
pub struct DenialOfWalletTracker {
    started_at: Instant,
    total_operations: u32,
    tool_calls: u32,
    sandbox_triggers: u32,
}

impl DenialOfWalletTracker {
    pub fn new(now: Instant) -> Self {
        Self { started_at: now, total_operations: 0, tool_calls: 0, sandbox_triggers: 0 }
    }

    fn roll_if_expired(&mut self, caps: &DenialOfWalletCaps, now: Instant) {
        if now.duration_since(self.started_at) >= caps.window {
            self.started_at = now;
            self.total_operations = 0;
            self.tool_calls = 0;
            self.sandbox_triggers = 0;
        }
    }

    /// Pre-flight check: would recording one more `counter` stay within cap?
    pub fn can_afford(&mut self, caps: &DenialOfWalletCaps, now: Instant, counter: DowCounter) -> bool {
        self.roll_if_expired(caps, now);
        match counter {
            DowCounter::TotalOperations => self.total_operations < caps.max_total_operations,
            DowCounter::ToolCalls => self.tool_calls < caps.max_tool_calls,
            DowCounter::SandboxTriggers => self.sandbox_triggers < caps.max_sandbox_triggers,
        }
    }

    pub fn record(&mut self, caps: &DenialOfWalletCaps, now: Instant, counter: DowCounter) {
        self.roll_if_expired(caps, now);
        match counter {
            DowCounter::TotalOperations => self.total_operations += 1,
            DowCounter::ToolCalls => self.tool_calls += 1,
            DowCounter::SandboxTriggers => self.sandbox_triggers += 1,
        }
    }
}
