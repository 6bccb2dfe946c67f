//! # Alerting
//!
//! Rolling-window rule evaluation over the same event stream the audit log
//! records. Each [`AlertRule`] watches one [`AlertCondition`], counts
//! occurrences within its window, and fires at most once per cooldown
//! period once the threshold is crossed.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlertCondition {
    RateSpike,
    SessionKills,
    CostAnomaly,
    ScanBlockRate,
    RepeatedAttacker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertTriggerKind {
    Webhook,
    Log,
    Callback,
}

#[derive(Debug, Clone)]
pub struct AlertRule {
    pub id: String,
    pub condition: AlertCondition,
    pub threshold: u32,
    pub window: Duration,
    pub cooldown: Duration,
    pub trigger: AlertTriggerKind,
}

impl AlertRule {
    pub fn new(id: impl Into<String>, condition: AlertCondition, threshold: u32, window: Duration) -> Self {
        Self { id: id.into(), condition, threshold, window, cooldown: DEFAULT_COOLDOWN, trigger: AlertTriggerKind::Log }
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn with_trigger(mut self, trigger: AlertTriggerKind) -> Self {
        self.trigger = trigger;
        self
    }
}

/// A fired alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub rule_id: String,
    pub condition: AlertCondition,
    pub trigger: AlertTriggerKindLabel,
    #[serde(with = "time::serde::rfc3339")]
    pub triggered_at: OffsetDateTime,
    pub context: HashMap<String, String>,
}

/// Serializable mirror of [`AlertTriggerKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertTriggerKindLabel {
    Webhook,
    Log,
    Callback,
}

impl From<AlertTriggerKind> for AlertTriggerKindLabel {
    fn from(kind: AlertTriggerKind) -> Self {
        match kind {
            AlertTriggerKind::Webhook => AlertTriggerKindLabel::Webhook,
            AlertTriggerKind::Log => AlertTriggerKindLabel::Log,
            AlertTriggerKind::Callback => AlertTriggerKindLabel::Callback,
        }
    }
}

struct RuleState {
    events: VecDeque<Instant>,
    last_fired: Option<Instant>,
}

/// A caller-supplied sink an alert is handed to once it fires. Webhook
/// delivery and custom callback dispatch both go through this - the
/// manager's job is deciding *when* to fire, not how the notification is
/// transported.
pub type AlertSink = Arc<dyn Fn(&Alert) + Send + Sync>;

pub struct AlertManager {
    rules: Vec<AlertRule>,
    state: Mutex<HashMap<String, RuleState>>,
    sink: Option<AlertSink>,
}

impl AlertManager {
    pub fn new(rules: Vec<AlertRule>) -> Self {
        Self { rules, state: Mutex::new(HashMap::new()), sink: None }
    }

    pub fn set_sink(&mut self, sink: impl Fn(&Alert) + Send + Sync + 'static) {
        self.sink = Some(Arc::new(sink));
    }

    /// Records one occurrence of `condition` at `now`, firing any matching
    /// rule whose rolling-window count crosses its threshold and whose
    /// cooldown has elapsed.
    pub fn record(&self, condition: AlertCondition, context: HashMap<String, String>, now: Instant) {
        let mut state_map = self.state.lock().expect("alert state lock poisoned");
        for rule in self.rules.iter().filter(|r| r.condition == condition) {
            let state = state_map
                .entry(rule.id.clone())
                .or_insert_with(|| RuleState { events: VecDeque::new(), last_fired: None });

            state.events.push_back(now);
            while let Some(&front) = state.events.front() {
                if now.duration_since(front) > rule.window {
                    state.events.pop_front();
                } else {
                    break;
                }
            }

            let cooling_down = state.last_fired.map(|t| now.duration_since(t) < rule.cooldown).unwrap_or(false);
            if !cooling_down && state.events.len() as u32 >= rule.threshold {
                state.last_fired = Some(now);
                let alert = Alert {
                    id: Uuid::new_v4().to_string(),
                    rule_id: rule.id.clone(),
                    condition,
                    trigger: rule.trigger.into(),
                    triggered_at: OffsetDateTime::now_utc(),
                    context: context.clone(),
                };
                if let Some(sink) = &self.sink {
                    sink(&alert);
                } else {
                    tracing::warn!(rule_id = %rule.id, condition = ?condition, "alert fired with no sink configured");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ctx() -> HashMap<String, String> {
        HashMap::new()
    }

    #[test]
    fn fires_once_threshold_crossed_within_window() {
        let rule = AlertRule::new("spike", AlertCondition::RateSpike, 3, Duration::from_secs(10));
        let mut manager = AlertManager::new(vec![rule]);
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = fired.clone();
        manager.set_sink(move |_| {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });

        let t0 = Instant::now();
        manager.record(AlertCondition::RateSpike, ctx(), t0);
        manager.record(AlertCondition::RateSpike, ctx(), t0 + Duration::from_secs(1));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        manager.record(AlertCondition::RateSpike, ctx(), t0 + Duration::from_secs(2));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cooldown_suppresses_repeated_firing() {
        let rule = AlertRule::new("spike", AlertCondition::RateSpike, 1, Duration::from_secs(60))
            .with_cooldown(Duration::from_secs(30));
        let mut manager = AlertManager::new(vec![rule]);
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = fired.clone();
        manager.set_sink(move |_| {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });

        let t0 = Instant::now();
        manager.record(AlertCondition::RateSpike, ctx(), t0);
        manager.record(AlertCondition::RateSpike, ctx(), t0 + Duration::from_secs(5));
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        manager.record(AlertCondition::RateSpike, ctx(), t0 + Duration::from_secs(40));
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn events_outside_window_are_forgotten() {
        let rule = AlertRule::new("spike", AlertCondition::RateSpike, 2, Duration::from_secs(5));
        let mut manager = AlertManager::new(vec![rule]);
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = fired.clone();
        manager.set_sink(move |_| {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });

        let t0 = Instant::now();
        manager.record(AlertCondition::RateSpike, ctx(), t0);
        manager.record(AlertCondition::RateSpike, ctx(), t0 + Duration::from_secs(10));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unrelated_conditions_do_not_advance_other_rules() {
        let rule = AlertRule::new("kills", AlertCondition::SessionKills, 1, Duration::from_secs(10));
        let manager = AlertManager::new(vec![rule]);
        manager.record(AlertCondition::RateSpike, ctx(), Instant::now());
        assert!(manager.state.lock().unwrap().is_empty());
    }
}
