//! Rule-based alerting over sentiment bars.
//!
//! This crate provides:
//! - Typed alert rules with AND-composed conditions, per-rule cooldowns,
//!   and action directives that pick delivery sinks
//! - An engine that evaluates rules against the latest bar per ticker and
//!   persists the rule set as JSON
//! - Notifier sinks (log, webhook) with per-sink failure isolation

pub mod engine;
pub mod notify;
pub mod rule;

pub use engine::{AlertEngine, AlertEvent};
pub use notify::{build_notifiers, notify_all, LogNotifier, Notifier, WebhookNotifier};
pub use rule::{AlertAction, AlertRule, Condition, Field, FieldSnapshot, RuleCondition};
