//! Alert rules evaluated against the latest sentiment bar for a ticker.
//!
//! A rule names a ticker and a list of conditions; it fires only when every
//! condition holds (AND semantics) and the rule is outside its cooldown
//! window. Conditions read bar fields or the model probability through a
//! [`FieldSnapshot`], so a missing value (no model loaded, NaN in the bar)
//! makes the condition false rather than erroring the sweep. A firing
//! returns the rule's [`AlertAction`] directives, which pick the sinks the
//! event is delivered to.

use chrono::{DateTime, Duration, Utc};
use sentibar_data::SentimentBar;
use serde::{Deserialize, Serialize};

const DEFAULT_COOLDOWN_MINUTES: i64 = 30;

/// Bar or model quantity a condition reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    MeanSent,
    StdSent,
    MinSent,
    MaxSent,
    Count,
    UncMean,
    TimeDecayMean,
    /// Calibrated up-move probability from the serving model.
    Probability,
}

impl Field {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MeanSent => "mean_sent",
            Self::StdSent => "std_sent",
            Self::MinSent => "min_sent",
            Self::MaxSent => "max_sent",
            Self::Count => "count",
            Self::UncMean => "unc_mean",
            Self::TimeDecayMean => "time_decay_mean",
            Self::Probability => "probability",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison applied to a field value.
///
/// `Between` is inclusive on both bounds, `Outside` is strict on both. The
/// cross variants compare the current value against the previous bucket's:
/// `CrossAbove` holds when the previous value was at or below the level and
/// the current one is above it. Without a previous value a cross is false.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Condition {
    GreaterThan { value: f64 },
    LessThan { value: f64 },
    GreaterOrEqual { value: f64 },
    LessOrEqual { value: f64 },
    Between { lo: f64, hi: f64 },
    Outside { lo: f64, hi: f64 },
    CrossAbove { value: f64 },
    CrossBelow { value: f64 },
}

impl Condition {
    /// Evaluates the comparison for a current value and, for cross
    /// conditions, the previous bucket's value.
    #[must_use]
    pub fn holds(&self, value: f64, previous: Option<f64>) -> bool {
        match *self {
            Self::GreaterThan { value: level } => value > level,
            Self::LessThan { value: level } => value < level,
            Self::GreaterOrEqual { value: level } => value >= level,
            Self::LessOrEqual { value: level } => value <= level,
            Self::Between { lo, hi } => lo <= value && value <= hi,
            Self::Outside { lo, hi } => value < lo || value > hi,
            Self::CrossAbove { value: level } => {
                previous.is_some_and(|prev| prev <= level) && value > level
            }
            Self::CrossBelow { value: level } => {
                previous.is_some_and(|prev| prev >= level) && value < level
            }
        }
    }
}

/// One field/comparison pair inside a rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RuleCondition {
    pub field: Field,
    #[serde(flatten)]
    pub condition: Condition,
}

impl RuleCondition {
    #[must_use]
    pub const fn new(field: Field, condition: Condition) -> Self {
        Self { field, condition }
    }

    /// Whether the condition holds for the snapshot. A field the snapshot
    /// cannot produce (missing probability, NaN) never holds.
    #[must_use]
    pub fn is_met(&self, snapshot: &FieldSnapshot<'_>) -> bool {
        match snapshot.value(self.field) {
            Some(value) => self.condition.holds(value, snapshot.previous(self.field)),
            None => false,
        }
    }
}

/// The values a rule's conditions are evaluated against: the latest bar for
/// the rule's ticker, the bar before it (for cross conditions), and the
/// model probabilities for both if a model is being served.
#[derive(Debug, Clone, Copy)]
pub struct FieldSnapshot<'a> {
    pub bar: &'a SentimentBar,
    pub prev_bar: Option<&'a SentimentBar>,
    pub probability: Option<f64>,
    pub prev_probability: Option<f64>,
}

impl FieldSnapshot<'_> {
    /// Current value of a field, `None` when unavailable or NaN.
    #[must_use]
    pub fn value(&self, field: Field) -> Option<f64> {
        match field {
            Field::Probability => self.probability,
            _ => Some(bar_field(self.bar, field)),
        }
        .filter(|v| !v.is_nan())
    }

    /// Previous-bucket value of a field, `None` when there is no prior
    /// bucket, no prior probability, or the value is NaN.
    #[must_use]
    pub fn previous(&self, field: Field) -> Option<f64> {
        match field {
            Field::Probability => self.prev_probability,
            _ => self.prev_bar.map(|bar| bar_field(bar, field)),
        }
        .filter(|v| !v.is_nan())
    }
}

#[allow(clippy::cast_precision_loss)]
fn bar_field(bar: &SentimentBar, field: Field) -> f64 {
    match field {
        Field::MeanSent => bar.mean_sent,
        Field::StdSent => bar.std_sent,
        Field::MinSent => bar.min_sent,
        Field::MaxSent => bar.max_sent,
        Field::Count => bar.count as f64,
        Field::UncMean => bar.unc_mean,
        Field::TimeDecayMean => bar.time_decay_mean,
        Field::Probability => f64::NAN,
    }
}

/// Side-effecting directive a rule carries, executed when it fires.
///
/// A directive picks which sink receives the firing; delivery details (the
/// webhook URL, timeouts) live in the sink's configuration, not on the rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AlertAction {
    /// Write the firing to the application log.
    Log,
    /// POST the firing to the configured webhook.
    Webhook,
}

impl AlertAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Webhook => "webhook",
        }
    }
}

impl std::fmt::Display for AlertAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named alert rule for one ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    pub rule_id: String,
    pub name: String,
    pub ticker: String,
    pub conditions: Vec<RuleCondition>,
    /// Sinks a firing is routed to. Every rule logs unless overridden.
    #[serde(default = "default_actions")]
    pub actions: Vec<AlertAction>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Minimum minutes between two firings of this rule.
    #[serde(default = "default_cooldown_minutes")]
    pub cooldown_minutes: i64,
    #[serde(default)]
    pub last_triggered: Option<DateTime<Utc>>,
}

fn default_actions() -> Vec<AlertAction> {
    vec![AlertAction::Log]
}

const fn default_enabled() -> bool {
    true
}

const fn default_cooldown_minutes() -> i64 {
    DEFAULT_COOLDOWN_MINUTES
}

impl AlertRule {
    /// Creates an enabled rule with no conditions and the default cooldown.
    #[must_use]
    pub fn new(
        rule_id: impl Into<String>,
        name: impl Into<String>,
        ticker: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            name: name.into(),
            ticker: ticker.into(),
            conditions: Vec::new(),
            actions: default_actions(),
            enabled: default_enabled(),
            cooldown_minutes: default_cooldown_minutes(),
            last_triggered: None,
        }
    }

    #[must_use]
    pub fn with_condition(mut self, field: Field, condition: Condition) -> Self {
        self.conditions.push(RuleCondition::new(field, condition));
        self
    }

    #[must_use]
    pub fn with_action(mut self, action: AlertAction) -> Self {
        self.actions.push(action);
        self
    }

    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    #[must_use]
    pub fn with_cooldown_minutes(mut self, minutes: i64) -> Self {
        self.cooldown_minutes = minutes;
        self
    }

    /// Whether the last firing is still inside the cooldown window.
    /// A firing exactly `cooldown_minutes` ago is out of cooldown.
    #[must_use]
    pub fn in_cooldown(&self, now: DateTime<Utc>) -> bool {
        self.last_triggered
            .is_some_and(|last| now - last < Duration::minutes(self.cooldown_minutes))
    }

    /// Evaluates the rule against a snapshot. Disabled rules, rules in
    /// cooldown, and rules with no conditions never fire.
    #[must_use]
    pub fn is_triggered(&self, snapshot: &FieldSnapshot<'_>, now: DateTime<Utc>) -> bool {
        if !self.enabled || self.conditions.is_empty() || self.in_cooldown(now) {
            return false;
        }
        self.conditions.iter().all(|c| c.is_met(snapshot))
    }

    /// Records a firing, starting the cooldown window, and returns the
    /// directives to execute for it.
    pub fn trigger(&mut self, now: DateTime<Utc>) -> &[AlertAction] {
        self.last_triggered = Some(now);
        &self.actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bar_with_mean(mean_sent: f64) -> SentimentBar {
        SentimentBar {
            ticker: "ACME".to_string(),
            bucket_start: Utc.with_ymd_and_hms(2025, 3, 10, 14, 0, 0).unwrap(),
            mean_sent,
            std_sent: 0.1,
            min_sent: mean_sent - 0.2,
            max_sent: mean_sent + 0.2,
            count: 4,
            unc_mean: 0.25,
            time_decay_mean: mean_sent,
        }
    }

    fn snapshot(bar: &SentimentBar) -> FieldSnapshot<'_> {
        FieldSnapshot {
            bar,
            prev_bar: None,
            probability: Some(0.7),
            prev_probability: None,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 14, 5, 0).unwrap()
    }

    // ========================================================================
    // Condition semantics
    // ========================================================================

    #[test]
    fn between_includes_both_bounds() {
        let cond = Condition::Between { lo: 0.2, hi: 0.6 };
        assert!(cond.holds(0.2, None));
        assert!(cond.holds(0.6, None));
        assert!(cond.holds(0.4, None));
        assert!(!cond.holds(0.61, None));
    }

    #[test]
    fn outside_excludes_both_bounds() {
        let cond = Condition::Outside { lo: 0.2, hi: 0.6 };
        assert!(!cond.holds(0.2, None));
        assert!(!cond.holds(0.6, None));
        assert!(cond.holds(0.19, None));
        assert!(cond.holds(0.61, None));
    }

    #[test]
    fn cross_above_requires_previous_at_or_below_the_level() {
        let cond = Condition::CrossAbove { value: 0.5 };
        assert!(cond.holds(0.6, Some(0.4)));
        assert!(cond.holds(0.6, Some(0.5)));
        assert!(!cond.holds(0.6, Some(0.55)));
        assert!(!cond.holds(0.6, None));
        assert!(!cond.holds(0.4, Some(0.3)));
    }

    #[test]
    fn cross_below_requires_previous_at_or_above_the_level() {
        let cond = Condition::CrossBelow { value: -0.2 };
        assert!(cond.holds(-0.3, Some(-0.1)));
        assert!(cond.holds(-0.3, Some(-0.2)));
        assert!(!cond.holds(-0.3, Some(-0.25)));
        assert!(!cond.holds(-0.3, None));
    }

    // ========================================================================
    // Snapshot field access
    // ========================================================================

    #[test]
    fn snapshot_reads_bar_fields_and_probability() {
        let bar = bar_with_mean(0.5);
        let snap = snapshot(&bar);
        assert_eq!(snap.value(Field::MeanSent), Some(0.5));
        assert_eq!(snap.value(Field::Count), Some(4.0));
        assert_eq!(snap.value(Field::Probability), Some(0.7));
    }

    #[test]
    fn missing_probability_makes_the_condition_false() {
        let bar = bar_with_mean(0.5);
        let snap = FieldSnapshot {
            bar: &bar,
            prev_bar: None,
            probability: None,
            prev_probability: None,
        };
        let cond = RuleCondition::new(Field::Probability, Condition::GreaterThan { value: 0.0 });
        assert!(!cond.is_met(&snap));
    }

    #[test]
    fn nan_field_makes_the_condition_false() {
        let mut bar = bar_with_mean(0.5);
        bar.std_sent = f64::NAN;
        let snap = snapshot(&bar);
        let cond = RuleCondition::new(Field::StdSent, Condition::LessThan { value: 1.0 });
        assert!(!cond.is_met(&snap));
    }

    #[test]
    fn previous_values_come_from_the_prior_bucket() {
        let prev = bar_with_mean(0.3);
        let bar = bar_with_mean(0.6);
        let snap = FieldSnapshot {
            bar: &bar,
            prev_bar: Some(&prev),
            probability: None,
            prev_probability: None,
        };
        let cond = RuleCondition::new(Field::MeanSent, Condition::CrossAbove { value: 0.5 });
        assert!(cond.is_met(&snap));
    }

    // ========================================================================
    // Rule evaluation
    // ========================================================================

    #[test]
    fn every_condition_must_hold() {
        let rule = AlertRule::new("r1", "bullish and busy", "ACME")
            .with_condition(Field::MeanSent, Condition::GreaterThan { value: 0.4 })
            .with_condition(Field::Count, Condition::GreaterOrEqual { value: 3.0 });
        let bar = bar_with_mean(0.5);
        assert!(rule.is_triggered(&snapshot(&bar), now()));

        let quiet = SentimentBar {
            count: 2,
            ..bar_with_mean(0.5)
        };
        assert!(!rule.is_triggered(&snapshot(&quiet), now()));
    }

    #[test]
    fn disabled_rules_never_fire() {
        let rule = AlertRule::new("r1", "off", "ACME")
            .with_condition(Field::MeanSent, Condition::GreaterThan { value: 0.0 })
            .with_enabled(false);
        let bar = bar_with_mean(0.5);
        assert!(!rule.is_triggered(&snapshot(&bar), now()));
    }

    #[test]
    fn rules_without_conditions_never_fire() {
        let rule = AlertRule::new("r1", "empty", "ACME");
        let bar = bar_with_mean(0.5);
        assert!(!rule.is_triggered(&snapshot(&bar), now()));
    }

    #[test]
    fn cooldown_suppresses_until_the_window_elapses() {
        let mut rule = AlertRule::new("r1", "hot", "ACME")
            .with_condition(Field::MeanSent, Condition::GreaterThan { value: 0.0 })
            .with_cooldown_minutes(30);
        let bar = bar_with_mean(0.5);
        let t0 = now();
        assert!(rule.is_triggered(&snapshot(&bar), t0));
        rule.trigger(t0);

        let during = t0 + Duration::minutes(29);
        assert!(rule.in_cooldown(during));
        assert!(!rule.is_triggered(&snapshot(&bar), during));

        let after = t0 + Duration::minutes(30);
        assert!(!rule.in_cooldown(after));
        assert!(rule.is_triggered(&snapshot(&bar), after));
    }

    // ========================================================================
    // Serialization
    // ========================================================================

    #[test]
    fn conditions_serialize_with_a_tagged_op() {
        let cond = RuleCondition::new(Field::MeanSent, Condition::GreaterThan { value: 0.5 });
        let json = serde_json::to_value(cond).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"field": "mean_sent", "op": "greater_than", "value": 0.5})
        );

        let cond = RuleCondition::new(Field::Count, Condition::Between { lo: 1.0, hi: 10.0 });
        let json = serde_json::to_value(cond).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"field": "count", "op": "between", "lo": 1.0, "hi": 10.0})
        );
    }

    #[test]
    fn actions_serialize_with_a_tagged_type() {
        let json = serde_json::to_value(vec![AlertAction::Log, AlertAction::Webhook]).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{"type": "log"}, {"type": "webhook"}])
        );
    }

    #[test]
    fn rule_json_roundtrip_preserves_everything() {
        let mut rule = AlertRule::new("spike-acme", "ACME sentiment spike", "ACME")
            .with_condition(Field::TimeDecayMean, Condition::CrossAbove { value: 0.6 })
            .with_condition(Field::Probability, Condition::GreaterThan { value: 0.65 })
            .with_action(AlertAction::Webhook)
            .with_cooldown_minutes(45);
        rule.trigger(now());

        let json = serde_json::to_string(&rule).unwrap();
        let back: AlertRule = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rule);
    }

    #[test]
    fn omitted_rule_fields_take_defaults() {
        let json = r#"{
            "rule_id": "r1",
            "name": "minimal",
            "ticker": "ACME",
            "conditions": [{"field": "mean_sent", "op": "less_than", "value": -0.3}]
        }"#;
        let rule: AlertRule = serde_json::from_str(json).unwrap();
        assert!(rule.enabled);
        assert_eq!(rule.cooldown_minutes, 30);
        assert_eq!(rule.last_triggered, None);
        assert_eq!(rule.conditions.len(), 1);
        assert_eq!(rule.actions, vec![AlertAction::Log]);
    }
}
