//! Rule registry and alert sweep execution.
//!
//! The engine owns the rules, keyed by `rule_id`, and optionally persists
//! them as pretty-printed JSON so cooldown state survives restarts. Writes
//! go through a temp-file rename, matching how the model artifact is saved,
//! so a reader never sees a half-written rules file.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use sentibar_core::{Decision, PipelineError, Result, SignalConfig};
use sentibar_data::{AlertHistoryRecord, SentimentBar};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::rule::{AlertAction, AlertRule, FieldSnapshot};

/// A rule firing, as handed to notifiers and the history log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub rule_id: String,
    pub rule_name: String,
    pub ticker: String,
    /// Model probability for the ticker at sweep time, if a model was served.
    pub probability: Option<f64>,
    pub decision: Decision,
    /// The fired rule's directives, routing delivery to matching sinks.
    pub actions: Vec<AlertAction>,
    pub triggered_at: DateTime<Utc>,
}

impl AlertEvent {
    /// Converts the event into the row shape the history table stores.
    #[must_use]
    pub fn to_history_record(&self) -> AlertHistoryRecord {
        AlertHistoryRecord {
            rule_id: self.rule_id.clone(),
            ticker: self.ticker.clone(),
            probability: self.probability,
            decision: self.decision.as_str().to_string(),
            triggered_at: self.triggered_at,
        }
    }
}

/// Holds alert rules and evaluates them against the latest bars.
#[derive(Debug)]
pub struct AlertEngine {
    rules: BTreeMap<String, AlertRule>,
    store_path: Option<PathBuf>,
    signals: SignalConfig,
}

impl AlertEngine {
    /// An in-memory engine with no persistence.
    #[must_use]
    pub fn new(signals: SignalConfig) -> Self {
        Self {
            rules: BTreeMap::new(),
            store_path: None,
            signals,
        }
    }

    /// An engine backed by a JSON rules file. A missing file starts empty;
    /// an unreadable or unparsable one is an error rather than a silent
    /// reset, so a typo never wipes the rule set.
    ///
    /// # Errors
    /// Returns [`PipelineError::Storage`] if the file exists but cannot be
    /// read or parsed.
    pub fn with_store(signals: SignalConfig, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let rules = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            let loaded: Vec<AlertRule> = serde_json::from_str(&raw).map_err(|err| {
                PipelineError::Storage(format!("alert rules file {}: {err}", path.display()))
            })?;
            info!("Loaded {} alert rules from {}", loaded.len(), path.display());
            loaded
                .into_iter()
                .map(|rule| (rule.rule_id.clone(), rule))
                .collect()
        } else {
            debug!("No alert rules file at {}, starting empty", path.display());
            BTreeMap::new()
        };
        Ok(Self {
            rules,
            store_path: Some(path),
            signals,
        })
    }

    /// Registers a new rule and persists the set.
    ///
    /// # Errors
    /// Returns [`PipelineError::InvalidRule`] for a duplicate `rule_id` or a
    /// rule with no conditions, [`PipelineError::Storage`] if persisting
    /// fails.
    pub fn add_rule(&mut self, rule: AlertRule) -> Result<()> {
        if rule.conditions.is_empty() {
            return Err(PipelineError::InvalidRule(format!(
                "rule '{}' has no conditions",
                rule.rule_id
            )));
        }
        if self.rules.contains_key(&rule.rule_id) {
            return Err(PipelineError::InvalidRule(format!(
                "duplicate rule id '{}'",
                rule.rule_id
            )));
        }
        info!("Registered alert rule {} for {}", rule.rule_id, rule.ticker);
        self.rules.insert(rule.rule_id.clone(), rule);
        self.persist()
    }

    /// Replaces an existing rule. The stored `last_triggered` is carried
    /// over when the incoming rule omits it, so editing a rule does not
    /// reset its cooldown.
    ///
    /// # Errors
    /// Returns [`PipelineError::InvalidRule`] if no rule with this id
    /// exists or the replacement has no conditions.
    pub fn update_rule(&mut self, mut rule: AlertRule) -> Result<()> {
        if rule.conditions.is_empty() {
            return Err(PipelineError::InvalidRule(format!(
                "rule '{}' has no conditions",
                rule.rule_id
            )));
        }
        let Some(existing) = self.rules.get(&rule.rule_id) else {
            return Err(PipelineError::InvalidRule(format!(
                "no rule with id '{}'",
                rule.rule_id
            )));
        };
        if rule.last_triggered.is_none() {
            rule.last_triggered = existing.last_triggered;
        }
        self.rules.insert(rule.rule_id.clone(), rule);
        self.persist()
    }

    /// Removes a rule, returning whether it existed.
    ///
    /// # Errors
    /// Returns [`PipelineError::Storage`] if persisting the shrunk set
    /// fails.
    pub fn remove_rule(&mut self, rule_id: &str) -> Result<bool> {
        if self.rules.remove(rule_id).is_none() {
            return Ok(false);
        }
        info!("Removed alert rule {rule_id}");
        self.persist()?;
        Ok(true)
    }

    #[must_use]
    pub fn get_rule(&self, rule_id: &str) -> Option<&AlertRule> {
        self.rules.get(rule_id)
    }

    /// All rules in `rule_id` order.
    #[must_use]
    pub fn list_rules(&self) -> Vec<&AlertRule> {
        self.rules.values().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluates every rule against the latest bar for its ticker and
    /// returns the fired events. Fired rules get their cooldown stamped;
    /// the updated set is persisted afterwards, with a persistence failure
    /// logged rather than aborting the sweep.
    ///
    /// `probabilities` maps tickers to the current model output; tickers
    /// absent from the map evaluate probability conditions as false and
    /// report a `hold` decision.
    pub fn process(
        &mut self,
        bars: &[SentimentBar],
        probabilities: &HashMap<String, f64>,
        now: DateTime<Utc>,
    ) -> Vec<AlertEvent> {
        let latest = latest_bars(bars);
        let mut events = Vec::new();
        for rule in self.rules.values_mut() {
            let Some(&(bar, prev_bar)) = latest.get(rule.ticker.as_str()) else {
                debug!("No bars for {}, skipping rule {}", rule.ticker, rule.rule_id);
                continue;
            };
            let probability = probabilities.get(rule.ticker.as_str()).copied();
            let snapshot = FieldSnapshot {
                bar,
                prev_bar,
                probability,
                prev_probability: None,
            };
            if rule.is_triggered(&snapshot, now) {
                let actions = rule.trigger(now).to_vec();
                let decision = probability
                    .map_or(Decision::Hold, |p| Decision::from_probability(p, &self.signals));
                info!(
                    "Alert rule {} fired for {} (decision: {})",
                    rule.rule_id, rule.ticker, decision
                );
                events.push(AlertEvent {
                    rule_id: rule.rule_id.clone(),
                    rule_name: rule.name.clone(),
                    ticker: rule.ticker.clone(),
                    probability,
                    decision,
                    actions,
                    triggered_at: now,
                });
            }
        }
        if !events.is_empty() {
            if let Err(err) = self.persist() {
                warn!("Failed to persist alert rules after sweep: {err}");
            }
        }
        events
    }

    fn persist(&self) -> Result<()> {
        let Some(path) = &self.store_path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let rules: Vec<&AlertRule> = self.rules.values().collect();
        let json = serde_json::to_string_pretty(&rules)
            .map_err(|err| PipelineError::Storage(format!("serializing alert rules: {err}")))?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

/// Latest and second-latest bar per ticker, by `bucket_start`.
fn latest_bars(bars: &[SentimentBar]) -> BTreeMap<&str, (&SentimentBar, Option<&SentimentBar>)> {
    let mut by_ticker: BTreeMap<&str, Vec<&SentimentBar>> = BTreeMap::new();
    for bar in bars {
        by_ticker.entry(bar.ticker.as_str()).or_default().push(bar);
    }
    by_ticker
        .into_iter()
        .filter_map(|(ticker, mut group)| {
            group.sort_by_key(|bar| bar.bucket_start);
            let mut newest_first = group.into_iter().rev();
            let latest = newest_first.next()?;
            Some((ticker, (latest, newest_first.next())))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{AlertAction, Condition, Field};
    use chrono::TimeZone;

    fn signals() -> SignalConfig {
        SignalConfig {
            threshold_long: 0.62,
            threshold_short: 0.40,
            costs_bps: 5.0,
        }
    }

    fn bar(ticker: &str, hour: u32, mean_sent: f64) -> SentimentBar {
        SentimentBar {
            ticker: ticker.to_string(),
            bucket_start: Utc.with_ymd_and_hms(2025, 3, 10, hour, 0, 0).unwrap(),
            mean_sent,
            std_sent: 0.1,
            min_sent: mean_sent - 0.2,
            max_sent: mean_sent + 0.2,
            count: 4,
            unc_mean: 0.25,
            time_decay_mean: mean_sent,
        }
    }

    fn bullish_rule(rule_id: &str, ticker: &str) -> AlertRule {
        AlertRule::new(rule_id, format!("{ticker} bullish"), ticker)
            .with_condition(Field::MeanSent, Condition::GreaterThan { value: 0.4 })
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 15, 5, 0).unwrap()
    }

    // ========================================================================
    // Rule CRUD
    // ========================================================================

    #[test]
    fn duplicate_rule_ids_are_rejected() {
        let mut engine = AlertEngine::new(signals());
        engine.add_rule(bullish_rule("r1", "ACME")).unwrap();
        let err = engine.add_rule(bullish_rule("r1", "BETA")).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidRule(_)));
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn rules_without_conditions_are_rejected() {
        let mut engine = AlertEngine::new(signals());
        let err = engine
            .add_rule(AlertRule::new("r1", "empty", "ACME"))
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidRule(_)));
    }

    #[test]
    fn updating_a_missing_rule_fails() {
        let mut engine = AlertEngine::new(signals());
        let err = engine.update_rule(bullish_rule("ghost", "ACME")).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidRule(_)));
    }

    #[test]
    fn updating_keeps_the_cooldown_stamp_unless_overridden() {
        let mut engine = AlertEngine::new(signals());
        let mut rule = bullish_rule("r1", "ACME");
        rule.trigger(now());
        engine.add_rule(rule).unwrap();

        let replacement = bullish_rule("r1", "ACME").with_cooldown_minutes(60);
        engine.update_rule(replacement).unwrap();

        let stored = engine.get_rule("r1").unwrap();
        assert_eq!(stored.cooldown_minutes, 60);
        assert_eq!(stored.last_triggered, Some(now()));
    }

    #[test]
    fn remove_reports_whether_the_rule_existed() {
        let mut engine = AlertEngine::new(signals());
        engine.add_rule(bullish_rule("r1", "ACME")).unwrap();
        assert!(engine.remove_rule("r1").unwrap());
        assert!(!engine.remove_rule("r1").unwrap());
        assert!(engine.is_empty());
    }

    #[test]
    fn list_rules_is_ordered_by_rule_id() {
        let mut engine = AlertEngine::new(signals());
        engine.add_rule(bullish_rule("zeta", "ACME")).unwrap();
        engine.add_rule(bullish_rule("alpha", "BETA")).unwrap();
        let ids: Vec<&str> = engine
            .list_rules()
            .iter()
            .map(|r| r.rule_id.as_str())
            .collect();
        assert_eq!(ids, vec!["alpha", "zeta"]);
    }

    // ========================================================================
    // Sweep behavior
    // ========================================================================

    #[test]
    fn sweep_fires_matching_rules_and_stamps_cooldown() {
        let mut engine = AlertEngine::new(signals());
        engine.add_rule(bullish_rule("r-acme", "ACME")).unwrap();
        engine.add_rule(bullish_rule("r-beta", "BETA")).unwrap();

        let bars = vec![bar("ACME", 14, 0.6), bar("BETA", 14, -0.1)];
        let probs = HashMap::from([("ACME".to_string(), 0.71)]);

        let events = engine.process(&bars, &probs, now());
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.rule_id, "r-acme");
        assert_eq!(event.ticker, "ACME");
        assert_eq!(event.probability, Some(0.71));
        assert_eq!(event.decision, Decision::Long);
        assert_eq!(event.actions, vec![AlertAction::Log]);
        assert_eq!(event.triggered_at, now());

        // Same sweep again within the cooldown window stays quiet.
        let again = engine.process(&bars, &probs, now() + chrono::Duration::minutes(5));
        assert!(again.is_empty());
    }

    #[test]
    fn rules_for_tickers_without_bars_are_skipped() {
        let mut engine = AlertEngine::new(signals());
        engine.add_rule(bullish_rule("r1", "GHOST")).unwrap();
        let bars = vec![bar("ACME", 14, 0.9)];
        assert!(engine.process(&bars, &HashMap::new(), now()).is_empty());
    }

    #[test]
    fn missing_probability_reports_a_hold_decision() {
        let mut engine = AlertEngine::new(signals());
        engine.add_rule(bullish_rule("r1", "ACME")).unwrap();
        let bars = vec![bar("ACME", 14, 0.6)];
        let events = engine.process(&bars, &HashMap::new(), now());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].probability, None);
        assert_eq!(events[0].decision, Decision::Hold);
    }

    #[test]
    fn only_the_latest_bucket_is_evaluated() {
        let mut engine = AlertEngine::new(signals());
        engine.add_rule(bullish_rule("r1", "ACME")).unwrap();
        // The older bar would match, the latest does not.
        let bars = vec![bar("ACME", 13, 0.9), bar("ACME", 14, -0.5)];
        assert!(engine.process(&bars, &HashMap::new(), now()).is_empty());
    }

    #[test]
    fn cross_conditions_see_the_previous_bucket() {
        let mut engine = AlertEngine::new(signals());
        let rule = AlertRule::new("r1", "momentum flip", "ACME")
            .with_condition(Field::MeanSent, Condition::CrossAbove { value: 0.5 });
        engine.add_rule(rule).unwrap();

        let crossing = vec![bar("ACME", 13, 0.3), bar("ACME", 14, 0.7)];
        assert_eq!(engine.process(&crossing, &HashMap::new(), now()).len(), 1);

        let mut engine = AlertEngine::new(signals());
        let rule = AlertRule::new("r1", "momentum flip", "ACME")
            .with_condition(Field::MeanSent, Condition::CrossAbove { value: 0.5 });
        engine.add_rule(rule).unwrap();

        // Already above in the previous bucket: no cross.
        let flat = vec![bar("ACME", 13, 0.7), bar("ACME", 14, 0.8)];
        assert!(engine.process(&flat, &HashMap::new(), now()).is_empty());
    }

    #[test]
    fn fired_events_carry_the_rule_actions() {
        let mut engine = AlertEngine::new(signals());
        let rule = bullish_rule("r1", "ACME").with_action(AlertAction::Webhook);
        engine.add_rule(rule).unwrap();

        let bars = vec![bar("ACME", 14, 0.6)];
        let events = engine.process(&bars, &HashMap::new(), now());
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].actions,
            vec![AlertAction::Log, AlertAction::Webhook]
        );
    }

    #[test]
    fn event_converts_to_a_history_record() {
        let event = AlertEvent {
            rule_id: "r1".to_string(),
            rule_name: "spike".to_string(),
            ticker: "ACME".to_string(),
            probability: Some(0.71),
            decision: Decision::Long,
            actions: vec![AlertAction::Log],
            triggered_at: now(),
        };
        let record = event.to_history_record();
        assert_eq!(record.rule_id, "r1");
        assert_eq!(record.decision, "long");
        assert_eq!(record.probability, Some(0.71));
        assert_eq!(record.triggered_at, now());
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    #[test]
    fn rules_and_cooldowns_survive_a_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("alert_rules.json");

        let mut engine = AlertEngine::with_store(signals(), &store).unwrap();
        engine.add_rule(bullish_rule("r1", "ACME")).unwrap();
        let bars = vec![bar("ACME", 14, 0.6)];
        let events = engine.process(&bars, &HashMap::new(), now());
        assert_eq!(events.len(), 1);
        drop(engine);

        let reloaded = AlertEngine::with_store(signals(), &store).unwrap();
        assert_eq!(reloaded.len(), 1);
        let rule = reloaded.get_rule("r1").unwrap();
        assert_eq!(rule.last_triggered, Some(now()));
    }

    #[test]
    fn missing_store_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let engine = AlertEngine::with_store(signals(), dir.path().join("none.json")).unwrap();
        assert!(engine.is_empty());
    }

    #[test]
    fn corrupt_store_file_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("alert_rules.json");
        std::fs::write(&store, "{ not json").unwrap();
        let err = AlertEngine::with_store(signals(), &store).unwrap_err();
        assert!(matches!(err, PipelineError::Storage(_)));
    }

    #[test]
    fn store_file_is_a_readable_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("alert_rules.json");
        let mut engine = AlertEngine::with_store(signals(), &store).unwrap();
        engine.add_rule(bullish_rule("r1", "ACME")).unwrap();

        let raw = std::fs::read_to_string(&store).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value.as_array().map(Vec::len), Some(1));
        assert_eq!(value[0]["rule_id"], "r1");
        assert_eq!(value[0]["conditions"][0]["op"], "greater_than");
        assert_eq!(value[0]["actions"][0]["type"], "log");
    }
}
