//! Request handlers.
//!
//! Every fallible handler returns `Result<Json<T>, StatusCode>`; pipeline
//! errors map to statuses through [`error_status`]: missing data is 404,
//! a missing model artifact is 503, invalid input is 400, anything else
//! is 500.

use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use sentibar_alerts::{notify_all, AlertEvent, AlertRule};
use sentibar_core::{Decision, PipelineError};
use sentibar_data::SentimentBar;
use sentibar_model::FeatureFrame;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
}

#[derive(Serialize)]
pub struct TickerSummary {
    pub ticker: String,
    pub bars: usize,
}

#[derive(Serialize)]
pub struct TickersResponse {
    pub tickers: Vec<TickerSummary>,
}

#[derive(Deserialize)]
pub struct BarsQuery {
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct BarsResponse {
    pub ticker: String,
    pub count: usize,
    pub bars: Vec<SentimentBar>,
}

#[derive(Deserialize)]
pub struct SignalQuery {
    pub threshold_long: Option<f64>,
    pub threshold_short: Option<f64>,
}

#[derive(Serialize)]
pub struct Thresholds {
    pub long: f64,
    pub short: f64,
}

#[derive(Serialize)]
pub struct SignalResponse {
    pub ticker: String,
    pub bucket_start: DateTime<Utc>,
    pub prob_up: f64,
    pub decision: Decision,
    pub thresholds: Thresholds,
}

/// The bar fields behind a served probability.
#[derive(Serialize)]
pub struct BarComponents {
    pub mean_sent: f64,
    pub std_sent: f64,
    pub min_sent: f64,
    pub max_sent: f64,
    pub count: u64,
    pub unc_mean: f64,
    pub time_decay_mean: f64,
}

impl From<&SentimentBar> for BarComponents {
    fn from(bar: &SentimentBar) -> Self {
        Self {
            mean_sent: bar.mean_sent,
            std_sent: bar.std_sent,
            min_sent: bar.min_sent,
            max_sent: bar.max_sent,
            count: bar.count,
            unc_mean: bar.unc_mean,
            time_decay_mean: bar.time_decay_mean,
        }
    }
}

#[derive(Serialize)]
pub struct ProbabilitiesResponse {
    pub ticker: String,
    pub bucket_start: DateTime<Utc>,
    pub prob_up: f64,
    pub prob_down: f64,
    pub components: BarComponents,
    /// The feature vector exactly as the model consumed it, in schema order.
    pub model_features: BTreeMap<String, f64>,
}

#[derive(Serialize)]
pub struct RulesResponse {
    pub rules: Vec<AlertRule>,
}

#[derive(Serialize)]
pub struct RuleCreatedResponse {
    pub rule_id: String,
}

#[derive(Serialize)]
pub struct ProcessResponse {
    pub count: usize,
    pub delivered: usize,
    pub events: Vec<AlertEvent>,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "sentibar-web-api",
    })
}

/// Lists every ticker with at least one bar.
///
/// # Errors
/// Returns `StatusCode::NOT_FOUND` when no bars exist yet.
pub async fn list_tickers(
    State(state): State<AppState>,
) -> Result<Json<TickersResponse>, StatusCode> {
    let bars = state.load_bars().map_err(error_status)?;
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for bar in bars {
        *counts.entry(bar.ticker).or_default() += 1;
    }
    let tickers = counts
        .into_iter()
        .map(|(ticker, bars)| TickerSummary { ticker, bars })
        .collect();
    Ok(Json(TickersResponse { tickers }))
}

/// Returns a ticker's bars in time order, optionally only the newest
/// `limit`.
///
/// # Errors
/// Returns `StatusCode::NOT_FOUND` for an unknown ticker and
/// `StatusCode::BAD_REQUEST` for `limit=0`.
pub async fn get_bars(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
    Query(query): Query<BarsQuery>,
) -> Result<Json<BarsResponse>, StatusCode> {
    if query.limit == Some(0) {
        return Err(StatusCode::BAD_REQUEST);
    }
    let mut bars: Vec<SentimentBar> = state
        .load_bars()
        .map_err(error_status)?
        .into_iter()
        .filter(|bar| bar.ticker == ticker)
        .collect();
    if bars.is_empty() {
        return Err(StatusCode::NOT_FOUND);
    }
    bars.sort_by_key(|bar| bar.bucket_start);
    if let Some(limit) = query.limit {
        if bars.len() > limit {
            bars.drain(..bars.len() - limit);
        }
    }
    Ok(Json(BarsResponse {
        ticker,
        count: bars.len(),
        bars,
    }))
}

/// Serves the trading decision for a ticker's newest bucket. The configured
/// thresholds can be overridden per request via query parameters.
///
/// # Errors
/// Returns `StatusCode::BAD_REQUEST` for threshold overrides outside [0, 1]
/// or inverted, `StatusCode::NOT_FOUND` for an unknown ticker, and
/// `StatusCode::SERVICE_UNAVAILABLE` when no model artifact exists.
pub async fn get_signal(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
    Query(query): Query<SignalQuery>,
) -> Result<Json<SignalResponse>, StatusCode> {
    let signals = state.signals();
    let long = query.threshold_long.unwrap_or(signals.threshold_long);
    let short = query.threshold_short.unwrap_or(signals.threshold_short);
    if !(0.0..=1.0).contains(&long) || !(0.0..=1.0).contains(&short) || short >= long {
        return Err(StatusCode::BAD_REQUEST);
    }

    let bars = state.load_bars().map_err(error_status)?;
    let bar = latest_bar(bars, &ticker).ok_or(StatusCode::NOT_FOUND)?;
    let model = state.load_model().map_err(error_status)?;

    let frame = FeatureFrame::from_bars(std::slice::from_ref(&bar));
    let prob_up = model
        .predict_proba(&frame)
        .first()
        .copied()
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;
    let decision = Decision::from_thresholds(prob_up, long, short);

    Ok(Json(SignalResponse {
        ticker,
        bucket_start: bar.bucket_start,
        prob_up,
        decision,
        thresholds: Thresholds { long, short },
    }))
}

/// Serves the up/down probabilities for a ticker's newest bucket together
/// with the bar fields and the exact feature vector the model consumed.
///
/// # Errors
/// Returns `StatusCode::NOT_FOUND` for an unknown ticker and
/// `StatusCode::SERVICE_UNAVAILABLE` when no model artifact exists.
pub async fn get_probabilities(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> Result<Json<ProbabilitiesResponse>, StatusCode> {
    let bars = state.load_bars().map_err(error_status)?;
    let bar = latest_bar(bars, &ticker).ok_or(StatusCode::NOT_FOUND)?;
    let model = state.load_model().map_err(error_status)?;

    let frame = FeatureFrame::from_bars(std::slice::from_ref(&bar));
    let prob_up = model
        .predict_proba(&frame)
        .first()
        .copied()
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;

    let matrix = frame.to_matrix(model.schema());
    let model_features: BTreeMap<String, f64> = model
        .schema()
        .columns()
        .iter()
        .cloned()
        .zip(matrix.row(0).iter().copied())
        .collect();

    Ok(Json(ProbabilitiesResponse {
        ticker,
        bucket_start: bar.bucket_start,
        prob_up,
        prob_down: 1.0 - prob_up,
        components: BarComponents::from(&bar),
        model_features,
    }))
}

/// Lists all alert rules.
pub async fn list_alert_rules(State(state): State<AppState>) -> Json<RulesResponse> {
    let engine = state.engine().await;
    let rules = engine.list_rules().into_iter().cloned().collect();
    Json(RulesResponse { rules })
}

/// Creates an alert rule.
///
/// # Errors
/// Returns `StatusCode::BAD_REQUEST` for a duplicate id or a rule without
/// conditions.
pub async fn create_alert_rule(
    State(state): State<AppState>,
    Json(rule): Json<AlertRule>,
) -> Result<(StatusCode, Json<RuleCreatedResponse>), StatusCode> {
    let rule_id = rule.rule_id.clone();
    state.engine().await.add_rule(rule).map_err(error_status)?;
    Ok((StatusCode::CREATED, Json(RuleCreatedResponse { rule_id })))
}

/// Fetches one alert rule.
///
/// # Errors
/// Returns `StatusCode::NOT_FOUND` when the rule does not exist.
pub async fn get_alert_rule(
    State(state): State<AppState>,
    Path(rule_id): Path<String>,
) -> Result<Json<AlertRule>, StatusCode> {
    state
        .engine()
        .await
        .get_rule(&rule_id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// Replaces an alert rule; the id in the path wins over the body. The
/// stored cooldown stamp is preserved when the body omits it.
///
/// # Errors
/// Returns `StatusCode::NOT_FOUND` when the rule does not exist and
/// `StatusCode::BAD_REQUEST` when the replacement has no conditions.
pub async fn update_alert_rule(
    State(state): State<AppState>,
    Path(rule_id): Path<String>,
    Json(mut rule): Json<AlertRule>,
) -> Result<Json<AlertRule>, StatusCode> {
    rule.rule_id = rule_id;
    let mut engine = state.engine().await;
    if engine.get_rule(&rule.rule_id).is_none() {
        return Err(StatusCode::NOT_FOUND);
    }
    let rule_id = rule.rule_id.clone();
    engine.update_rule(rule).map_err(error_status)?;
    engine
        .get_rule(&rule_id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Deletes an alert rule.
///
/// # Errors
/// Returns `StatusCode::NOT_FOUND` when the rule does not exist.
pub async fn delete_alert_rule(
    State(state): State<AppState>,
    Path(rule_id): Path<String>,
) -> Result<StatusCode, StatusCode> {
    let removed = state
        .engine()
        .await
        .remove_rule(&rule_id)
        .map_err(error_status)?;
    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

/// Runs an alert sweep now and delivers fired events to every notifier.
///
/// # Errors
/// Returns `StatusCode::NOT_FOUND` when no bars exist yet.
pub async fn process_alerts(
    State(state): State<AppState>,
) -> Result<Json<ProcessResponse>, StatusCode> {
    let bars = state.load_bars().map_err(error_status)?;
    let probabilities = state.probabilities(&bars);
    let events = state
        .engine()
        .await
        .process(&bars, &probabilities, Utc::now());
    let delivered = notify_all(state.notifiers(), &events).await;
    Ok(Json(ProcessResponse {
        count: events.len(),
        delivered,
        events,
    }))
}

fn latest_bar(bars: Vec<SentimentBar>, ticker: &str) -> Option<SentimentBar> {
    bars.into_iter()
        .filter(|bar| bar.ticker == ticker)
        .max_by_key(|bar| bar.bucket_start)
}

fn error_status(err: PipelineError) -> StatusCode {
    let status = match &err {
        PipelineError::InsufficientData(_) => StatusCode::NOT_FOUND,
        PipelineError::ModelArtifact(_) => StatusCode::SERVICE_UNAVAILABLE,
        PipelineError::InvalidRule(_) | PipelineError::InvalidConfig(_) => StatusCode::BAD_REQUEST,
        PipelineError::SourceUnavailable { .. }
        | PipelineError::ModelInference(_)
        | PipelineError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    warn!("Request failed with {}: {}", status, err);
    status
}
