use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

pub struct ApiServer {
    state: AppState,
}

impl ApiServer {
    #[must_use]
    pub const fn new(state: AppState) -> Self {
        Self { state }
    }

    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/health", get(handlers::health))
            .route("/api/tickers", get(handlers::list_tickers))
            .route("/api/bars/:ticker", get(handlers::get_bars))
            .route("/api/signal/:ticker", get(handlers::get_signal))
            .route("/api/probabilities/:ticker", get(handlers::get_probabilities))
            .route("/api/alerts/rules", get(handlers::list_alert_rules))
            .route("/api/alerts/rules", post(handlers::create_alert_rule))
            .route("/api/alerts/rules/:rule_id", get(handlers::get_alert_rule))
            .route("/api/alerts/rules/:rule_id", put(handlers::update_alert_rule))
            .route(
                "/api/alerts/rules/:rule_id",
                delete(handlers::delete_alert_rule),
            )
            .route("/api/alerts/process", post(handlers::process_alerts))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Starts the web server listening on the specified address.
    ///
    /// # Errors
    /// Returns an error if the server fails to bind to the address or serve
    /// requests.
    pub async fn serve(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Web API listening on {}", addr);

        axum::serve(listener, self.router()).await?;

        Ok(())
    }
}
