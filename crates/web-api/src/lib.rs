//! REST API over sentiment bars, the probability model, and alert rules.

pub mod handlers;
pub mod server;
pub mod state;

pub use server::ApiServer;
pub use state::AppState;
