pub mod alert_history_repo;
pub mod article_repo;
pub mod bar_repo;
pub mod price_repo;

pub use alert_history_repo::{AlertHistoryRecord, AlertHistoryRepository};
pub use article_repo::ArticleRepository;
pub use bar_repo::BarRepository;
pub use price_repo::PriceRepository;
