pub mod api_client;
pub mod config;
pub mod logger;

pub use api_client::HttpDashboardApi;
pub use config::DashboardConfig;
