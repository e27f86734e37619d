use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use super::types::{BotStatus, LogEntry, Position, PriceSnapshot, WalletInfo};

/// REST resources exposed by the bot service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Health,
    Status,
    Positions,
    Logs,
    Wallet,
    Price,
    Start,
    Stop,
    TestNotification,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Health => "/api/",
            Endpoint::Status => "/api/status",
            Endpoint::Positions => "/api/positions",
            Endpoint::Logs => "/api/logs",
            Endpoint::Wallet => "/api/wallet",
            Endpoint::Price => "/api/price",
            Endpoint::Start => "/api/start",
            Endpoint::Stop => "/api/stop",
            Endpoint::TestNotification => "/api/test-notification",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Mutating calls the console can issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Command {
    Start,
    Stop,
    TestNotification,
}

impl Command {
    pub fn endpoint(&self) -> Endpoint {
        match self {
            Command::Start => Endpoint::Start,
            Command::Stop => Endpoint::Stop,
            Command::TestNotification => Endpoint::TestNotification,
        }
    }

    /// Start/stop change the bot's run state, so the console must re-read
    /// everything afterwards. The notification hook touches nothing we display.
    pub fn reconciles(&self) -> bool {
        matches!(self, Command::Start | Command::Stop)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Start => f.write_str("start"),
            Command::Stop => f.write_str("stop"),
            Command::TestNotification => f.write_str("test-notification"),
        }
    }
}

/// Acknowledgment body returned by command endpoints, e.g.
/// `{"message": "Bot is already running"}`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandAck {
    #[serde(default)]
    pub message: Option<String>,
}

impl CommandAck {
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceHealth {
    pub message: String,
    pub status: String,
}

/// Remote surface the sync controller depends on.
///
/// `HttpDashboardApi` is the production implementation; tests plug in an
/// in-memory double.
#[async_trait]
pub trait DashboardApi: Send + Sync + 'static {
    async fn health(&self) -> Result<ServiceHealth, ApiError>;
    async fn status(&self) -> Result<BotStatus, ApiError>;
    async fn active_positions(&self) -> Result<Vec<Position>, ApiError>;
    async fn recent_logs(&self, limit: usize) -> Result<Vec<LogEntry>, ApiError>;
    async fn wallet(&self) -> Result<WalletInfo, ApiError>;
    async fn price(&self) -> Result<PriceSnapshot, ApiError>;
    async fn send_command(&self, command: Command) -> Result<CommandAck, ApiError>;
}
