use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::api::Endpoint;
use super::error::ApiError;

/// Run state of the remote bot at the time of the last poll.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BotStatus {
    pub is_running: bool,
    pub active_positions: u32,
    /// When the bot last completed a cycle, if it has run at all.
    #[serde(default, with = "timestamp::option")]
    pub last_check: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_action: Option<String>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PositionStatus {
    Active,
    Closed,
    OutOfRange,
}

impl PositionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionStatus::Active => "active",
            PositionStatus::Closed => "closed",
            PositionStatus::OutOfRange => "out_of_range",
        }
    }
}

/// A concentrated-liquidity position as reported by the service.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Position {
    /// Opaque record identifier.
    pub id: String,
    /// Human-facing position label, e.g. `pos_1718000000`.
    pub position_id: String,
    pub lower_price: Decimal,
    pub upper_price: Decimal,
    pub sol_amount: Decimal,
    pub usdc_amount: Decimal,
    pub status: PositionStatus,
    #[serde(default)]
    pub pool_id: Option<String>,
    #[serde(default, with = "timestamp::option")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Position {
    fn check(&self) -> Result<(), String> {
        if self.upper_price < self.lower_price {
            return Err(format!(
                "position {} has upper_price {} below lower_price {}",
                self.position_id, self.upper_price, self.lower_price
            ));
        }
        if self.sol_amount.is_sign_negative() || self.usdc_amount.is_sign_negative() {
            return Err(format!("position {} has a negative amount", self.position_id));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    pub id: String,
    pub level: LogLevel,
    pub message: String,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}

/// Wallet configuration as seen by the service.
///
/// Balances are only meaningful when the service has a signing key loaded, so
/// they are reachable exclusively through [`WalletInfo::balances`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WalletInfo {
    configured: bool,
    #[serde(default)]
    public_key: Option<String>,
    #[serde(default)]
    sol_balance: Option<Decimal>,
    #[serde(default)]
    usdc_balance: Option<Decimal>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WalletBalances {
    pub sol: Decimal,
    pub usdc: Decimal,
}

impl WalletInfo {
    pub fn configured(public_key: impl Into<String>, sol: Decimal, usdc: Decimal) -> Self {
        Self {
            configured: true,
            public_key: Some(public_key.into()),
            sol_balance: Some(sol),
            usdc_balance: Some(usdc),
        }
    }

    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            public_key: None,
            sol_balance: None,
            usdc_balance: None,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    pub fn public_key(&self) -> Option<&str> {
        if self.configured {
            self.public_key.as_deref()
        } else {
            None
        }
    }

    /// Balances, or `None` when the wallet is unconfigured or the service
    /// omitted either figure.
    pub fn balances(&self) -> Option<WalletBalances> {
        if !self.configured {
            return None;
        }
        Some(WalletBalances {
            sol: self.sol_balance?,
            usdc: self.usdc_balance?,
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PriceSnapshot {
    pub sol_price: Decimal,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
}

/// One complete, internally consistent batch of the five read endpoints.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub status: BotStatus,
    pub positions: Vec<Position>,
    pub logs: Vec<LogEntry>,
    pub wallet: WalletInfo,
    pub price: PriceSnapshot,
    pub fetched_at: DateTime<Utc>,
}

impl Snapshot {
    /// Assembles a batch, rejecting it whole if any member breaks a data invariant.
    pub fn assemble(
        status: BotStatus,
        positions: Vec<Position>,
        logs: Vec<LogEntry>,
        wallet: WalletInfo,
        price: PriceSnapshot,
    ) -> Result<Self, ApiError> {
        for position in &positions {
            position.check().map_err(|message| ApiError::Invalid {
                endpoint: Endpoint::Positions,
                message,
            })?;
        }
        if price.sol_price <= Decimal::ZERO {
            return Err(ApiError::Invalid {
                endpoint: Endpoint::Price,
                message: format!("sol_price must be positive, got {}", price.sol_price),
            });
        }

        Ok(Self {
            status,
            positions,
            logs,
            wallet,
            price,
            fetched_at: Utc::now(),
        })
    }
}

/// Read-only view handed to presentation.
#[derive(Clone, Debug, Default)]
pub struct DashboardState {
    pub snapshot: Option<Arc<Snapshot>>,
    pub busy: bool,
    pub last_error: Option<super::error::SyncError>,
}

impl DashboardState {
    pub fn status(&self) -> Option<&BotStatus> {
        self.snapshot.as_deref().map(|s| &s.status)
    }

    pub fn positions(&self) -> &[Position] {
        self.snapshot.as_deref().map(|s| s.positions.as_slice()).unwrap_or(&[])
    }

    pub fn logs(&self) -> &[LogEntry] {
        self.snapshot.as_deref().map(|s| s.logs.as_slice()).unwrap_or(&[])
    }

    pub fn wallet(&self) -> Option<&WalletInfo> {
        self.snapshot.as_deref().map(|s| &s.wallet)
    }

    pub fn price(&self) -> Option<&PriceSnapshot> {
        self.snapshot.as_deref().map(|s| &s.price)
    }

    pub fn is_running(&self) -> bool {
        self.status().map(|s| s.is_running).unwrap_or(false)
    }

    /// Whether the start/stop control should be offered to the operator.
    pub fn can_toggle_bot(&self) -> bool {
        !self.busy && self.wallet().map(WalletInfo::is_configured).unwrap_or(false)
    }
}

/// Service instants arrive either as RFC 3339 or as naive ISO-8601 read back
/// from the service's document store; naive values are UTC.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("unrecognised timestamp {raw:?}")))
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(dt) => super::serialize(dt, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) => super::parse(&raw)
                    .map(Some)
                    .ok_or_else(|| serde::de::Error::custom(format!("unrecognised timestamp {raw:?}"))),
                None => Ok(None),
            }
        }
    }
}
