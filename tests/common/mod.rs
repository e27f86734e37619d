//! Scriptable in-memory stand-in for the bot service.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use lp_bot_console::dashboard::{
    ApiError, BotStatus, Command, CommandAck, DashboardApi, Endpoint, LogEntry, LogLevel, Position,
    PositionStatus, PriceSnapshot, ServiceHealth, SyncSettings, WalletInfo,
};

pub struct Fixture {
    pub status: Result<BotStatus, ApiError>,
    pub positions: Result<Vec<Position>, ApiError>,
    pub logs: Result<Vec<LogEntry>, ApiError>,
    pub wallet: Result<WalletInfo, ApiError>,
    pub price: Result<PriceSnapshot, ApiError>,
    /// Queued replies per command; an empty queue answers with a plain ack.
    pub replies: HashMap<Command, VecDeque<Result<CommandAck, ApiError>>>,
    /// Simulated latency of every read.
    pub latency: Duration,
    /// Simulated latency of every command.
    pub command_latency: Duration,
}

impl Default for Fixture {
    fn default() -> Self {
        Self {
            status: Ok(status(false, 1)),
            positions: Ok(vec![position("p1", dec!(138.5), dec!(145.9))]),
            logs: Ok(vec![log_entry("l1", LogLevel::Info, "Bot started")]),
            wallet: Ok(WalletInfo::configured("9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin", dec!(2.5), dec!(400))),
            price: Ok(price(dec!(142.37), t0())),
            replies: HashMap::new(),
            latency: Duration::ZERO,
            command_latency: Duration::ZERO,
        }
    }
}

#[derive(Clone, Default)]
pub struct MockApi {
    fixture: Arc<Mutex<Fixture>>,
    calls: Arc<Mutex<Vec<Endpoint>>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn edit(&self, f: impl FnOnce(&mut Fixture)) {
        f(&mut self.fixture.lock().unwrap());
    }

    pub fn queue_reply(&self, command: Command, reply: Result<CommandAck, ApiError>) {
        self.edit(|fx| fx.replies.entry(command).or_default().push_back(reply));
    }

    pub fn calls(&self, endpoint: Endpoint) -> usize {
        self.calls.lock().unwrap().iter().filter(|e| **e == endpoint).count()
    }

    /// Number of batch fetches started, counted by their status read.
    pub fn batches(&self) -> usize {
        self.calls(Endpoint::Status)
    }

    async fn answer<T: Clone>(
        &self,
        endpoint: Endpoint,
        pick: impl FnOnce(&Fixture) -> Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        self.calls.lock().unwrap().push(endpoint);
        let (latency, reply) = {
            let fx = self.fixture.lock().unwrap();
            (fx.latency, pick(&fx))
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        reply
    }
}

#[async_trait]
impl DashboardApi for MockApi {
    async fn health(&self) -> Result<ServiceHealth, ApiError> {
        self.answer(Endpoint::Health, |_| {
            Ok(ServiceHealth {
                message: "Solana Liquidity Management Bot API".into(),
                status: "running".into(),
            })
        })
        .await
    }

    async fn status(&self) -> Result<BotStatus, ApiError> {
        self.answer(Endpoint::Status, |fx| fx.status.clone()).await
    }

    async fn active_positions(&self) -> Result<Vec<Position>, ApiError> {
        self.answer(Endpoint::Positions, |fx| fx.positions.clone()).await
    }

    async fn recent_logs(&self, limit: usize) -> Result<Vec<LogEntry>, ApiError> {
        self.answer(Endpoint::Logs, |fx| {
            fx.logs.clone().map(|logs| logs.into_iter().take(limit).collect())
        })
        .await
    }

    async fn wallet(&self) -> Result<WalletInfo, ApiError> {
        self.answer(Endpoint::Wallet, |fx| fx.wallet.clone()).await
    }

    async fn price(&self) -> Result<PriceSnapshot, ApiError> {
        self.answer(Endpoint::Price, |fx| fx.price.clone()).await
    }

    async fn send_command(&self, command: Command) -> Result<CommandAck, ApiError> {
        self.calls.lock().unwrap().push(command.endpoint());
        let (latency, reply) = {
            let mut fx = self.fixture.lock().unwrap();
            let reply = fx.replies.get_mut(&command).and_then(VecDeque::pop_front);
            let reply = match reply {
                Some(reply) => reply,
                // Unscripted start/stop behave like the real service.
                None => {
                    if let (Ok(status), true) = (fx.status.as_mut(), command.reconciles()) {
                        status.is_running = command == Command::Start;
                    }
                    Ok(CommandAck::default())
                }
            };
            (fx.command_latency, reply)
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        reply
    }
}

/// Forwards to a [`MockApi`] and raises `dropped` once the controller lets
/// go of it.
pub struct Tracked {
    inner: MockApi,
    dropped: Arc<AtomicBool>,
}

impl Tracked {
    pub fn new(inner: MockApi, dropped: Arc<AtomicBool>) -> Self {
        Self { inner, dropped }
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.dropped.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl DashboardApi for Tracked {
    async fn health(&self) -> Result<ServiceHealth, ApiError> {
        self.inner.health().await
    }

    async fn status(&self) -> Result<BotStatus, ApiError> {
        self.inner.status().await
    }

    async fn active_positions(&self) -> Result<Vec<Position>, ApiError> {
        self.inner.active_positions().await
    }

    async fn recent_logs(&self, limit: usize) -> Result<Vec<LogEntry>, ApiError> {
        self.inner.recent_logs(limit).await
    }

    async fn wallet(&self) -> Result<WalletInfo, ApiError> {
        self.inner.wallet().await
    }

    async fn price(&self) -> Result<PriceSnapshot, ApiError> {
        self.inner.price().await
    }

    async fn send_command(&self, command: Command) -> Result<CommandAck, ApiError> {
        self.inner.send_command(command).await
    }
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

pub fn status(is_running: bool, active_positions: u32) -> BotStatus {
    BotStatus {
        is_running,
        active_positions,
        last_check: None,
        last_action: None,
    }
}

pub fn position(id: &str, lower: Decimal, upper: Decimal) -> Position {
    Position {
        id: id.to_string(),
        position_id: format!("pos_{id}"),
        lower_price: lower,
        upper_price: upper,
        sol_amount: dec!(0.8),
        usdc_amount: dec!(113.9),
        status: PositionStatus::Active,
        pool_id: None,
        created_at: None,
    }
}

pub fn log_entry(id: &str, level: LogLevel, message: &str) -> LogEntry {
    LogEntry {
        id: id.to_string(),
        level,
        message: message.to_string(),
        timestamp: t0(),
        details: None,
    }
}

pub fn price(sol_price: Decimal, timestamp: DateTime<Utc>) -> PriceSnapshot {
    PriceSnapshot { sol_price, timestamp }
}

pub fn rejected(endpoint: Endpoint, status: u16, detail: &str) -> ApiError {
    ApiError::Rejected {
        endpoint,
        status,
        detail: detail.to_string(),
    }
}

pub fn unreachable(endpoint: Endpoint) -> ApiError {
    ApiError::Transport {
        endpoint,
        message: "connection refused".to_string(),
    }
}

/// Long poll period so scheduled ticks stay out of the way unless a test
/// advances time on purpose.
pub fn quiet_settings() -> SyncSettings {
    SyncSettings {
        poll_interval: Duration::from_secs(3600),
        ..SyncSettings::default()
    }
}

/// Lets spawned tasks run until they block on a timer or finish.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
