//! Plain-text rendering of the dashboard state for the terminal.

use std::fmt::Write as _;

use colored::Colorize;
use rust_decimal::{Decimal, RoundingStrategy};

use super::types::{DashboardState, LogLevel, PositionStatus};

const TITLE: &str = "Solana Liquidity Management Bot";

/// USD with two to four fraction digits and thousands separators.
pub fn format_usd(value: Decimal) -> String {
    let mut rounded = value
        .round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero)
        .normalize();
    if rounded.scale() < 2 {
        rounded.rescale(2);
    }
    let text = rounded.abs().to_string();
    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), "00"));
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    format!("{}${}.{}", sign, group_thousands(whole), fraction)
}

/// Token amount with exactly four fraction digits.
pub fn format_amount(value: Decimal, symbol: &str) -> String {
    let mut rounded = value.round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(4);
    format!("{} {}", rounded, symbol)
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn status_label(status: PositionStatus) -> String {
    match status {
        PositionStatus::Active => status.as_str().green().to_string(),
        PositionStatus::Closed => status.as_str().dimmed().to_string(),
        PositionStatus::OutOfRange => status.as_str().red().to_string(),
    }
}

fn level_label(level: LogLevel) -> String {
    let tag = format!("[{}]", level.as_str());
    match level {
        LogLevel::Info => tag.blue().to_string(),
        LogLevel::Warning => tag.yellow().to_string(),
        LogLevel::Error => tag.red().to_string(),
    }
}

/// Renders the whole dashboard. Output depends on `state` only.
pub fn render(state: &DashboardState) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", TITLE.bold());

    if let Some(err) = &state.last_error {
        let _ = writeln!(out, "{} {}", "!".red().bold(), err.headline().red());
        if err.reconcile_failure().is_some() {
            let _ = writeln!(out, "  {}", "Refreshing afterwards failed as well".red());
        }
    }

    let run_state = match state.status() {
        Some(status) if status.is_running => "Running".green().to_string(),
        Some(_) => "Stopped".red().to_string(),
        None => "Unknown".dimmed().to_string(),
    };
    let activity = if state.busy { " (syncing...)" } else { "" };
    let _ = writeln!(out, "Bot status   {}{}", run_state, activity);
    if let Some(action) = state.status().and_then(|s| s.last_action.as_deref()) {
        let _ = writeln!(out, "Last action  {}", action);
    }

    match state.price() {
        Some(price) => {
            let _ = writeln!(
                out,
                "SOL price    {}  (updated {})",
                format_usd(price.sol_price),
                price.timestamp.format("%H:%M:%S UTC")
            );
        }
        None => {
            let _ = writeln!(out, "SOL price    Loading...");
        }
    }

    match state.wallet().and_then(|w| w.balances()) {
        Some(balances) => {
            let _ = writeln!(
                out,
                "Wallet       {} / {}",
                format_amount(balances.sol, "SOL"),
                format_amount(balances.usdc, "USDC")
            );
        }
        None if state.wallet().is_some() => {
            let _ = writeln!(out, "Wallet       {}", "Wallet not configured".red());
        }
        None => {
            let _ = writeln!(out, "Wallet       Loading...");
        }
    }

    let active = state.status().map(|s| s.active_positions).unwrap_or(0);
    let _ = writeln!(out, "Positions    {} active", active);
    if let Some(snapshot) = &state.snapshot {
        let _ = writeln!(out, "Last sync    {}", snapshot.fetched_at.format("%H:%M:%S UTC"));
    }

    let _ = writeln!(out, "\n{}", "Liquidity positions".bold());
    if state.positions().is_empty() {
        let _ = writeln!(out, "  No active positions");
    }
    for position in state.positions() {
        let _ = writeln!(
            out,
            "  {}  {} - {}  {} / {}  {}",
            position.position_id,
            format_usd(position.lower_price),
            format_usd(position.upper_price),
            format_amount(position.sol_amount, "SOL"),
            format_amount(position.usdc_amount, "USDC"),
            status_label(position.status)
        );
    }

    let _ = writeln!(out, "\n{}", "Activity logs".bold());
    if state.logs().is_empty() {
        let _ = writeln!(out, "  No logs available");
    }
    for entry in state.logs() {
        let _ = writeln!(
            out,
            "  {} {}  {}",
            level_label(entry.level),
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.message
        );
    }

    if state.wallet().map(|w| !w.is_configured()).unwrap_or(false) {
        let _ = writeln!(
            out,
            "\n{}\n  Configure the wallet private key, notification webhook and other settings on the bot service before starting it.",
            "Configuration required".yellow().bold()
        );
    }

    out
}
