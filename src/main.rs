use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;

use lp_bot_console::common::{logger, DashboardConfig, HttpDashboardApi};
use lp_bot_console::dashboard::render::render;
use lp_bot_console::dashboard::{CommandAck, SyncController};

#[derive(Parser, Debug)]
#[command(name = "lpctl", about = "Control console for the liquidity management bot")]
struct Cli {
    /// Overrides BACKEND_URL.
    #[arg(long, global = true)]
    backend_url: Option<String>,

    /// Overrides POLL_INTERVAL_SECS.
    #[arg(long, global = true)]
    interval: Option<u64>,

    /// Log level used when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Action,
}

#[derive(Subcommand, Debug)]
enum Action {
    /// Keep the dashboard on screen, redrawing after every sync, until Ctrl-C.
    Watch,
    /// Fetch once and print the dashboard.
    Status,
    /// Start the bot, then print the reconciled dashboard.
    Start,
    /// Stop the bot, then print the reconciled dashboard.
    Stop,
    /// Ask the bot service to send a test notification.
    TestNotification,
    /// Check that the bot service answers.
    Health,
}

fn load_config(cli: &Cli) -> Result<DashboardConfig> {
    let mut overrides = Vec::new();
    if let Some(url) = &cli.backend_url {
        overrides.push(("BACKEND_URL".to_string(), url.clone()));
    }
    if let Some(secs) = cli.interval {
        overrides.push(("POLL_INTERVAL_SECS".to_string(), secs.to_string()));
    }
    DashboardConfig::from_env(overrides)
}

fn print_ack(label: &str, ack: &CommandAck) {
    let message = ack.message.as_deref().unwrap_or("ok");
    println!("{} {}", label.green().bold(), message);
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init(&cli.log_level);

    let cfg = load_config(&cli)?;
    let api = HttpDashboardApi::new(&cfg).context("building HTTP client")?;
    log::info!("using bot service at {}", api.base_url());

    let controller = SyncController::start(api, cfg.sync_settings());

    let outcome: Result<()> = match cli.command {
        Action::Watch => watch(&controller).await,
        Action::Status => controller.refresh().await.map(|_| ()).map_err(Into::into),
        Action::Start => controller
            .start_bot()
            .await
            .map(|ack| print_ack("start:", &ack))
            .map_err(Into::into),
        Action::Stop => controller
            .stop_bot()
            .await
            .map(|ack| print_ack("stop:", &ack))
            .map_err(Into::into),
        Action::TestNotification => controller
            .test_notification()
            .await
            .map(|ack| print_ack("Test notification sent!", &ack))
            .map_err(Into::into),
        Action::Health => controller
            .health()
            .await
            .map(|health| println!("{} ({})", health.message, health.status))
            .map_err(Into::into),
    };

    if matches!(cli.command, Action::Status | Action::Start | Action::Stop) {
        print!("{}", render(&controller.state()));
    }
    controller.dispose();
    outcome
}

async fn watch<A: lp_bot_console::dashboard::DashboardApi>(controller: &SyncController<A>) -> Result<()> {
    let mut changes = controller.subscribe();
    loop {
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                res.context("waiting for Ctrl-C")?;
                break;
            }
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = controller.state();
                if !state.busy {
                    // Clear the screen and home the cursor before redrawing.
                    print!("\x1B[2J\x1B[H{}", render(&state));
                }
            }
        }
    }
    Ok(())
}
