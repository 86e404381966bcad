mod config;
mod database;
mod error;
mod monitoring;
mod pool;
mod validation;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::info;

use crate::config::Config;
use crate::database::{LibsqlStore, initialize_database};
use crate::monitoring::{
    MonitorEngine, MonitoringExecutor, MonitoringScheduler, Notifier, ReqwestWebhookClient,
    Target, TargetStore,
};

#[derive(Parser, Debug)]
#[command(name = "uppe-monitor", version)]
#[command(about = "Checks IP and URL targets on a fixed interval and reports status changes")]
struct Args {
    /// Path to the config file (defaults to ~/.config/uppe/monitor.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Default log level when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the scheduler until interrupted
    Run,
    /// Run a single tick and exit
    Tick,
    /// Add a target
    Add {
        /// IPv4 address or http(s) URL
        address: String,
        /// Webhook notified on status changes
        #[arg(long)]
        webhook: Option<String>,
    },
    /// Remove a target (its history is kept)
    Remove { address: String },
    /// Set the webhook of a target, or clear it when no URL is given
    Webhook { address: String, url: Option<String> },
    /// List targets and their current status
    List,
    /// Show the most recent status changes of a target
    History {
        address: String,
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    logger::init_with_level(&args.log_level);

    let config = Config::from_config(args.config.as_ref()).context("Failed to load configuration")?;

    if let Command::Config = args.command {
        print!("{config}");
        return Ok(());
    }

    let store = Arc::new(open_store(&config).await?);

    match args.command {
        Command::Run => run(&config, store).await,
        Command::Tick => tick(&config, store).await,
        Command::Add { address, webhook } => add(&store, address, webhook).await,
        Command::Remove { address } => {
            if !store.remove_target(&address).await? {
                bail!("No target named {address}");
            }
            println!("Removed {address}");
            Ok(())
        }
        Command::Webhook { address, url } => {
            if let Some(url) = &url {
                validation::validate_webhook_url(url).to_result()?;
            }
            store.set_webhook(&address, url.as_deref()).await?;
            match url {
                Some(url) => println!("{address} now notifies {url}"),
                None => println!("{address} no longer has a webhook"),
            }
            Ok(())
        }
        Command::List => list(&store).await,
        Command::History { address, limit } => history(&store, &address, limit).await,
        Command::Config => Ok(()),
    }
}

async fn open_store(config: &Config) -> Result<LibsqlStore> {
    let pool = pool::open_pool(&config.database.path)
        .await
        .with_context(|| format!("Failed to open database at {}", config.database.path))?;

    let conn = pool.get().await.context("Failed to get a database connection")?;
    initialize_database(&conn).await?;
    drop(conn);

    Ok(LibsqlStore::new_from_pool(pool))
}

fn build_engine(config: &Config, store: Arc<LibsqlStore>) -> Result<MonitorEngine> {
    let monitoring = &config.monitoring;
    let executor =
        MonitoringExecutor::new(monitoring.probe_timeout(), monitoring.timeout_status)
            .context("Failed to build HTTP checker")?;
    let notifier = Notifier::new(
        Arc::new(ReqwestWebhookClient::new().context("Failed to build webhook client")?),
        monitoring.webhook_timeout(),
    );

    Ok(MonitorEngine::new(store, executor, notifier)
        .with_probe_limit(monitoring.max_concurrent_probes))
}

async fn run(config: &Config, store: Arc<LibsqlStore>) -> Result<()> {
    let engine = Arc::new(build_engine(config, store)?);
    info!("{}", config);

    let handle = MonitoringScheduler::new(engine, config.monitoring.tick_interval()).start();

    tokio::signal::ctrl_c().await.context("Failed to listen for shutdown signal")?;
    info!("Shutdown requested, waiting for the current tick");
    handle.stop().await;
    Ok(())
}

async fn tick(config: &Config, store: Arc<LibsqlStore>) -> Result<()> {
    let engine = build_engine(config, store)?;
    let summary = engine.run_tick().await?;
    let delivered = engine.drain_notifications().await;

    println!(
        "targets: {}  changed: {}  unchanged: {}  failed: {}  webhooks: {}/{}",
        summary.targets,
        summary.transitions,
        summary.unchanged,
        summary.failures,
        delivered,
        summary.notifications
    );
    Ok(())
}

async fn add(store: &LibsqlStore, address: String, webhook: Option<String>) -> Result<()> {
    validation::validate_target_address(&address).to_result()?;

    let mut target = Target::new(address);
    if let Some(url) = webhook {
        validation::validate_webhook_url(&url).to_result()?;
        target = target.with_webhook(url);
    }

    store.add_target(&target).await?;
    println!("Added {}", target.address);
    Ok(())
}

async fn list(store: &LibsqlStore) -> Result<()> {
    let targets = store.list_all().await?;
    if targets.is_empty() {
        println!("No targets");
        return Ok(());
    }

    for target in targets {
        let changed = target
            .last_checked_at
            .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "never".to_string());
        let webhook = target.webhook_url.as_deref().unwrap_or("-");
        println!("{:<40} {:<8} {:<24} {}", target.address, target.last_status, changed, webhook);
    }
    Ok(())
}

async fn history(store: &LibsqlStore, address: &str, limit: usize) -> Result<()> {
    let events = store.list_events(address, limit).await?;
    if events.is_empty() {
        println!("No status changes recorded for {address}");
        return Ok(());
    }

    for event in events {
        println!("{}  {}", event.timestamp.format("%Y-%m-%d %H:%M:%S%.3f UTC"), event.status);
    }
    Ok(())
}
