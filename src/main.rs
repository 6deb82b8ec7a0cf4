use anyhow::{Context, Result};
use clap::Parser;
use relaybot::channels::ConsoleChannel;
use relaybot::generate::{Generator, HttpGenerator};
use relaybot::{Config, ConversationGateway, MemorySessionStore, RateLimiter, SessionStore, Sweeper};
use std::sync::Arc;
use tokio::time::Duration;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "relaybot", about = "Group-chat relay bot with a console channel")]
struct Cli {
    /// Identity to chat as on the console channel.
    #[arg(long, env = "RELAY_USER", default_value = "console")]
    user: String,

    /// Enable debug-level logging.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    let config = Config::from_env()?;

    let endpoint = config
        .generation
        .endpoint
        .clone()
        .context("GENERATION_ENDPOINT must be set")?;
    let generator: Arc<dyn Generator> = Arc::new(HttpGenerator::new(
        endpoint,
        config.generation.api_key.as_deref(),
    ));

    let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
    let limiter = Arc::new(RateLimiter::new(config.limits.daily_limit));
    let gateway = ConversationGateway::new(
        Arc::clone(&store),
        Arc::clone(&limiter),
        generator,
        &config,
    );

    let sweeper = config.session.ttl().map(|ttl| {
        let interval = Duration::from_secs(u64::from(config.sweeper.interval_hours) * 3600);
        tracing::info!(
            ttl_days = config.session.ttl_days,
            interval_hours = config.sweeper.interval_hours,
            "eviction sweeper scheduled"
        );
        Sweeper::spawn(Arc::clone(&store), ttl, interval)
    });
    if sweeper.is_none() {
        tracing::info!("CHAT_TTL is 0, eviction disabled");
    }

    let console = ConsoleChannel::new(cli.user);
    tokio::select! {
        result = console.run(&gateway, &store, &limiter) => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
        }
    }

    if let Some(handle) = sweeper {
        handle.stop().await;
    }

    Ok(())
}
