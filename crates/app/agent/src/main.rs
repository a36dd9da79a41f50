//! Herald Agent - device-side push registration and event handling.

use clap::{Parser, Subcommand};
use color_eyre::eyre::{WrapErr as _, bail};
use herald_agent::{
    ClientConfig, DEFAULT_CAPACITY, DefaultHandler, PushChannel, PushEvent, RegistrationClient,
    event_bus, run_event_loop,
};
use tokio::io::AsyncBufReadExt as _;

#[derive(Parser)]
#[command(name = "herald-agent")]
#[command(about = "Register this device for push and handle push events")]
struct Cli {
    /// Herald server base URL
    #[arg(long, env = "HERALD_SERVER_URL")]
    server_url: String,

    /// User id sent as x-user-id
    #[arg(long, env = "HERALD_USER_ID")]
    user_id: String,

    /// Delivery channel: android, ios or web
    #[arg(long, default_value = "web")]
    channel: PushChannel,

    #[arg(long, default_value = herald_agent::client::DEFAULT_APP_VERSION)]
    app_version: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Register a device token
    Register { token: String },
    /// Unregister a device token
    Unregister { token: String },
    /// Read JSON push events from stdin, one per line
    Listen,
}

#[tokio::main]
async fn main() -> color_eyre::eyre::Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = ClientConfig::new(cli.server_url, cli.user_id, cli.channel);
    config.app_version = cli.app_version;
    let client = RegistrationClient::new(config);

    match cli.command {
        Command::Register { token } => {
            if !client.register_token(&token).await {
                bail!("registration failed");
            }
        }
        Command::Unregister { token } => {
            if !client.unregister_token(&token).await {
                bail!("unregistration failed");
            }
        }
        Command::Listen => listen(client).await?,
    }

    Ok(())
}

async fn listen(client: RegistrationClient) -> color_eyre::eyre::Result<()> {
    let (publisher, bus) = event_bus(DEFAULT_CAPACITY);
    let mut handler = DefaultHandler::new(client);
    let consumer = tokio::spawn(async move {
        let handled = run_event_loop(bus, &mut handler).await;
        (handled, handler)
    });

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.wrap_err("failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<PushEvent>(&line) {
            Ok(event) => publisher.publish(event).await?,
            Err(e) => tracing::warn!(error = %e, "skipping malformed event"),
        }
    }
    drop(publisher);

    let (handled, handler) = consumer.await.wrap_err("event loop panicked")?;
    tracing::info!(
        handled,
        registered = handler.is_registered(),
        notifications = handler.notifications().len(),
        navigation = handler.navigation_target().unwrap_or("-"),
        "event stream closed"
    );

    Ok(())
}
