use clap::Parser;
use mc_monitor::cards::DiscordCardSender;
use mc_monitor::config::MonitorConfig;
use mc_monitor::monitor::{CommandHandler, LifecycleEngine, MonitorRegistry, MonitorStore};
use mc_monitor::probe::ProbeChain;
use mc_monitor::version::VERSION;
use mc_monitor::web::{create_axum_router, AppState};
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version = VERSION, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,
}

fn init_logging(log_dir: &str) {
    // Log to a file: JSON format, daily rotation
    let file_appender = rolling::daily(log_dir, "mc-monitor.log");
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .json();

    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    // Default to `info` if RUST_LOG is not set.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C.");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM.");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down."),
        _ = terminate => info!("Received SIGTERM, shutting down."),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let args = Args::parse();
    let config = MonitorConfig::load(args.config.as_deref())?;

    init_logging(&config.log_dir);
    rust_i18n::set_locale(&config.locale);
    info!("Starting mc-monitor, version: {}", VERSION);

    let probe = Arc::new(ProbeChain::from_config(&config)?);
    let cards = Arc::new(DiscordCardSender::new(
        config.discord_api_url.as_str(),
        config.discord_token.as_str(),
        Duration::from_secs(config.discord_timeout_seconds.max(1)),
    )?);
    let store = Arc::new(MonitorStore::new(&config.monitors_file));
    let engine = LifecycleEngine::new(
        Arc::new(MonitorRegistry::new()),
        store,
        probe,
        cards,
        config.update_interval(),
    );

    // Restore monitors in the background so the control surface comes up at once.
    let rehydrating = engine.clone();
    tokio::spawn(async move {
        rehydrating.rehydrate().await;
    });

    let app_state = Arc::new(AppState {
        commands: CommandHandler::new(engine.clone()),
        api_token: config.api_token.clone(),
    });
    let router = create_axum_router(app_state);

    let listener = tokio::net::TcpListener::bind(&config.listen_address).await?;
    info!(address = %config.listen_address, "Control surface listening.");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    engine.shutdown();
    info!("mc-monitor stopped.");
    Ok(())
}
