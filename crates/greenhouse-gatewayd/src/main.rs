use anyhow::Context;
use clap::Parser;
use greenhouse_api::{create_router, AppState};
use greenhouse_config::ConfigLoader;
use greenhouse_gateway::{ActuatorRouter, Aggregator, GatewayState, StalenessMonitor};
use greenhouse_shutdown::{ShutdownController, TaskGroup};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = "gateway.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = ConfigLoader::new(&args.config)
        .load()
        .with_context(|| format!("load config from {}", args.config))?;
    info!(config = %args.config, "Starting greenhouse gateway");

    let gateway = Arc::new(GatewayState::new(config.telemetry.buffer_capacity));
    let actuators = Arc::new(ActuatorRouter::new(
        config.actuators.clone(),
        config.control.clone(),
    ));
    info!(actuators = ?actuators.actuator_names(), "Actuator registry loaded");

    let controller = ShutdownController::new();

    let signal_controller = controller.clone();
    tokio::spawn(async move {
        signal_controller.listen_for_system_signal().await;
    });

    let mut tasks = TaskGroup::new();
    tasks.spawn(
        "aggregator",
        Aggregator::new(gateway.clone(), config.broker.clone(), &config.telemetry)
            .run(controller.subscribe()),
    );
    tasks.spawn(
        "staleness-monitor",
        StalenessMonitor::new(gateway.clone(), &config.telemetry).run(controller.subscribe()),
    );

    let app = create_router(AppState {
        gateway,
        router: actuators,
    });
    let addr = format!("{}:{}", config.api.host, config.api.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("bind query interface to {addr}"))?;
    info!(addr = %addr, "Query interface listening");

    let mut api_shutdown = controller.subscribe();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            api_shutdown.recv().await;
        })
        .await
        .context("query interface server")?;

    tasks.join_all(Duration::from_secs(5)).await;
    info!("Greenhouse gateway stopped");

    Ok(())
}
