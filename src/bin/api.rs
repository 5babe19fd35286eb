use academy_payments::app::cli::Cli;
use academy_payments::app::config::Config;
use academy_payments::app::router::build_router;
use academy_payments::app::state::AppState;
use academy_payments::services::{
    InMemoryClassCatalog, InMemoryPaymentLedger, MpesaClient, PaymentService, StaticSessionStore,
};
use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(port) = cli.port {
        config.server_port = port;
    }

    info!(
        port = config.server_port,
        environment = ?config.mpesa.environment,
        classes = config.classes.len(),
        "Starting academy payments server"
    );
    if config.mpesa.callback_url.is_none() {
        warn!("MPESA_CALLBACK_URL is not set; STK pushes will fail until it is configured");
    }

    let gateway = MpesaClient::new(config.mpesa.clone()).context("building M-Pesa client")?;
    let payments = Arc::new(PaymentService::new(
        Arc::new(InMemoryPaymentLedger::new()),
        Arc::new(InMemoryClassCatalog::with_classes(config.classes.clone())),
        Arc::new(gateway),
    ));
    let sessions = Arc::new(StaticSessionStore::from_seeds(&config.sessions));

    let app = build_router(AppState::new(payments, sessions));

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
