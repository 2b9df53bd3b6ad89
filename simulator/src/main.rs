use anyhow::Result;
use clap::Parser;
use parcade_simulator::{Api, Simulator, SimulatorConfig};
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Local balance authority speaking the portal backend's casino API.
#[derive(Debug, Parser)]
#[command(name = "parcade-simulator")]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:8080")]
    listen: SocketAddr,

    /// PARC granted to each new account.
    #[arg(long, default_value_t = 1_000)]
    starting_parc: u64,

    /// JPY granted to each new account.
    #[arg(long, default_value_t = 0)]
    starting_jpy: u64,

    /// Probability (0-1) that a bet or result call fails with a 500.
    #[arg(long, default_value_t = 0.0)]
    fail_rate: f64,

    /// Added latency per request, in milliseconds.
    #[arg(long, default_value_t = 0)]
    latency_ms: u64,

    /// Per-account balance fetches allowed per second (unlimited if unset).
    #[arg(long)]
    balance_rate_limit: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    let config = SimulatorConfig {
        starting_parc: args.starting_parc,
        starting_jpy: args.starting_jpy,
        fail_rate: args.fail_rate.clamp(0.0, 1.0),
        latency: Duration::from_millis(args.latency_ms),
        balance_rate_limit: args.balance_rate_limit.and_then(NonZeroU32::new),
    };

    let simulator = Arc::new(Simulator::new(config));
    let api = Api::new(simulator);

    let listener = tokio::net::TcpListener::bind(args.listen).await?;
    info!(addr = %listener.local_addr()?, "balance authority simulator listening");
    axum::serve(listener, api.router()).await?;
    Ok(())
}
