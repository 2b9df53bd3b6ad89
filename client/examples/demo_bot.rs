//! Round-playing bot against an in-process simulator.
//!
//! Starts the balance-authority simulator on an ephemeral port, wires up a
//! session controller with a background balance poller, and plays a few
//! rounds of each game.
//!
//! To run:
//! `cargo run --example demo_bot`

use parcade_client::{poller, HttpAuthority, SessionConfig, SessionController};
use parcade_engine::{blackjack, roulette, ThreadRandomness};
use parcade_simulator::{Api, Simulator, SimulatorConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const TOKEN: &str = "demo-bot";
const STAKE: u64 = 10;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    // 1. Local balance authority.
    let simulator = Arc::new(Simulator::new(SimulatorConfig::default()));
    let api = Api::new(Arc::clone(&simulator));
    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
    let base_url = format!("http://{}", listener.local_addr()?);
    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, api.router()).await {
            eprintln!("simulator server failed: {err}");
        }
    });

    // 2. Session wiring: controller plus background reconciliation.
    let authority = HttpAuthority::new(&base_url, Some(TOKEN.to_string()))?;
    let config = SessionConfig {
        // Bots do not fat-finger the spin button.
        cooldown: Duration::from_millis(100),
        ..SessionConfig::default()
    };
    let mut session = SessionController::new(authority, ThreadRandomness::new(), config);
    let _poller = poller::spawn(
        session.authority(),
        session.balance_handle(),
        poller::PollerConfig {
            interval: Duration::from_secs(2),
            jitter: Duration::from_millis(500),
        },
    );

    if !session.probe_health().await {
        return Err("authority unhealthy".into());
    }

    // 3. Slots.
    for _ in 0..3 {
        let (result, record) = session.play_slot(STAKE).await?;
        info!(
            reels = %format!("{} {} {}", result.reels[0], result.reels[1], result.reels[2]),
            won = record.outcome.won,
            payout = record.payout,
            "slot round"
        );
        tokio::time::sleep(config.cooldown).await;
    }

    // 4. Roulette, betting red.
    for _ in 0..3 {
        let (spin, record) = session.play_roulette(STAKE, roulette::Bet::Red).await?;
        info!(
            number = spin.number,
            color = ?spin.color,
            won = record.outcome.won,
            payout = record.payout,
            "roulette round"
        );
        tokio::time::sleep(config.cooldown).await;
    }

    // 5. One blackjack hand with a hit-below-17 strategy.
    let mut round = session.begin_blackjack(STAKE).await?;
    while !round.is_over() {
        if blackjack::hand_value(round.player()) < 17 {
            round.hit()?;
        } else {
            round.stand()?;
        }
    }
    info!(
        player = blackjack::hand_value(round.player()),
        dealer = blackjack::hand_value(round.dealer()),
        result = ?round.result(),
        "blackjack hand"
    );
    let record = session.settle_blackjack(round).await;
    info!(payout = record.payout, "blackjack settled");

    // 6. Let the poller reconcile, then compare views.
    tokio::time::sleep(Duration::from_secs(3)).await;
    let authoritative = simulator.balance_of(TOKEN);
    info!(
        displayed = session.displayed_balance().map(|b| b.parc).unwrap_or_default(),
        authoritative = authoritative.parc,
        rounds = session.history().count(),
        "session complete"
    );
    Ok(())
}
