use std::process::ExitCode;

use agent_market::config::VenueConfig;
use agent_market::orchestrator::{Orchestrator, Shutdown};
use agent_market::utils::shutdown_signal;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "agent-market")]
#[command(
    version = "0.1",
    about = "A simulated trading venue: matching engine plus noise agents"
)]
struct Cli {
    /// Number of noise trading agents
    #[arg(long, default_value_t = 3)]
    agents: usize,

    /// Port the order ingress binds on
    #[arg(long, default_value_t = 5557)]
    order_port: u16,

    /// Port the snapshot feed binds on
    #[arg(long, default_value_t = 5558)]
    data_port: u16,

    /// Stop automatically after this many seconds
    #[arg(long)]
    run_secs: Option<u64>,

    /// Seed the deterministic test book before the fabric starts
    #[arg(long)]
    seed: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let config = VenueConfig {
        order_ingress: ([127, 0, 0, 1], cli.order_port).into(),
        data_egress: ([127, 0, 0, 1], cli.data_port).into(),
        agents: cli.agents,
        run_secs: cli.run_secs,
        seed_book: cli.seed,
        ..VenueConfig::default()
    };

    let signal = shutdown_signal();
    match Orchestrator::new(config).run(signal.stop, signal.force).await? {
        Shutdown::Clean => Ok(ExitCode::SUCCESS),
        Shutdown::Forced => {
            tracing::warn!("exited after forced shutdown; cleanup may be partial");
            Ok(ExitCode::FAILURE)
        }
    }
}
