use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    agent::{AgentBehavior, TradingAgent},
    config::VenueConfig,
    data_router::DataRouter,
    market::MarketState,
    order_router::OrderRouter,
    seed,
    utils::mini_uuid,
};

/// How the venue came down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    Clean,
    /// A second signal arrived during shutdown; workers were abandoned and
    /// transports may be half-torn.
    Forced,
}

/// Owns the lifecycle of the whole venue: market, routers, agents.
///
/// Startup order is routers first (so agents have something to connect to),
/// then agents. Shutdown is the reverse with a settlement flush at the end:
/// stop agents, join them, stop routers, join them, flush. Cancelling an
/// already-cancelled token is a no-op, so repeated stop requests are
/// harmless.
pub struct Orchestrator {
    config: VenueConfig,
}

impl Orchestrator {
    pub fn new(config: VenueConfig) -> Self {
        Orchestrator { config }
    }

    /// Run until `stop` fires (or the configured deadline passes), then shut
    /// down in order. `force` escalates an ongoing shutdown to an immediate
    /// abandon-everything exit.
    pub async fn run(
        self,
        stop: CancellationToken,
        force: CancellationToken,
    ) -> anyhow::Result<Shutdown> {
        let config = self.config;

        let (mut market, snapshot_rx) = MarketState::new(config.snapshot_capacity);
        if config.seed_book {
            seed::populate_for_testing(&mut market)?;
            info!("seeded deterministic test book");
        }

        let routers_token = CancellationToken::new();
        let agents_token = CancellationToken::new();

        let order_router =
            OrderRouter::bind(config.order_ingress, market, routers_token.clone()).await?;
        let ingress_addr = order_router.local_addr()?;
        let data_router =
            DataRouter::bind(config.data_egress, snapshot_rx, routers_token.clone()).await?;
        let egress_addr = data_router.local_addr()?;

        let order_handle = tokio::spawn(order_router.run());
        let data_handle = tokio::spawn(data_router.run());

        let behavior = AgentBehavior {
            center_price: config.center_price,
            deviance: config.deviance,
            wake_min: config.wake_min,
            wake_max: config.wake_max,
        };
        let mut agents = JoinSet::new();
        for _ in 0..config.agents {
            let agent = TradingAgent::connect(
                mini_uuid(),
                ingress_addr,
                egress_addr,
                agents_token.clone(),
            )
            .await?;
            agents.spawn(agent.run(behavior.clone()));
        }
        info!(
            agents = config.agents,
            ingress = %ingress_addr,
            egress = %egress_addr,
            "venue running"
        );

        match config.run_secs {
            Some(secs) => {
                tokio::select! {
                    _ = stop.cancelled() => {}
                    _ = tokio::time::sleep(Duration::from_secs(secs)) => {
                        info!(secs, "run deadline reached");
                    }
                }
            }
            None => stop.cancelled().await,
        }

        info!("shutdown: stopping agents");
        agents_token.cancel();

        let shutdown = async {
            while let Some(joined) = agents.join_next().await {
                if let Err(e) = joined {
                    warn!(error = %e, "agent task failed");
                }
            }
            info!("shutdown: agents joined; stopping routers");
            routers_token.cancel();
            let market = order_handle.await?;
            data_handle.await?;
            anyhow::Ok(market)
        };
        tokio::pin!(shutdown);

        let joined = tokio::select! {
            joined = &mut shutdown => joined,
            _ = force.cancelled() => {
                warn!("forced shutdown: abandoning workers, transports may be half-torn");
                return Ok(Shutdown::Forced);
            }
        };

        let mut market = joined?;
        let settled = market.flush_settlement();
        info!(settled = settled.len(), "settlement complete");
        Ok(Shutdown::Clean)
    }
}
