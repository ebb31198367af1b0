use std::net::SocketAddr;
use std::time::Duration;

use rand::Rng;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::TcpStream,
    sync::watch,
    task::JoinHandle,
    time::sleep,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    errors::TransportError,
    market::Snapshot,
    orders::{Order, OrderType, Side},
    price::Price,
    wire::Message,
};

/// Quoting behavior shared by all noise agents.
#[derive(Debug, Clone)]
pub struct AgentBehavior {
    pub center_price: Price,
    /// Half-width of the price band as a fraction of the center.
    pub deviance: f64,
    pub wake_min: Duration,
    pub wake_max: Duration,
}

/// One autonomous trading agent.
///
/// Holds a push connection to the order ingress and a subscription to the
/// snapshot feed. A background reader keeps the latest snapshot in a watch
/// channel; the noise strategy only logs it, but smarter strategies would
/// quote off it. The trading loop wakes at a random jittered interval and
/// sends one random limit order; cancellation wins at every suspension
/// point.
pub struct TradingAgent {
    account_id: String,
    orders: TcpStream,
    latest_snapshot: watch::Receiver<Option<Snapshot>>,
    reader: JoinHandle<()>,
    token: CancellationToken,
}

impl TradingAgent {
    /// Connect both endpoints and start the market data reader.
    pub async fn connect(
        account_id: String,
        order_ingress: SocketAddr,
        data_egress: SocketAddr,
        token: CancellationToken,
    ) -> Result<Self, TransportError> {
        let orders = TcpStream::connect(order_ingress).await?;
        let market_data = TcpStream::connect(data_egress).await?;

        let (snapshot_tx, latest_snapshot) = watch::channel(None);
        let reader = tokio::spawn(watch_market_data(
            market_data,
            snapshot_tx,
            token.clone(),
        ));

        Ok(TradingAgent {
            account_id,
            orders,
            latest_snapshot,
            reader,
            token,
        })
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub async fn run(mut self, behavior: AgentBehavior) {
        info!(agent = %self.account_id, "agent started");
        loop {
            let wake = jittered_wake(&behavior);
            tokio::select! {
                _ = self.token.cancelled() => break,
                _ = sleep(wake) => {}
            }

            let latest = self.latest_snapshot.borrow().clone();
            if let Some(snapshot) = latest {
                debug!(
                    agent = %self.account_id,
                    reference_price = snapshot.reference_price,
                    "latest market data"
                );
            }

            let order = random_order(&self.account_id, &behavior);
            debug!(agent = %self.account_id, order = %order, "sending order");
            match self.send_order(&order).await {
                Ok(()) => {}
                Err(TransportError::Shutdown) => break,
                Err(e) => {
                    warn!(agent = %self.account_id, error = %e, "order send failed; order dropped");
                }
            }
        }
        self.reader.abort();
        info!(agent = %self.account_id, "agent stopped");
    }

    /// Push one order envelope, retrying the write once before giving the
    /// order up.
    pub async fn send_order(&mut self, order: &Order) -> Result<(), TransportError> {
        if self.token.is_cancelled() {
            return Err(TransportError::Shutdown);
        }
        let line = Message::Order(order.clone()).to_line()?;
        if let Err(first) = write_line(&mut self.orders, &line).await {
            debug!(agent = %self.account_id, error = %first, "retrying order send");
            write_line(&mut self.orders, &line).await?;
        }
        Ok(())
    }
}

async fn write_line(stream: &mut TcpStream, line: &str) -> std::io::Result<()> {
    stream.write_all(line.as_bytes()).await?;
    stream.write_all(b"\n").await
}

/// Reader side of the snapshot subscription: parse frames, keep the newest.
async fn watch_market_data(
    stream: TcpStream,
    snapshot_tx: watch::Sender<Option<Snapshot>>,
    token: CancellationToken,
) {
    let mut lines = BufReader::new(stream).lines();
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            next = lines.next_line() => match next {
                Ok(Some(line)) => match Message::from_line(&line) {
                    Ok(Message::DataSnapshot(snapshot)) => {
                        let _ = snapshot_tx.send(Some(snapshot));
                    }
                    Ok(_) => {}
                    Err(e) => debug!(error = %e, "ignoring unreadable market data frame"),
                },
                Ok(None) | Err(_) => break,
            }
        }
    }
}

fn jittered_wake(behavior: &AgentBehavior) -> Duration {
    let min = behavior.wake_min.as_millis() as u64;
    let max = behavior.wake_max.as_millis() as u64;
    Duration::from_millis(rand::rng().random_range(min..=max))
}

/// Random limit order: either side, quantity a bounded multiple of 10,
/// price uniform in `center × (1 ± deviance)`, timestamp left to the engine.
fn random_order(account_id: &str, behavior: &AgentBehavior) -> Order {
    let mut rng = rand::rng();
    let side = if rng.random_bool(0.5) {
        Side::Buy
    } else {
        Side::Sell
    };
    let quantity = rng.random_range(2..=50) * 10;
    let center = behavior.center_price.as_major();
    let band = center * behavior.deviance;
    let price =
        Price::from_major(center + rng.random_range(-band..=band)).unwrap_or(behavior.center_price);
    Order {
        account_id: account_id.to_string(),
        side,
        quantity,
        order_type: OrderType::Limit,
        price: Some(price),
        timestamp: None,
    }
}
