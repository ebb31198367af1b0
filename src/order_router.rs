use std::net::SocketAddr;

use tokio::{
    io::{AsyncBufReadExt, BufReader},
    net::{TcpListener, TcpStream},
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{errors::TransportError, market::MarketState, wire::Message};

/// Fan-in ingress for orders: many agents connect and push envelopes, one
/// router task consumes them.
///
/// Each client connection gets its own reader task forwarding raw lines into
/// a bounded channel; the router task alone decodes and submits, so the
/// matching engine stays single-consumer. Arrival order on the channel is
/// the book's time priority.
pub struct OrderRouter {
    listener: TcpListener,
    market: MarketState,
    token: CancellationToken,
}

impl OrderRouter {
    pub async fn bind(
        addr: SocketAddr,
        market: MarketState,
        token: CancellationToken,
    ) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %listener.local_addr()?, "order router bound");
        Ok(OrderRouter {
            listener,
            market,
            token,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.listener.local_addr()?)
    }

    /// Receive loop. Runs until cancelled, then hands the market back to the
    /// caller so settlement can be flushed after the fabric stops.
    pub async fn run(self) -> MarketState {
        let OrderRouter {
            listener,
            mut market,
            token,
        } = self;

        let (line_tx, mut line_rx) = mpsc::channel::<String>(1024);
        let accept_token = token.clone();
        let accept = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = accept_token.cancelled() => break,
                    accepted = listener.accept() => match accepted {
                        Ok((stream, peer)) => {
                            debug!(%peer, "order client connected");
                            tokio::spawn(read_lines(
                                stream,
                                peer,
                                line_tx.clone(),
                                accept_token.clone(),
                            ));
                        }
                        Err(e) => warn!(error = %e, "accept failed on order ingress"),
                    }
                }
            }
        });

        info!("order router running");
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                line = line_rx.recv() => match line {
                    Some(line) => dispatch(&mut market, &line),
                    None => break,
                }
            }
        }

        accept.abort();
        info!("order router stopped");
        market
    }
}

/// Decode one envelope and submit it. Anything malformed is logged with a
/// capped preview and dropped; the loop never stalls on bad input.
fn dispatch(market: &mut MarketState, line: &str) {
    match Message::from_line(line) {
        Ok(Message::Order(order)) => match market.submit(order) {
            Ok(()) => debug!(book = %market.engine(), "routed order"),
            Err(e) => warn!(error = %e, "order rejected"),
        },
        Ok(_) => debug!("ignoring non-order envelope on ingress"),
        Err(e) => {
            let preview: String = line.chars().take(256).collect();
            warn!(error = %e, preview = %preview, "dropping malformed envelope");
        }
    }
}

async fn read_lines(
    stream: TcpStream,
    peer: SocketAddr,
    line_tx: mpsc::Sender<String>,
    token: CancellationToken,
) {
    let mut lines = BufReader::new(stream).lines();
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            next = lines.next_line() => match next {
                Ok(Some(line)) => {
                    if line_tx.send(line).await.is_err() {
                        break;
                    }
                }
                Ok(None) => {
                    debug!(%peer, "order client disconnected");
                    break;
                }
                Err(e) => {
                    warn!(%peer, error = %e, "read failed on order ingress");
                    break;
                }
            }
        }
    }
}
