use std::net::SocketAddr;

use tokio::{
    io::AsyncWriteExt,
    net::{TcpListener, TcpStream},
    sync::broadcast,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{errors::TransportError, market::Snapshot, wire::Message};

/// Fan-out egress for market data: one router drains the snapshot queue and
/// every connected subscriber receives all subsequent frames.
///
/// Late subscribers only see snapshots published after they connect. A
/// subscriber that cannot keep up loses oldest frames first and a write that
/// fails twice drops the subscriber, never the router.
pub struct DataRouter {
    listener: TcpListener,
    snapshots: broadcast::Receiver<Snapshot>,
    token: CancellationToken,
}

impl DataRouter {
    pub async fn bind(
        addr: SocketAddr,
        snapshots: broadcast::Receiver<Snapshot>,
        token: CancellationToken,
    ) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %listener.local_addr()?, "data router bound");
        Ok(DataRouter {
            listener,
            snapshots,
            token,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.listener.local_addr()?)
    }

    /// Publish loop. On cancellation the pending snapshots are drained to
    /// the subscribers before the router exits.
    pub async fn run(self) {
        let DataRouter {
            listener,
            mut snapshots,
            token,
        } = self;

        // Encoded frames fan out through their own channel; subscriber
        // tasks live exactly as long as a sender exists.
        let (frame_tx, _) = broadcast::channel::<String>(256);

        let accept_token = token.clone();
        let subscriber_tx = frame_tx.clone();
        let accept = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = accept_token.cancelled() => break,
                    accepted = listener.accept() => match accepted {
                        Ok((stream, peer)) => {
                            debug!(%peer, "snapshot subscriber connected");
                            tokio::spawn(forward_frames(stream, peer, subscriber_tx.subscribe()));
                        }
                        Err(e) => warn!(error = %e, "accept failed on snapshot egress"),
                    }
                }
            }
        });

        info!("data router running");
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                snapshot = snapshots.recv() => match snapshot {
                    Ok(snapshot) => publish(&frame_tx, snapshot),
                    Err(broadcast::error::RecvError::Lagged(dropped)) => {
                        warn!(dropped, "snapshot queue overflowed; oldest dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }

        // Drain whatever is still queued so subscribers see a complete feed.
        loop {
            match snapshots.try_recv() {
                Ok(snapshot) => publish(&frame_tx, snapshot),
                Err(broadcast::error::TryRecvError::Lagged(dropped)) => {
                    warn!(dropped, "snapshot queue overflowed during drain");
                }
                Err(_) => break,
            }
        }

        accept.abort();
        info!("data router stopped");
    }
}

fn publish(frame_tx: &broadcast::Sender<String>, snapshot: Snapshot) {
    match Message::DataSnapshot(snapshot).to_line() {
        // No subscribers is not an error; the frame just goes unobserved.
        Ok(line) => {
            let _ = frame_tx.send(line);
        }
        Err(e) => warn!(error = %e, "failed to encode snapshot"),
    }
}

/// Per-subscriber writer. Exits when the frame channel closes (router gone)
/// or the peer stops accepting writes.
async fn forward_frames(
    mut stream: TcpStream,
    peer: SocketAddr,
    mut frames: broadcast::Receiver<String>,
) {
    loop {
        match frames.recv().await {
            Ok(line) => {
                if write_line(&mut stream, &line).await.is_err() {
                    // One retry, then give the subscriber up
                    if let Err(e) = write_line(&mut stream, &line).await {
                        warn!(%peer, error = %e, "subscriber write failed twice; dropping");
                        break;
                    }
                }
            }
            Err(broadcast::error::RecvError::Lagged(dropped)) => {
                warn!(%peer, dropped, "slow subscriber missed frames");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    debug!(%peer, "snapshot subscriber disconnected");
}

async fn write_line(stream: &mut TcpStream, line: &str) -> std::io::Result<()> {
    stream.write_all(line.as_bytes()).await?;
    stream.write_all(b"\n").await
}
