//! Shutdown signal plumbing and small shared helpers.

use tokio::signal;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// First Ctrl-C cancels `stop` (clean shutdown), a second cancels `force`
/// (abandon everything, exit non-zero).
pub struct ShutdownSignal {
    pub stop: CancellationToken,
    pub force: CancellationToken,
}

pub fn shutdown_signal() -> ShutdownSignal {
    let stop = CancellationToken::new();
    let force = CancellationToken::new();
    let (stop_tx, force_tx) = (stop.clone(), force.clone());
    tokio::spawn(async move {
        signal::ctrl_c()
            .await
            .expect("failed to install ctrl+C handler");
        stop_tx.cancel();
        signal::ctrl_c()
            .await
            .expect("failed to install ctrl+C handler");
        force_tx.cancel();
    });
    ShutdownSignal { stop, force }
}

/// Short random identifier for agent accounts.
pub fn mini_uuid() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}
