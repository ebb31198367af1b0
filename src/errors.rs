use thiserror::Error;

/// Errors raised while validating or matching an order.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed order: missing limit price, non-positive quantity, bad enum.
    #[error("invalid order: {0}")]
    InvalidOrder(String),

    /// A price-less market order met an empty opposite side mid-fill.
    #[error("no liquidity to fill market order")]
    NoLiquidity,

    /// Peek or pop on an empty price level queue.
    #[error("price level queue is empty")]
    EmptyQueue,
}

/// Errors from the socket layer of the routers and agents.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("socket i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed message: {0}")]
    Codec(#[from] serde_json::Error),

    /// Cooperative cancellation observed mid-operation.
    #[error("shutdown requested")]
    Shutdown,
}
