//! The chat-transport seam the engine delivers through.
//!
//! `herald-telegram` provides the production implementation; tests
//! substitute a recording mock.

use async_trait::async_trait;

use herald_core::outbound::Outbound;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("destination {0} is not reachable")]
    Unresolvable(i64),

    #[error("send failed: {0}")]
    Send(String),
}

/// Minimal surface the engine needs from the chat platform.
///
/// Admin checks are deliberately absent — authorization happens in the
/// command layer before the engine is ever called.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Whether `destination` exists and the bot can post to it.
    async fn resolve(&self, destination: i64) -> bool;

    /// Deliver a rendered message.
    async fn send(&self, outbound: &Outbound) -> Result<(), TransportError>;
}
