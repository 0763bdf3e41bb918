use async_trait::async_trait;
use tokio::sync::mpsc;

use super::types::{InboundEvent, OutboundMessage};

/// Chat transport contract. New platforms only need to implement this trait.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Stable transport identifier (e.g. `telegram`).
    fn id(&self) -> &'static str;

    /// Deliver one outbound message.
    async fn send(&self, message: OutboundMessage) -> anyhow::Result<()>;

    /// Start receiving inbound events and forwarding them to the runtime.
    ///
    /// Returns when the inbound channel closes.
    async fn run(&self, inbound_tx: mpsc::Sender<InboundEvent>) -> anyhow::Result<()>;
}
