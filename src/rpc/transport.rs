use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;

/// A request delivered by the message bus: the subject it arrived on, where the reply
/// goes, and the raw JSON payload.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub subject: String,
    pub reply: String,
    pub payload: Bytes,
}

/// key: quota-rpc-transport -> reply delivery
/// Implemented by whatever owns the bus connection.
#[async_trait]
pub trait ReplyTransport: Send + Sync {
    async fn respond(&self, reply: &str, payload: Bytes) -> Result<()>;
}
