//! Message-bus adapter for quota updates.

pub mod handler;
pub mod messages;
pub mod transport;

pub use handler::{start_quota_worker, QuotaRpcHandler};
pub use messages::{
    AddQuotaRequest, QuotaPayload, QuotaResponse, QuotaUpdate, ResourceTypeRef, RpcError,
    RpcErrorCode,
};
pub use transport::{InboundRequest, ReplyTransport};
