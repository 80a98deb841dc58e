use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc::{channel, Sender};
use tracing::Span;

use super::messages::{AddQuotaRequest, QuotaPayload, QuotaResponse};
use super::transport::{InboundRequest, ReplyTransport};
use crate::error::{AppError, AppResult};
use crate::subscriptions::QuotaLedger;
use crate::telemetry;

/// Sent when a response cannot be encoded, so the requester still gets its one reply.
pub(crate) const ENCODE_FAILURE_REPLY: &[u8] = br#"{"quota":null,"error":{"error_code":"internal","message":"failed to encode quota response","status_code":500}}"#;

/// key: quota-rpc-handler -> validate,upsert,re-read,respond
pub struct QuotaRpcHandler {
    ledger: Arc<dyn QuotaLedger>,
    span: Span,
}

impl QuotaRpcHandler {
    pub fn new(ledger: Arc<dyn QuotaLedger>) -> Self {
        Self::with_span(ledger, telemetry::component_span("quota-rpc"))
    }

    pub fn with_span(ledger: Arc<dyn QuotaLedger>, span: Span) -> Self {
        Self { ledger, span }
    }

    /// Validates the request, writes the new value and returns what the ledger holds
    /// afterwards. Nothing touches storage when validation fails.
    pub async fn add_quota(&self, request: &AddQuotaRequest) -> AppResult<QuotaPayload> {
        let update = request.validate()?;

        let (previous, exists) = self
            .ledger
            .current_quota(update.resource_type_id, update.subscription_id)
            .await?;
        tracing::debug!(
            parent: &self.span,
            resource_type = %update.resource_type_id,
            subscription = %update.subscription_id,
            previous,
            exists,
            requested = update.value,
            "updating quota"
        );

        self.ledger
            .upsert_quota(
                exists,
                update.value,
                update.resource_type_id,
                update.subscription_id,
            )
            .await?;

        let (value, _) = self
            .ledger
            .current_quota(update.resource_type_id, update.subscription_id)
            .await?;

        Ok(QuotaPayload {
            quota: value,
            resource_type: update.resource_type,
            subscription_id: update.subscription_ref,
        })
    }

    /// Decodes a raw payload and runs it through [`Self::add_quota`]. Failures are logged
    /// and folded into the error side of the response.
    pub async fn process(&self, payload: &[u8]) -> QuotaResponse {
        let outcome = match serde_json::from_slice::<AddQuotaRequest>(payload) {
            Ok(request) => self.add_quota(&request).await,
            Err(err) => Err(AppError::Validation(format!(
                "malformed quota request: {err}"
            ))),
        };

        match outcome {
            Ok(quota) => QuotaResponse::success(quota),
            Err(err) => {
                tracing::error!(parent: &self.span, ?err, "add quota failed");
                QuotaResponse::failure(&err)
            }
        }
    }

    /// Handles one bus request and sends exactly one reply. A response that cannot be
    /// encoded is replaced by [`ENCODE_FAILURE_REPLY`]. A failed send is logged, not retried.
    pub async fn handle(&self, request: InboundRequest, transport: &dyn ReplyTransport) {
        let response = self.process(&request.payload).await;

        let body = match serde_json::to_vec(&response) {
            Ok(body) => Bytes::from(body),
            Err(err) => {
                tracing::error!(
                    parent: &self.span,
                    ?err,
                    subject = %request.subject,
                    "failed to encode quota response"
                );
                Bytes::from_static(ENCODE_FAILURE_REPLY)
            }
        };

        if let Err(err) = transport.respond(&request.reply, body).await {
            tracing::error!(
                parent: &self.span,
                ?err,
                subject = %request.subject,
                reply = %request.reply,
                "failed to send quota response"
            );
        }
    }
}

/// Spawns the inbound loop. Each request runs on its own task, so replies carry no
/// ordering guarantee relative to each other.
pub fn start_quota_worker(
    handler: Arc<QuotaRpcHandler>,
    transport: Arc<dyn ReplyTransport>,
    buffer: usize,
) -> Sender<InboundRequest> {
    let (tx, mut rx) = channel::<InboundRequest>(buffer);
    tokio::spawn(async move {
        while let Some(request) = rx.recv().await {
            let handler = handler.clone();
            let transport = transport.clone();
            tokio::spawn(async move {
                handler.handle(request, transport.as_ref()).await;
            });
        }
        tracing::info!(parent: &handler.span, "quota request channel closed");
    });
    tx
}
