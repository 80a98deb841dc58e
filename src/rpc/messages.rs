use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// key: quota-rpc-contract -> request,response payloads
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddQuotaRequest {
    #[serde(default)]
    pub quota: Option<QuotaPayload>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaPayload {
    pub quota: f64,
    pub resource_type: ResourceTypeRef,
    pub subscription_id: String,
}

/// Resource type as addressed on the wire. Optional fields are echoed back untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceTypeRef {
    pub uuid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// Shared shape for success and failure replies; exactly one side is populated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuotaResponse {
    #[serde(default)]
    pub quota: Option<QuotaPayload>,
    #[serde(default)]
    pub error: Option<RpcError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RpcErrorCode {
    NotFound,
    BadRequest,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    pub error_code: RpcErrorCode,
    pub message: String,
    pub status_code: u16,
}

/// Request fields after validation, plus the wire identifiers to echo back.
#[derive(Debug, Clone, PartialEq)]
pub struct QuotaUpdate {
    pub value: f64,
    pub resource_type_id: Uuid,
    pub subscription_id: Uuid,
    pub resource_type: ResourceTypeRef,
    pub subscription_ref: String,
}

impl AddQuotaRequest {
    pub fn validate(&self) -> AppResult<QuotaUpdate> {
        let quota = self
            .quota
            .as_ref()
            .ok_or_else(|| AppError::Validation("quota is required".into()))?;

        // Negative values are refused outright; there is no "unlimited" or "revoke" sentinel.
        if !quota.quota.is_finite() || quota.quota < 0.0 {
            return Err(AppError::Validation(format!(
                "quota must be a finite number >= 0 (negative values are not accepted), got {}",
                quota.quota
            )));
        }

        let resource_type_id = Uuid::parse_str(quota.resource_type.uuid.trim()).map_err(|err| {
            AppError::Validation(format!(
                "invalid resource type uuid {:?}: {err}",
                quota.resource_type.uuid
            ))
        })?;
        let subscription_id = Uuid::parse_str(quota.subscription_id.trim()).map_err(|err| {
            AppError::Validation(format!(
                "invalid subscription id {:?}: {err}",
                quota.subscription_id
            ))
        })?;

        Ok(QuotaUpdate {
            value: quota.quota,
            resource_type_id,
            subscription_id,
            resource_type: quota.resource_type.clone(),
            subscription_ref: quota.subscription_id.clone(),
        })
    }
}

impl QuotaResponse {
    pub fn success(quota: QuotaPayload) -> Self {
        Self {
            quota: Some(quota),
            error: None,
        }
    }

    pub fn failure(error: &AppError) -> Self {
        Self {
            quota: None,
            error: Some(error.to_rpc_error()),
        }
    }
}
