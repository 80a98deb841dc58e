#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use subscriptions::error::{AppError, AppResult};
use subscriptions::rpc::{QuotaResponse, ReplyTransport};
use subscriptions::subscriptions::QuotaLedger;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

/// Ledger backed by a map keyed on (resource type, subscription).
#[derive(Default)]
pub struct MemoryLedger {
    pub rows: Mutex<HashMap<(Uuid, Uuid), f64>>,
    pub calls: AtomicUsize,
    pub upserts: Mutex<Vec<(bool, f64)>>,
    pub fail_upserts: bool,
}

impl MemoryLedger {
    pub fn with_quota(resource_type_id: Uuid, subscription_id: Uuid, value: f64) -> Self {
        let ledger = Self::default();
        ledger
            .rows
            .lock()
            .unwrap()
            .insert((resource_type_id, subscription_id), value);
        ledger
    }

    pub fn failing() -> Self {
        Self {
            fail_upserts: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuotaLedger for MemoryLedger {
    async fn current_quota(
        &self,
        resource_type_id: Uuid,
        subscription_id: Uuid,
    ) -> AppResult<(f64, bool)> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let rows = self.rows.lock().unwrap();
        Ok(match rows.get(&(resource_type_id, subscription_id)) {
            Some(value) => (*value, true),
            None => (0.0, false),
        })
    }

    async fn upsert_quota(
        &self,
        exists: bool,
        value: f64,
        resource_type_id: Uuid,
        subscription_id: Uuid,
    ) -> AppResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_upserts {
            return Err(AppError::Storage(sqlx::Error::PoolTimedOut));
        }
        self.upserts.lock().unwrap().push((exists, value));
        self.rows
            .lock()
            .unwrap()
            .insert((resource_type_id, subscription_id), value);
        Ok(())
    }
}

/// Forwards every reply onto a channel so tests can assert on them.
pub struct RecordingTransport {
    pub sender: UnboundedSender<(String, QuotaResponse)>,
    pub attempts: AtomicUsize,
    pub fail: bool,
}

impl RecordingTransport {
    pub fn new(sender: UnboundedSender<(String, QuotaResponse)>) -> Self {
        Self {
            sender,
            attempts: AtomicUsize::new(0),
            fail: false,
        }
    }
}

#[async_trait]
impl ReplyTransport for RecordingTransport {
    async fn respond(&self, reply: &str, payload: Bytes) -> anyhow::Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("bus connection closed");
        }
        let response: QuotaResponse = serde_json::from_slice(&payload)?;
        self.sender.send((reply.to_string(), response))?;
        Ok(())
    }
}
