use crate::domain::model::{FailureRecord, PaymentOutcome};
use crate::domain::ports::{HandoffSlot, Storage};
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// 交接紀錄外層，附帶訂單編號與寫入時間，讓結果頁判斷是否過期
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandoffEnvelope<T> {
    pub order_id: Option<String>,
    pub stored_at: DateTime<Utc>,
    pub record: T,
}

impl<T> HandoffEnvelope<T> {
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now.signed_duration_since(self.stored_at)
    }
}

/// Typed access to the `paymentResult` / `paymentFail` slots.
#[derive(Debug, Clone)]
pub struct Handoff<S: Storage> {
    storage: S,
}

impl<S: Storage> Handoff<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub async fn put_outcome(&self, outcome: &PaymentOutcome) -> Result<()> {
        let envelope = HandoffEnvelope {
            order_id: Some(outcome.order_id().to_string()),
            stored_at: Utc::now(),
            record: outcome,
        };
        self.write(HandoffSlot::PaymentResult, &envelope).await
    }

    pub async fn put_failure(&self, order_id: Option<&str>, failure: &FailureRecord) -> Result<()> {
        let envelope = HandoffEnvelope {
            order_id: order_id.map(str::to_string),
            stored_at: Utc::now(),
            record: failure,
        };
        self.write(HandoffSlot::PaymentFail, &envelope).await
    }

    pub async fn outcome(&self) -> Result<Option<HandoffEnvelope<PaymentOutcome>>> {
        self.read(HandoffSlot::PaymentResult).await
    }

    pub async fn failure(&self) -> Result<Option<HandoffEnvelope<FailureRecord>>> {
        self.read(HandoffSlot::PaymentFail).await
    }

    pub async fn clear(&self) -> Result<()> {
        self.storage.clear_slot(HandoffSlot::PaymentResult).await?;
        self.storage.clear_slot(HandoffSlot::PaymentFail).await
    }

    async fn write<T: Serialize>(&self, slot: HandoffSlot, envelope: &HandoffEnvelope<T>) -> Result<()> {
        let data = serde_json::to_vec_pretty(envelope)?;
        tracing::debug!("💾 Writing {} bytes to handoff slot {}", data.len(), slot);
        self.storage.write_slot(slot, &data).await
    }

    async fn read<T: DeserializeOwned>(&self, slot: HandoffSlot) -> Result<Option<HandoffEnvelope<T>>> {
        let Some(data) = self.storage.read_slot(slot).await? else {
            return Ok(None);
        };

        match serde_json::from_slice(&data) {
            Ok(envelope) => Ok(Some(envelope)),
            Err(e) => {
                // 格式不符的舊資料當作不存在
                tracing::warn!("⚠️ Ignoring unreadable handoff slot {}: {}", slot, e);
                Ok(None)
            }
        }
    }
}
