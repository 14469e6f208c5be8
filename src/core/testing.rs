//! Test doubles shared by the unit tests under `core`.

use crate::domain::model::{
    CancelRequest, CancelResponse, ConfirmRequest, ConfirmResponse, RefundStatusResponse, Subject,
};
use crate::domain::ports::{HandoffSlot, PaymentBackend, Storage};
use crate::utils::error::{PaymentError, Result};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Clone, Default)]
pub(crate) struct MockStorage {
    slots: Arc<Mutex<HashMap<HandoffSlot, Vec<u8>>>>,
    fail_writes: bool,
}

impl MockStorage {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing_writes() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub(crate) async fn raw(&self, slot: HandoffSlot) -> Option<Vec<u8>> {
        self.slots.lock().await.get(&slot).cloned()
    }

    pub(crate) async fn set_raw(&self, slot: HandoffSlot, data: &[u8]) {
        self.slots.lock().await.insert(slot, data.to_vec());
    }
}

impl Storage for MockStorage {
    async fn read_slot(&self, slot: HandoffSlot) -> Result<Option<Vec<u8>>> {
        Ok(self.slots.lock().await.get(&slot).cloned())
    }

    async fn write_slot(&self, slot: HandoffSlot, data: &[u8]) -> Result<()> {
        if self.fail_writes {
            return Err(PaymentError::IoError(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only storage",
            )));
        }
        self.slots.lock().await.insert(slot, data.to_vec());
        Ok(())
    }

    async fn clear_slot(&self, slot: HandoffSlot) -> Result<()> {
        self.slots.lock().await.remove(&slot);
        Ok(())
    }
}

/// 腳本化的後端回應；`Status` 模擬非 2xx 的傳輸錯誤
pub(crate) enum Scripted<T> {
    Reply(T),
    Status(u16),
}

fn play<T>(queue: &StdMutex<VecDeque<Scripted<T>>>) -> Result<T> {
    let next = queue
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .pop_front();
    match next {
        Some(Scripted::Reply(value)) => Ok(value),
        Some(Scripted::Status(status)) => Err(PaymentError::BackendStatusError {
            status,
            body: "scripted failure".to_string(),
        }),
        None => Err(PaymentError::BackendStatusError {
            status: 500,
            body: "script exhausted".to_string(),
        }),
    }
}

#[derive(Clone, Default)]
pub(crate) struct MockBackend {
    confirm_script: Arc<StdMutex<VecDeque<Scripted<ConfirmResponse>>>>,
    refund_script: Arc<StdMutex<VecDeque<Scripted<RefundStatusResponse>>>>,
    cancel_script: Arc<StdMutex<VecDeque<Scripted<CancelResponse>>>>,
    pub(crate) confirm_calls: Arc<AtomicUsize>,
    pub(crate) last_confirm: Arc<StdMutex<Option<ConfirmRequest>>>,
    pub(crate) refund_call_times: Arc<StdMutex<Vec<Instant>>>,
    pub(crate) last_cancel: Arc<StdMutex<Option<(Subject, CancelRequest)>>>,
}

impl MockBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_confirm(self, reply: Scripted<ConfirmResponse>) -> Self {
        self.confirm_script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(reply);
        self
    }

    pub(crate) fn with_refund_statuses(self, statuses: &[&str]) -> Self {
        {
            let mut script = self
                .refund_script
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            for status in statuses {
                script.push_back(Scripted::Reply(RefundStatusResponse {
                    status: status.to_string(),
                    message: None,
                }));
            }
        }
        self
    }

    pub(crate) fn with_refund(self, reply: Scripted<RefundStatusResponse>) -> Self {
        self.refund_script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(reply);
        self
    }

    pub(crate) fn with_cancel(self, reply: Scripted<CancelResponse>) -> Self {
        self.cancel_script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(reply);
        self
    }

    pub(crate) fn confirm_count(&self) -> usize {
        self.confirm_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn refund_times(&self) -> Vec<Instant> {
        self.refund_call_times
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait::async_trait]
impl PaymentBackend for MockBackend {
    async fn confirm_payment(&self, request: ConfirmRequest) -> Result<ConfirmResponse> {
        self.confirm_calls.fetch_add(1, Ordering::SeqCst);
        *self
            .last_confirm
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(request);
        play(&self.confirm_script)
    }

    async fn refund_status(&self, _refund_id: &str) -> Result<RefundStatusResponse> {
        self.refund_call_times
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(Instant::now());
        play(&self.refund_script)
    }

    async fn request_cancellation(
        &self,
        subject: Subject,
        request: CancelRequest,
    ) -> Result<CancelResponse> {
        *self
            .last_cancel
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some((subject, request));
        play(&self.cancel_script)
    }
}
