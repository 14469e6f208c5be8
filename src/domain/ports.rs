use crate::domain::model::{
    CancelRequest, CancelResponse, ConfirmRequest, ConfirmResponse, PollSettings,
    RefundStatusResponse, Subject,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

/// 結果頁交接用的兩個欄位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandoffSlot {
    PaymentResult,
    PaymentFail,
}

impl HandoffSlot {
    pub fn key(&self) -> &'static str {
        match self {
            HandoffSlot::PaymentResult => "paymentResult",
            HandoffSlot::PaymentFail => "paymentFail",
        }
    }
}

impl fmt::Display for HandoffSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

pub trait Storage: Send + Sync {
    fn read_slot(
        &self,
        slot: HandoffSlot,
    ) -> impl std::future::Future<Output = Result<Option<Vec<u8>>>> + Send;
    fn write_slot(
        &self,
        slot: HandoffSlot,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn clear_slot(&self, slot: HandoffSlot) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn api_base_url(&self) -> &str;
    fn handoff_dir(&self) -> &str;
    fn request_timeout(&self) -> Duration;
    fn refund_poll(&self) -> PollSettings;
    fn handoff_max_age(&self) -> Duration;
}

#[async_trait]
pub trait PaymentBackend: Send + Sync {
    async fn confirm_payment(&self, request: ConfirmRequest) -> Result<ConfirmResponse>;
    async fn refund_status(&self, refund_id: &str) -> Result<RefundStatusResponse>;
    async fn request_cancellation(
        &self,
        subject: Subject,
        request: CancelRequest,
    ) -> Result<CancelResponse>;
}
