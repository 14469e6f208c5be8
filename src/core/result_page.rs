use crate::core::handoff::{Handoff, HandoffEnvelope};
use crate::core::routes::Route;
use crate::domain::model::{FailureRecord, PaymentOutcome, Subject};
use crate::domain::ports::Storage;
use crate::utils::error::Result;
use chrono::Utc;
use std::time::Duration;

/// 結果頁要嘛顯示交接資料，要嘛導走
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageLoad<T> {
    Render(T),
    Redirect(Route),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureView {
    pub record: FailureRecord,
    pub order_id: Option<String>,
    /// 使用者重新付款的入口
    pub retry: Route,
}

pub struct ResultPages<S: Storage> {
    handoff: Handoff<S>,
    max_age: Duration,
}

impl<S: Storage> ResultPages<S> {
    pub fn new(storage: S, max_age: Duration) -> Self {
        Self {
            handoff: Handoff::new(storage),
            max_age,
        }
    }

    fn is_fresh<T>(&self, envelope: &HandoffEnvelope<T>) -> bool {
        match chrono::Duration::from_std(self.max_age) {
            Ok(max_age) => envelope.age(Utc::now()) <= max_age,
            Err(_) => true,
        }
    }

    /// Loads the success page for `subject`. The stored outcome must be a success for the same
    /// subject and order, and still fresh; anything else redirects home.
    pub async fn success_page(
        &self,
        subject: Subject,
        order_id: &str,
    ) -> Result<PageLoad<PaymentOutcome>> {
        let Some(envelope) = self.handoff.outcome().await? else {
            tracing::info!("🏠 No payment result stored, redirecting home");
            return Ok(PageLoad::Redirect(Route::Home));
        };

        let outcome = &envelope.record;
        if !outcome.is_success() || outcome.subject() != subject || outcome.order_id() != order_id {
            tracing::info!(
                "🏠 Stored {} for order {} does not match {} / {}, redirecting home",
                outcome.type_tag(),
                outcome.order_id(),
                subject,
                order_id
            );
            return Ok(PageLoad::Redirect(Route::Home));
        }

        if !self.is_fresh(&envelope) {
            tracing::info!("🏠 Payment result for order {} is stale, redirecting home", order_id);
            return Ok(PageLoad::Redirect(Route::Home));
        }

        Ok(PageLoad::Render(envelope.record))
    }

    pub async fn failure_page(&self) -> Result<PageLoad<FailureView>> {
        let Some(envelope) = self.handoff.failure().await? else {
            tracing::info!("🏠 No payment failure stored, redirecting home");
            return Ok(PageLoad::Redirect(Route::Home));
        };

        if !self.is_fresh(&envelope) {
            tracing::info!("🏠 Payment failure record is stale, redirecting home");
            return Ok(PageLoad::Redirect(Route::Home));
        }

        let retry = Route::SubjectDetail(envelope.record.subject());
        Ok(PageLoad::Render(FailureView {
            record: envelope.record,
            order_id: envelope.order_id,
            retry,
        }))
    }
}
