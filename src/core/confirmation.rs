use crate::core::handoff::Handoff;
use crate::core::routes::{Navigation, Route};
use crate::domain::model::{
    ConfirmResponse, DeclinedPayment, FailureRecord, PaymentIntent, PaymentOutcome,
    RedirectParams, Subject, INVALID_REDIRECT_CODE,
};
use crate::domain::ports::{PaymentBackend, Storage};
use crate::utils::error::{PaymentError, Result};
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// 確認流程狀態：`Idle → Confirming → {Succeeded, Cancelled, Failed}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    Confirming,
    Succeeded,
    Cancelled,
    Failed,
}

impl FlowState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            FlowState::Succeeded | FlowState::Cancelled | FlowState::Failed
        )
    }

    fn can_transition_to(&self, next: FlowState) -> bool {
        match (self, next) {
            (FlowState::Idle, FlowState::Confirming) => true,
            // 導回參數不完整時不會進入 Confirming
            (FlowState::Idle, FlowState::Failed) => true,
            (FlowState::Confirming, next) => next.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlowState::Idle => "idle",
            FlowState::Confirming => "confirming",
            FlowState::Succeeded => "succeeded",
            FlowState::Cancelled => "cancelled",
            FlowState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Order ids that have already been sent for confirmation.
///
/// Shared between flows so the same order is never confirmed twice, no matter how many
/// times the result route is entered.
#[derive(Debug, Default)]
pub struct ConfirmationLedger {
    orders: Mutex<HashSet<String>>,
}

impl ConfirmationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// 回傳 `false` 表示此訂單已經送出過
    pub fn claim(&self, order_id: &str) -> bool {
        self.orders
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(order_id.to_string())
    }

    pub fn contains(&self, order_id: &str) -> bool {
        self.orders
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(order_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationReport {
    pub state: FlowState,
    pub navigation: Navigation,
    pub outcome: Option<PaymentOutcome>,
    pub failure: Option<FailureRecord>,
}

/// Converts a gateway redirect into a confirmed backend payment and decides where to go next.
pub struct PaymentConfirmationFlow<B: PaymentBackend, S: Storage> {
    backend: B,
    handoff: Handoff<S>,
    subject: Subject,
    params: RedirectParams,
    started: AtomicBool,
    state: Mutex<FlowState>,
    ledger: Option<Arc<ConfirmationLedger>>,
}

impl<B: PaymentBackend, S: Storage> PaymentConfirmationFlow<B, S> {
    pub fn new(backend: B, storage: S, subject: Subject, params: RedirectParams) -> Self {
        Self {
            backend,
            handoff: Handoff::new(storage),
            subject,
            params,
            started: AtomicBool::new(false),
            state: Mutex::new(FlowState::Idle),
            ledger: None,
        }
    }

    pub fn with_ledger(mut self, ledger: Arc<ConfirmationLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn state(&self) -> FlowState {
        *self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn subject(&self) -> Subject {
        self.subject
    }

    fn transition(&self, next: FlowState) -> Result<()> {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !state.can_transition_to(next) {
            return Err(PaymentError::InvalidTransition {
                from: state.to_string(),
                to: next.to_string(),
            });
        }
        tracing::debug!("🔁 Confirmation {} -> {}", *state, next);
        *state = next;
        Ok(())
    }

    fn duplicate(&self) -> PaymentError {
        PaymentError::DuplicateConfirmation {
            order_id: self.params.order_id.clone().unwrap_or_default(),
        }
    }

    /// Runs the confirmation. Only the first call on a flow reaches the backend; later calls
    /// return [`PaymentError::DuplicateConfirmation`] without any network traffic.
    pub async fn run(&self) -> Result<ConfirmationReport> {
        if self.started.swap(true, Ordering::SeqCst) {
            tracing::warn!("⚠️ Confirmation for {} already started, ignoring", self.subject);
            return Err(self.duplicate());
        }

        let intent = match PaymentIntent::from_redirect(&self.params, self.subject) {
            Ok(intent) => intent,
            Err(e) => {
                tracing::warn!("❌ Invalid gateway redirect for {}: {}", self.subject, e);
                let failure = FailureRecord::new(self.subject, INVALID_REDIRECT_CODE, e.to_string());
                return self
                    .finish_failed(self.params.order_id.as_deref(), failure)
                    .await;
            }
        };

        if let Some(ledger) = &self.ledger {
            if !ledger.claim(intent.order_id()) {
                tracing::warn!(
                    "⚠️ Order {} was already submitted for confirmation",
                    intent.order_id()
                );
                return Err(self.duplicate());
            }
        }

        self.transition(FlowState::Confirming)?;

        // 先清掉上一次付款留下的交接資料
        if let Err(e) = self.handoff.clear().await {
            tracing::warn!("⚠️ Could not clear previous handoff records: {}", e);
        }

        let order_id = intent.order_id().to_string();
        let amount = intent.amount();
        tracing::info!(
            "💳 Confirming payment {} ({} minor units) for {}",
            order_id,
            amount,
            self.subject
        );

        match self.backend.confirm_payment(intent.into_request()).await {
            Ok(ConfirmResponse::Success(confirmed)) => {
                if let Some(kind) = confirmed.kind.filter(|k| *k != self.subject.kind) {
                    tracing::warn!("⚠️ Backend confirmed a {} payment for {}", kind, self.subject);
                }
                let outcome = PaymentOutcome::success(self.subject, &order_id, amount, &confirmed);
                self.persist_outcome(&outcome).await;
                self.transition(FlowState::Succeeded)?;
                tracing::info!("✅ Payment {} confirmed", order_id);

                Ok(ConfirmationReport {
                    state: FlowState::Succeeded,
                    navigation: Navigation::to(Route::PaymentSuccess {
                        subject: self.subject,
                        order_id,
                    }),
                    outcome: Some(outcome),
                    failure: None,
                })
            }
            Ok(ConfirmResponse::Cancel(cancelled)) => {
                let outcome =
                    PaymentOutcome::cancelled(self.subject, &order_id, cancelled.reason.as_deref());
                self.persist_outcome(&outcome).await;
                self.transition(FlowState::Cancelled)?;

                let reason = match &outcome {
                    PaymentOutcome::ReservationCancel(d) | PaymentOutcome::MatchCancel(d) => {
                        d.reason.clone()
                    }
                    _ => String::new(),
                };
                tracing::info!("🚫 Payment {} cancelled: {}", order_id, reason);

                Ok(ConfirmationReport {
                    state: FlowState::Cancelled,
                    navigation: Navigation::with_toast(Route::SubjectDetail(self.subject), reason),
                    outcome: Some(outcome),
                    failure: None,
                })
            }
            Ok(ConfirmResponse::Fail(declined)) => {
                let failure = FailureRecord::declined(self.subject, &declined);
                tracing::warn!(
                    "❌ Payment {} declined: {} ({})",
                    order_id,
                    failure.message,
                    failure.code
                );
                self.finish_failed(Some(&order_id), failure).await
            }
            Err(e) => {
                tracing::error!(
                    "❌ Confirmation request for {} failed: {} (Category: {:?})",
                    order_id,
                    e,
                    e.category()
                );
                self.finish_failed(Some(&order_id), FailureRecord::unexpected(self.subject))
                    .await
            }
        }
    }

    async fn finish_failed(
        &self,
        order_id: Option<&str>,
        failure: FailureRecord,
    ) -> Result<ConfirmationReport> {
        if let Err(e) = self.handoff.put_failure(order_id, &failure).await {
            tracing::error!("❌ Could not store failure record: {}", e);
        }
        self.transition(FlowState::Failed)?;

        Ok(ConfirmationReport {
            state: FlowState::Failed,
            navigation: Navigation::to(Route::PaymentFailure),
            outcome: None,
            failure: Some(failure),
        })
    }

    async fn persist_outcome(&self, outcome: &PaymentOutcome) {
        // 儲存失敗仍然要導頁，結果頁會因為找不到資料而導回首頁
        if let Err(e) = self.handoff.put_outcome(outcome).await {
            tracing::error!("❌ Could not store {} outcome: {}", outcome.type_tag(), e);
        }
    }
}

/// Query parameters the gateway appends to its fail URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatewayFailure {
    pub code: Option<String>,
    pub message: Option<String>,
    pub order_id: Option<String>,
}

impl GatewayFailure {
    pub fn from_query(query: &str) -> Self {
        let mut failure = Self::default();
        for (key, value) in url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
            match key.as_ref() {
                "code" => failure.code = Some(value.into_owned()),
                "message" => failure.message = Some(value.into_owned()),
                "orderId" => failure.order_id = Some(value.into_owned()),
                _ => {}
            }
        }
        failure
    }
}

/// 閘道直接導到失敗頁時，不呼叫後端，只記錄失敗原因
pub async fn record_gateway_failure<S: Storage>(
    storage: S,
    subject: Subject,
    gateway: &GatewayFailure,
) -> Result<Navigation> {
    let failure = FailureRecord::declined(
        subject,
        &DeclinedPayment {
            kind: Some(subject.kind),
            code: gateway.code.clone(),
            message: gateway.message.clone(),
        },
    );
    tracing::warn!(
        "❌ Gateway rejected payment for {}: {} ({})",
        subject,
        failure.message,
        failure.code
    );
    Handoff::new(storage)
        .put_failure(gateway.order_id.as_deref(), &failure)
        .await?;
    Ok(Navigation::to(Route::PaymentFailure))
}
