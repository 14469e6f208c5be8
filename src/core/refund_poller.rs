use crate::core::routes::{Navigation, Route};
use crate::domain::model::{PollSettings, RefundProgress, Subject};
use crate::domain::ports::PaymentBackend;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// 退款狀態：`Loading` 之外都是終止狀態
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefundState {
    Loading,
    Success,
    Error(String),
    TimedOut,
    Cancelled,
}

impl RefundState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RefundState::Loading)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollReport {
    pub state: RefundState,
    /// 呼叫狀態查詢的次數
    pub fetches: u32,
    /// 排程的重新查詢次數
    pub rechecks: u32,
    pub message: Option<String>,
}

impl PollReport {
    /// Where the cancellation-processing page sends the user once polling ends.
    pub fn navigation(&self, subject: Subject) -> Option<Navigation> {
        let detail = Route::SubjectDetail(subject);
        match &self.state {
            RefundState::Loading | RefundState::Cancelled => None,
            RefundState::Success => Some(Navigation::with_toast(
                detail,
                self.message
                    .clone()
                    .unwrap_or_else(|| "Your refund has been completed.".to_string()),
            )),
            RefundState::Error(message) => Some(Navigation::with_toast(detail, message.clone())),
            RefundState::TimedOut => Some(Navigation::with_toast(
                detail,
                "Your refund is still being processed. Check back later.",
            )),
        }
    }
}

const DEFAULT_REFUND_FAILURE: &str = "The refund could not be completed.";

/// Polls the refund status endpoint until it reports a terminal status, bounded by
/// [`PollSettings::max_attempts`] and [`PollSettings::max_duration`].
pub struct RefundStatusPoller<B: PaymentBackend> {
    backend: Arc<B>,
    refund_id: String,
    settings: PollSettings,
}

impl<B: PaymentBackend + 'static> RefundStatusPoller<B> {
    pub fn new(backend: Arc<B>, refund_id: impl Into<String>, settings: PollSettings) -> Self {
        Self {
            backend,
            refund_id: refund_id.into(),
            settings,
        }
    }

    /// 在目前的 task 上輪詢到結束
    pub async fn poll(self) -> PollReport {
        let (_cancel_tx, cancel_rx) = watch::channel(false);
        let (state_tx, _state_rx) = watch::channel(RefundState::Loading);
        self.run(cancel_rx, state_tx).await
    }

    /// Spawns the poll. Dropping the returned handle cancels it.
    pub fn spawn(self) -> PollHandle {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(RefundState::Loading);
        let task = tokio::spawn(self.run(cancel_rx, state_tx));
        PollHandle {
            cancel_tx,
            state_rx,
            task,
        }
    }

    async fn run(
        self,
        mut cancel_rx: watch::Receiver<bool>,
        state_tx: watch::Sender<RefundState>,
    ) -> PollReport {
        let started = Instant::now();
        let mut fetches = 0u32;
        let mut rechecks = 0u32;

        let finish = |state: RefundState, fetches: u32, rechecks: u32, message: Option<String>| {
            state_tx.send_replace(state.clone());
            PollReport {
                state,
                fetches,
                rechecks,
                message,
            }
        };

        tracing::info!("🔄 Polling refund {}", self.refund_id);

        loop {
            fetches += 1;
            let response = tokio::select! {
                biased;
                _ = cancelled(&mut cancel_rx) => {
                    tracing::info!("⏹️ Refund poll {} cancelled", self.refund_id);
                    return finish(RefundState::Cancelled, fetches - 1, rechecks, None);
                }
                response = self.backend.refund_status(&self.refund_id) => response,
            };

            let response = match response {
                Ok(response) => response,
                Err(e) => {
                    tracing::error!("❌ Refund status check for {} failed: {}", self.refund_id, e);
                    return finish(RefundState::Error(e.user_friendly_message()), fetches, rechecks, None);
                }
            };

            match RefundProgress::from_status(&response.status) {
                RefundProgress::Completed => {
                    tracing::info!("✅ Refund {} completed after {} checks", self.refund_id, fetches);
                    return finish(RefundState::Success, fetches, rechecks, response.message);
                }
                RefundProgress::Failed => {
                    let message = response
                        .message
                        .unwrap_or_else(|| DEFAULT_REFUND_FAILURE.to_string());
                    tracing::warn!("❌ Refund {} failed: {}", self.refund_id, message);
                    return finish(RefundState::Error(message.clone()), fetches, rechecks, Some(message));
                }
                RefundProgress::InProgress(status) => {
                    let out_of_attempts = fetches >= self.settings.max_attempts;
                    let out_of_time =
                        started.elapsed() + self.settings.interval > self.settings.max_duration;
                    if out_of_attempts || out_of_time {
                        tracing::warn!(
                            "⏱️ Refund {} still '{}' after {} checks, giving up",
                            self.refund_id,
                            status,
                            fetches
                        );
                        return finish(RefundState::TimedOut, fetches, rechecks, response.message);
                    }

                    tracing::debug!(
                        "⏳ Refund {} is '{}', re-checking in {:?}",
                        self.refund_id,
                        status,
                        self.settings.interval
                    );
                    rechecks += 1;
                    tokio::select! {
                        biased;
                        _ = cancelled(&mut cancel_rx) => {
                            tracing::info!("⏹️ Refund poll {} cancelled", self.refund_id);
                            return finish(RefundState::Cancelled, fetches, rechecks, None);
                        }
                        _ = tokio::time::sleep(self.settings.interval) => {}
                    }
                }
            }
        }
    }
}

/// 取消訊號，或持有 handle 的一方已經離開
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}

pub struct PollHandle {
    cancel_tx: watch::Sender<bool>,
    state_rx: watch::Receiver<RefundState>,
    task: JoinHandle<PollReport>,
}

impl PollHandle {
    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
    }

    pub fn state(&self) -> RefundState {
        self.state_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RefundState> {
        self.state_rx.clone()
    }

    pub async fn join(self) -> PollReport {
        let PollHandle {
            cancel_tx, task, ..
        } = self;
        let report = task.await.unwrap_or_else(|e| PollReport {
            state: RefundState::Error(format!("refund poll task failed: {}", e)),
            fetches: 0,
            rechecks: 0,
            message: None,
        });
        drop(cancel_tx);
        report
    }
}
