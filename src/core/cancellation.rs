use crate::core::routes::{Navigation, Route};
use crate::domain::model::{CancellationReason, Subject};
use crate::domain::ports::PaymentBackend;
use crate::utils::error::{PaymentError, Result};

/// Submits a cancellation and routes to the processing page, where the refund is polled.
pub async fn request_cancellation<B: PaymentBackend + ?Sized>(
    backend: &B,
    subject: Subject,
    reason: &CancellationReason,
) -> Result<Navigation> {
    tracing::info!("🚫 Requesting cancellation of {} ({})", subject, reason.code());

    let response = backend
        .request_cancellation(subject, reason.to_request())
        .await?;

    if response.refund_id.trim().is_empty() {
        return Err(PaymentError::ValidationError {
            message: format!("backend returned an empty refund id for {}", subject),
        });
    }

    tracing::info!("📨 Cancellation accepted, refund {}", response.refund_id);
    Ok(Navigation::with_toast(
        Route::CancellationProcessing {
            subject,
            refund_id: response.refund_id,
        },
        "Your cancellation request has been received.",
    ))
}
