pub mod cancellation;
pub mod confirmation;
pub mod handoff;
pub mod refund_poller;
pub mod result_page;
pub mod routes;

#[cfg(test)]
pub(crate) mod testing;

pub use crate::domain::model::{PaymentIntent, PaymentOutcome, Subject, SubjectKind};
pub use crate::domain::ports::{ConfigProvider, HandoffSlot, PaymentBackend, Storage};
pub use crate::utils::error::Result;
