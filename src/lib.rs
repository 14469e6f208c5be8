pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, Command};
pub use config::TomlConfig;

pub use adapters::{http::ReqwestBackend, storage::LocalStorage};
pub use core::{
    confirmation::{ConfirmationLedger, FlowState, PaymentConfirmationFlow},
    refund_poller::{PollHandle, PollReport, RefundState, RefundStatusPoller},
    result_page::{PageLoad, ResultPages},
    routes::{Navigation, Route},
};
pub use utils::error::{PaymentError, Result};
