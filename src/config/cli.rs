use super::DEFAULT_HANDOFF_MAX_AGE_SECS;
use crate::core::ConfigProvider;
use crate::domain::model::{PollSettings, Subject};
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_path, validate_positive_number, validate_range, validate_url, Validate,
};
use clap::{Parser, Subcommand};
use std::time::Duration;

#[derive(Debug, Clone, Parser)]
#[command(name = "court-pay")]
#[command(about = "Confirm court and match payments and follow refunds")]
pub struct CliConfig {
    #[arg(long, global = true, default_value = "http://localhost:8080/api")]
    pub api_base: String,

    #[arg(long, global = true, default_value = "./.court-pay")]
    pub handoff_dir: String,

    #[arg(long, global = true, help = "Load settings from a TOML file instead of flags")]
    pub config: Option<String>,

    #[arg(long, global = true, default_value = "10")]
    pub timeout_seconds: u64,

    #[arg(long, global = true, help = "Delay between refund status checks")]
    pub poll_interval_ms: Option<u64>,

    #[arg(long, global = true, help = "Stop following a refund after this many checks")]
    pub poll_max_attempts: Option<u32>,

    #[arg(long, global = true, help = "Stop following a refund after this many seconds")]
    pub poll_max_duration_seconds: Option<u64>,

    #[arg(long, global = true, default_value_t = DEFAULT_HANDOFF_MAX_AGE_SECS)]
    pub handoff_max_age_seconds: u64,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Confirm a payment after the gateway redirected back
    Confirm {
        /// `reservation:<id>` or `match:<id>`
        #[arg(long)]
        subject: Subject,
        /// Raw redirect query string, e.g. `orderId=..&paymentKey=..&amount=..`
        #[arg(long)]
        query: Option<String>,
        #[arg(long)]
        order_id: Option<String>,
        #[arg(long)]
        payment_key: Option<String>,
        #[arg(long)]
        amount: Option<String>,
    },
    /// Record a failure the gateway reported on its fail redirect
    GatewayFail {
        #[arg(long)]
        subject: Subject,
        #[arg(long)]
        query: String,
    },
    /// Cancel a reservation or match and follow the refund
    Cancel {
        #[arg(long)]
        subject: Subject,
        /// schedule-change, weather, personal or other
        #[arg(long)]
        reason: String,
        #[arg(long)]
        detail: Option<String>,
        #[arg(long, help = "Return right after the request without polling the refund")]
        no_follow: bool,
    },
    /// Poll the status of a refund until it finishes
    RefundStatus {
        #[arg(long)]
        subject: Subject,
        #[arg(long)]
        refund_id: String,
    },
    /// Show what the result page would render
    ShowResult {
        #[arg(long, requires = "order_id")]
        subject: Option<Subject>,
        /// Success page for this order; failure page when both are omitted
        #[arg(long, requires = "subject")]
        order_id: Option<String>,
    },
}

impl ConfigProvider for CliConfig {
    fn api_base_url(&self) -> &str {
        &self.api_base
    }

    fn handoff_dir(&self) -> &str {
        &self.handoff_dir
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    fn refund_poll(&self) -> PollSettings {
        let defaults = PollSettings::default();
        PollSettings {
            interval: self
                .poll_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.interval),
            max_attempts: self.poll_max_attempts.unwrap_or(defaults.max_attempts),
            max_duration: self
                .poll_max_duration_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.max_duration),
        }
    }

    fn handoff_max_age(&self) -> Duration {
        Duration::from_secs(self.handoff_max_age_seconds)
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_url("api_base", &self.api_base)?;
        validate_path("handoff_dir", &self.handoff_dir)?;
        validate_positive_number("timeout_seconds", self.timeout_seconds, 1)?;
        if let Some(interval) = self.poll_interval_ms {
            validate_range("poll_interval_ms", interval, 100, 60_000)?;
        }
        if let Some(attempts) = self.poll_max_attempts {
            validate_positive_number("poll_max_attempts", u64::from(attempts), 1)?;
        }
        if let Some(duration) = self.poll_max_duration_seconds {
            validate_positive_number("poll_max_duration_seconds", duration, 1)?;
        }
        Ok(())
    }
}
