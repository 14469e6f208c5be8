use thiserror::Error;

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Backend responded with {status}: {body}")]
    BackendStatusError { status: u16, body: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Invalid redirect parameter '{field}': {reason}")]
    InvalidRedirectError { field: String, reason: String },

    #[error("Payment for order {order_id} has already been submitted for confirmation")]
    DuplicateConfirmation { order_id: String },

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Network,
    Validation,
    Storage,
    Flow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl PaymentError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            PaymentError::ApiError(_) | PaymentError::BackendStatusError { .. } => {
                ErrorCategory::Network
            }
            PaymentError::IoError(_) | PaymentError::SerializationError(_) => ErrorCategory::Storage,
            PaymentError::ConfigError { .. }
            | PaymentError::ConfigValidationError { .. }
            | PaymentError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            PaymentError::InvalidRedirectError { .. } | PaymentError::ValidationError { .. } => {
                ErrorCategory::Validation
            }
            PaymentError::DuplicateConfirmation { .. } | PaymentError::InvalidTransition { .. } => {
                ErrorCategory::Flow
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 重複確認不會造成重複扣款，只是被擋下
            PaymentError::DuplicateConfirmation { .. } => ErrorSeverity::Low,
            PaymentError::ApiError(_) | PaymentError::BackendStatusError { .. } => {
                ErrorSeverity::Medium
            }
            PaymentError::InvalidRedirectError { .. }
            | PaymentError::ValidationError { .. }
            | PaymentError::SerializationError(_) => ErrorSeverity::High,
            PaymentError::ConfigError { .. }
            | PaymentError::ConfigValidationError { .. }
            | PaymentError::InvalidConfigValueError { .. }
            | PaymentError::IoError(_)
            | PaymentError::InvalidTransition { .. } => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("The payment service request did not succeed: {}", self),
            ErrorCategory::Storage => format!("Could not read or save the payment result: {}", self),
            ErrorCategory::Configuration => format!("The client is misconfigured: {}", self),
            ErrorCategory::Validation => {
                format!("The payment information is incomplete or invalid: {}", self)
            }
            ErrorCategory::Flow => format!("The payment is already being processed: {}", self),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            PaymentError::ApiError(_) => "Check the network connection and the backend base URL",
            PaymentError::BackendStatusError { .. } => {
                "Check the payment status on the reservation page before trying again"
            }
            PaymentError::InvalidRedirectError { .. } => {
                "Restart checkout from the reservation page; the gateway redirect was incomplete"
            }
            PaymentError::DuplicateConfirmation { .. } => {
                "Open the payment result page instead of confirming again"
            }
            PaymentError::ConfigError { .. }
            | PaymentError::ConfigValidationError { .. }
            | PaymentError::InvalidConfigValueError { .. } => {
                "Fix the configuration file or command-line flags"
            }
            PaymentError::IoError(_) | PaymentError::SerializationError(_) => {
                "Check that the handoff directory is writable and not corrupted"
            }
            PaymentError::InvalidTransition { .. } | PaymentError::ValidationError { .. } => {
                "Report this problem with the order id"
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, PaymentError>;
