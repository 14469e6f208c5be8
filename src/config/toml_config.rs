use super::DEFAULT_HANDOFF_MAX_AGE_SECS;
use crate::core::ConfigProvider;
use crate::domain::model::PollSettings;
use crate::utils::error::{PaymentError, Result};
use crate::utils::validation::{
    validate_path, validate_positive_number, validate_range, validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

const DEFAULT_HANDOFF_DIR: &str = "./.court-pay";
const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub backend: BackendConfig,
    pub refund_poll: Option<RefundPollConfig>,
    pub handoff: Option<HandoffConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub base_url: String,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundPollConfig {
    pub interval_ms: Option<u64>,
    pub max_attempts: Option<u32>,
    pub max_duration_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandoffConfig {
    pub dir: Option<String>,
    pub max_age_seconds: Option<u64>,
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("static pattern is valid"))
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(PaymentError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| PaymentError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${PAYMENT_API_BASE})，未設定的保留原樣
    fn substitute_env_vars(content: &str) -> String {
        env_var_pattern()
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .to_string()
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_url("backend.base_url", &self.backend.base_url)?;

        if let Some(timeout) = self.backend.timeout_seconds {
            validate_positive_number("backend.timeout_seconds", timeout, 1)?;
        }

        if let Some(poll) = &self.refund_poll {
            if let Some(interval) = poll.interval_ms {
                validate_range("refund_poll.interval_ms", interval, 100, 60_000)?;
            }
            if let Some(attempts) = poll.max_attempts {
                validate_positive_number("refund_poll.max_attempts", u64::from(attempts), 1)?;
            }
            if let Some(duration) = poll.max_duration_seconds {
                validate_positive_number("refund_poll.max_duration_seconds", duration, 1)?;
            }
        }

        if let Some(dir) = self.handoff.as_ref().and_then(|h| h.dir.as_deref()) {
            validate_path("handoff.dir", dir)?;
        }

        Ok(())
    }
}

impl ConfigProvider for TomlConfig {
    fn api_base_url(&self) -> &str {
        &self.backend.base_url
    }

    fn handoff_dir(&self) -> &str {
        self.handoff
            .as_ref()
            .and_then(|h| h.dir.as_deref())
            .unwrap_or(DEFAULT_HANDOFF_DIR)
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.backend.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS))
    }

    fn refund_poll(&self) -> PollSettings {
        let defaults = PollSettings::default();
        let Some(poll) = &self.refund_poll else {
            return defaults;
        };
        PollSettings {
            interval: poll
                .interval_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.interval),
            max_attempts: poll.max_attempts.unwrap_or(defaults.max_attempts),
            max_duration: poll
                .max_duration_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.max_duration),
        }
    }

    fn handoff_max_age(&self) -> Duration {
        Duration::from_secs(
            self.handoff
                .as_ref()
                .and_then(|h| h.max_age_seconds)
                .unwrap_or(DEFAULT_HANDOFF_MAX_AGE_SECS),
        )
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_toml_config() {
        let toml_content = r#"
[backend]
base_url = "https://api.example.com/v1"
timeout_seconds = 5

[refund_poll]
interval_ms = 1500
max_attempts = 8

[handoff]
dir = "/tmp/court-pay"
max_age_seconds = 600
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.api_base_url(), "https://api.example.com/v1");
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.handoff_dir(), "/tmp/court-pay");
        assert_eq!(config.handoff_max_age(), Duration::from_secs(600));

        let poll = config.refund_poll();
        assert_eq!(poll.interval, Duration::from_millis(1500));
        assert_eq!(poll.max_attempts, 8);
        assert_eq!(poll.max_duration, PollSettings::default().max_duration);
    }

    #[test]
    fn test_defaults_when_sections_missing() {
        let config = TomlConfig::from_toml_str(
            r#"
[backend]
base_url = "http://localhost:8080/api"
"#,
        )
        .unwrap();

        assert_eq!(config.refund_poll(), PollSettings::default());
        assert_eq!(config.handoff_dir(), DEFAULT_HANDOFF_DIR);
        assert_eq!(
            config.handoff_max_age(),
            Duration::from_secs(DEFAULT_HANDOFF_MAX_AGE_SECS)
        );
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("COURT_PAY_TEST_API_BASE", "https://pay.test.example");

        let config = TomlConfig::from_toml_str(
            r#"
[backend]
base_url = "${COURT_PAY_TEST_API_BASE}"
"#,
        )
        .unwrap();
        assert_eq!(config.backend.base_url, "https://pay.test.example");

        std::env::remove_var("COURT_PAY_TEST_API_BASE");
    }

    #[test]
    fn test_config_validation() {
        let config = TomlConfig::from_toml_str(
            r#"
[backend]
base_url = "https://api.example.com"

[refund_poll]
interval_ms = 10
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());

        let config = TomlConfig::from_toml_str(
            r#"
[backend]
base_url = "invalid-url"
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[backend]\nbase_url = \"https://api.example.com\"\n")
            .unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.api_base_url(), "https://api.example.com");
    }
}
