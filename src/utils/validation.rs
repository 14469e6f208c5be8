use crate::utils::error::{PaymentError, Result};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(PaymentError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(PaymentError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(PaymentError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(PaymentError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(PaymentError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: u64, min_value: u64) -> Result<()> {
    if value < min_value {
        return Err(PaymentError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(PaymentError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

/// 閘道導回時的查詢參數，缺少或空白都視為無效
pub fn require_redirect_param<'a>(field_name: &str, value: Option<&'a str>) -> Result<&'a str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        Some(_) => Err(PaymentError::InvalidRedirectError {
            field: field_name.to_string(),
            reason: "value is blank".to_string(),
        }),
        None => Err(PaymentError::InvalidRedirectError {
            field: field_name.to_string(),
            reason: "parameter is missing".to_string(),
        }),
    }
}

/// 金額以最小貨幣單位表示，必須是正整數
pub fn parse_minor_amount(field_name: &str, raw: &str) -> Result<u64> {
    let amount: u64 = raw
        .trim()
        .parse()
        .map_err(|_| PaymentError::InvalidRedirectError {
            field: field_name.to_string(),
            reason: format!("'{}' is not a whole number", raw),
        })?;

    if amount == 0 {
        return Err(PaymentError::InvalidRedirectError {
            field: field_name.to_string(),
            reason: "amount must be greater than zero".to_string(),
        });
    }

    Ok(amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("backend.base_url", "https://api.example.com").is_ok());
        assert!(validate_url("backend.base_url", "http://localhost:8080").is_ok());
        assert!(validate_url("backend.base_url", "").is_err());
        assert!(validate_url("backend.base_url", "invalid-url").is_err());
        assert!(validate_url("backend.base_url", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("refund_poll.max_attempts", 5, 1).is_ok());
        assert!(validate_positive_number("refund_poll.max_attempts", 0, 1).is_err());
    }

    #[test]
    fn test_require_redirect_param() {
        assert_eq!(require_redirect_param("orderId", Some(" order-1 ")).unwrap(), "order-1");
        assert!(matches!(
            require_redirect_param("orderId", Some("   ")),
            Err(PaymentError::InvalidRedirectError { .. })
        ));
        assert!(require_redirect_param("paymentKey", None).is_err());
    }

    #[test]
    fn test_parse_minor_amount() {
        assert_eq!(parse_minor_amount("amount", "15000").unwrap(), 15000);
        assert!(parse_minor_amount("amount", "0").is_err());
        assert!(parse_minor_amount("amount", "-100").is_err());
        assert!(parse_minor_amount("amount", "12.5").is_err());
        assert!(parse_minor_amount("amount", "abc").is_err());
    }
}
