use crate::core::ConfigProvider;
use crate::domain::model::{
    CancelRequest, CancelResponse, ConfirmRequest, ConfirmResponse, RefundStatusResponse, Subject,
};
use crate::domain::ports::PaymentBackend;
use crate::utils::error::{PaymentError, Result};
use crate::utils::validation::validate_url;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

/// Payment backend reached over its REST API.
#[derive(Debug, Clone)]
pub struct ReqwestBackend {
    client: Client,
    base_url: Url,
}

impl ReqwestBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        validate_url("backend.base_url", base_url)?;
        let base_url = Url::parse(base_url).map_err(|e| PaymentError::InvalidConfigValueError {
            field: "backend.base_url".to_string(),
            value: base_url.to_string(),
            reason: e.to_string(),
        })?;

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("court-pay/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, base_url })
    }

    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Result<Self> {
        Self::new(config.api_base_url(), config.request_timeout())
    }

    /// 以路徑片段組出網址，片段內容會自動編碼
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| PaymentError::ConfigError {
                message: format!("backend URL '{}' cannot be a base", self.base_url),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PaymentError::BackendStatusError {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait::async_trait]
impl PaymentBackend for ReqwestBackend {
    async fn confirm_payment(&self, request: ConfirmRequest) -> Result<ConfirmResponse> {
        let url = self.endpoint(&["payments", "confirm"])?;
        tracing::debug!("Making confirmation request to: {}", url);

        let response = self.client.post(url).json(&request).send().await?;
        let status = response.status();
        tracing::debug!("Confirmation response status: {}", status);

        if status.is_client_error() && status != StatusCode::NOT_FOUND {
            // 後端可能以 4xx 回傳結構化的失敗結果
            let body = response.text().await.unwrap_or_default();
            return match serde_json::from_str::<ConfirmResponse>(&body) {
                Ok(declined @ ConfirmResponse::Fail(_)) => Ok(declined),
                _ => Err(PaymentError::BackendStatusError {
                    status: status.as_u16(),
                    body,
                }),
            };
        }

        Self::decode(response).await
    }

    async fn refund_status(&self, refund_id: &str) -> Result<RefundStatusResponse> {
        let url = self.endpoint(&["refunds", refund_id, "status"])?;
        tracing::debug!("Checking refund status at: {}", url);

        let response = self.client.get(url).send().await?;
        Self::decode(response).await
    }

    async fn request_cancellation(
        &self,
        subject: Subject,
        request: CancelRequest,
    ) -> Result<CancelResponse> {
        let id = subject.id.to_string();
        let url = self.endpoint(&[subject.kind.path_segment(), id.as_str(), "cancel"])?;
        tracing::debug!("Requesting cancellation at: {}", url);

        let response = self.client.post(url).json(&request).send().await?;
        Self::decode(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_segments() {
        let backend = ReqwestBackend::new("http://localhost:8080/api/", Duration::from_secs(5)).unwrap();
        assert_eq!(
            backend.endpoint(&["refunds", "rf 1/2", "status"]).unwrap().as_str(),
            "http://localhost:8080/api/refunds/rf%201%2F2/status"
        );

        let backend = ReqwestBackend::new("http://localhost:8080/api", Duration::from_secs(5)).unwrap();
        assert_eq!(
            backend.endpoint(&["payments", "confirm"]).unwrap().as_str(),
            "http://localhost:8080/api/payments/confirm"
        );
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        assert!(ReqwestBackend::new("not a url", Duration::from_secs(5)).is_err());
        assert!(ReqwestBackend::new("ftp://example.com", Duration::from_secs(5)).is_err());
    }
}
