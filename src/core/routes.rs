use crate::domain::model::Subject;
use std::fmt;

/// 客戶端導頁目標
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    PaymentSuccess { subject: Subject, order_id: String },
    PaymentFailure,
    SubjectDetail(Subject),
    CancellationProcessing { subject: Subject, refund_id: String },
}

fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::PaymentSuccess { subject, order_id } => format!(
                "/{}/{}/payment/success?orderId={}",
                subject.kind.path_segment(),
                subject.id,
                encode(order_id)
            ),
            Route::PaymentFailure => "/payment/fail".to_string(),
            Route::SubjectDetail(subject) => {
                format!("/{}/{}", subject.kind.path_segment(), subject.id)
            }
            Route::CancellationProcessing { subject, refund_id } => format!(
                "/{}/{}/cancel/processing?refundId={}",
                subject.kind.path_segment(),
                subject.id,
                encode(refund_id)
            ),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Route::PaymentSuccess { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Route::PaymentFailure)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// 導頁決策：目標路由加上選擇性的提示訊息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub route: Route,
    pub toast: Option<String>,
}

impl Navigation {
    pub fn to(route: Route) -> Self {
        Self { route, toast: None }
    }

    pub fn with_toast(route: Route, toast: impl Into<String>) -> Self {
        Self {
            route,
            toast: Some(toast.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_route_keeps_order_id() {
        let route = Route::PaymentSuccess {
            subject: Subject::reservation(12),
            order_id: "order 12/a".to_string(),
        };
        assert_eq!(route.path(), "/reservations/12/payment/success?orderId=order+12%2Fa");
        assert!(route.is_success());
    }

    #[test]
    fn test_detail_and_processing_routes() {
        assert_eq!(Route::SubjectDetail(Subject::social_match(4)).path(), "/matches/4");
        assert_eq!(Route::PaymentFailure.to_string(), "/payment/fail");
        assert_eq!(Route::Home.path(), "/");
        let processing = Route::CancellationProcessing {
            subject: Subject::reservation(8),
            refund_id: "rf_1".to_string(),
        };
        assert_eq!(processing.path(), "/reservations/8/cancel/processing?refundId=rf_1");
    }
}
