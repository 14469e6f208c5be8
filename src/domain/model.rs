use crate::utils::error::{PaymentError, Result};
use crate::utils::validation::{parse_minor_amount, require_redirect_param};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// 付款所屬的對象種類：場地預約或社交球局
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectKind {
    #[serde(alias = "reserve")]
    Reservation,
    Match,
}

impl SubjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectKind::Reservation => "reservation",
            SubjectKind::Match => "match",
        }
    }

    /// 前端路由與後端資源共用的路徑片段
    pub fn path_segment(&self) -> &'static str {
        match self {
            SubjectKind::Reservation => "reservations",
            SubjectKind::Match => "matches",
        }
    }
}

impl fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubjectKind {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reservation" | "reserve" => Ok(SubjectKind::Reservation),
            "match" => Ok(SubjectKind::Match),
            other => Err(PaymentError::ValidationError {
                message: format!("unknown subject kind '{}'", other),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subject {
    pub kind: SubjectKind,
    pub id: u64,
}

impl Subject {
    pub fn new(kind: SubjectKind, id: u64) -> Self {
        Self { kind, id }
    }

    pub fn reservation(id: u64) -> Self {
        Self::new(SubjectKind::Reservation, id)
    }

    pub fn social_match(id: u64) -> Self {
        Self::new(SubjectKind::Match, id)
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// 解析 `reservation:42` 或 `match:7`
impl FromStr for Subject {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self> {
        let (kind, id) = s.split_once(':').ok_or_else(|| PaymentError::ValidationError {
            message: format!("subject '{}' must look like 'reservation:<id>' or 'match:<id>'", s),
        })?;
        let id = id.trim().parse().map_err(|_| PaymentError::ValidationError {
            message: format!("subject id '{}' is not a number", id),
        })?;
        Ok(Subject::new(kind.parse()?, id))
    }
}

/// Raw query parameters the gateway appends to the success redirect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedirectParams {
    pub order_id: Option<String>,
    pub payment_key: Option<String>,
    pub amount: Option<String>,
}

impl RedirectParams {
    pub fn from_query(query: &str) -> Self {
        let mut params = Self::default();
        for (key, value) in url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
            match key.as_ref() {
                "orderId" => params.order_id = Some(value.into_owned()),
                "paymentKey" => params.payment_key = Some(value.into_owned()),
                "amount" => params.amount = Some(value.into_owned()),
                _ => {}
            }
        }
        params
    }
}

/// 確認付款用的意圖。不實作 `Clone`，送出確認時會被消耗掉
#[derive(Debug, PartialEq, Eq)]
pub struct PaymentIntent {
    order_id: String,
    payment_key: String,
    amount: u64,
    subject: Subject,
}

impl PaymentIntent {
    pub fn from_redirect(params: &RedirectParams, subject: Subject) -> Result<Self> {
        let order_id = require_redirect_param("orderId", params.order_id.as_deref())?;
        let payment_key = require_redirect_param("paymentKey", params.payment_key.as_deref())?;
        let amount = require_redirect_param("amount", params.amount.as_deref())?;

        Ok(Self {
            order_id: order_id.to_string(),
            payment_key: payment_key.to_string(),
            amount: parse_minor_amount("amount", amount)?,
            subject,
        })
    }

    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn into_request(self) -> ConfirmRequest {
        let (reservation_id, match_id) = match self.subject.kind {
            SubjectKind::Reservation => (Some(self.subject.id), None),
            SubjectKind::Match => (None, Some(self.subject.id)),
        };
        ConfirmRequest {
            order_id: self.order_id,
            payment_key: self.payment_key,
            amount: self.amount,
            reservation_id,
            match_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmRequest {
    pub order_id: String,
    pub payment_key: String,
    pub amount: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reservation_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_id: Option<u64>,
}

/// 後端回傳的 `type` 只供比對，缺少或無法辨識時視為 None
fn lenient_kind<'de, D>(deserializer: D) -> std::result::Result<Option<SubjectKind>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .and_then(|s| s.parse().ok()))
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ConfirmResponse {
    Success(ConfirmedPayment),
    Fail(DeclinedPayment),
    Cancel(CancelledPayment),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmedPayment {
    #[serde(rename = "type", default, deserialize_with = "lenient_kind")]
    pub kind: Option<SubjectKind>,
    #[serde(default)]
    pub facility_name: Option<String>,
    #[serde(default)]
    pub court_name: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub amount: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclinedPayment {
    #[serde(rename = "type", default, deserialize_with = "lenient_kind")]
    pub kind: Option<SubjectKind>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelledPayment {
    #[serde(rename = "type", default, deserialize_with = "lenient_kind")]
    pub kind: Option<SubjectKind>,
    #[serde(default, alias = "message")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessDetails {
    pub id: u64,
    pub order_id: String,
    pub amount: u64,
    pub facility_name: Option<String>,
    pub court_name: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelDetails {
    pub id: u64,
    pub order_id: String,
    pub reason: String,
}

/// Outcome handed to the result page. The `type` tag encodes subject kind and result kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PaymentOutcome {
    #[serde(rename = "reservePaymentSuccess")]
    ReservationSuccess(SuccessDetails),
    #[serde(rename = "matchPaymentSuccess")]
    MatchSuccess(SuccessDetails),
    #[serde(rename = "reservePaymentCancel")]
    ReservationCancel(CancelDetails),
    #[serde(rename = "matchPaymentCancel")]
    MatchCancel(CancelDetails),
}

pub const DEFAULT_CANCEL_REASON: &str = "The payment was cancelled.";

impl PaymentOutcome {
    pub fn success(subject: Subject, order_id: &str, amount: u64, confirmed: &ConfirmedPayment) -> Self {
        let details = SuccessDetails {
            id: subject.id,
            order_id: order_id.to_string(),
            amount: confirmed.amount.unwrap_or(amount),
            facility_name: confirmed.facility_name.clone(),
            court_name: confirmed.court_name.clone(),
            start_time: confirmed.start_time.clone(),
            end_time: confirmed.end_time.clone(),
        };
        match subject.kind {
            SubjectKind::Reservation => PaymentOutcome::ReservationSuccess(details),
            SubjectKind::Match => PaymentOutcome::MatchSuccess(details),
        }
    }

    pub fn cancelled(subject: Subject, order_id: &str, reason: Option<&str>) -> Self {
        let details = CancelDetails {
            id: subject.id,
            order_id: order_id.to_string(),
            reason: reason
                .filter(|r| !r.trim().is_empty())
                .unwrap_or(DEFAULT_CANCEL_REASON)
                .to_string(),
        };
        match subject.kind {
            SubjectKind::Reservation => PaymentOutcome::ReservationCancel(details),
            SubjectKind::Match => PaymentOutcome::MatchCancel(details),
        }
    }

    pub fn subject(&self) -> Subject {
        match self {
            PaymentOutcome::ReservationSuccess(d) => Subject::reservation(d.id),
            PaymentOutcome::MatchSuccess(d) => Subject::social_match(d.id),
            PaymentOutcome::ReservationCancel(d) => Subject::reservation(d.id),
            PaymentOutcome::MatchCancel(d) => Subject::social_match(d.id),
        }
    }

    pub fn order_id(&self) -> &str {
        match self {
            PaymentOutcome::ReservationSuccess(d) | PaymentOutcome::MatchSuccess(d) => &d.order_id,
            PaymentOutcome::ReservationCancel(d) | PaymentOutcome::MatchCancel(d) => &d.order_id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(
            self,
            PaymentOutcome::ReservationSuccess(_) | PaymentOutcome::MatchSuccess(_)
        )
    }

    /// 序列化後的 `type` 標籤
    pub fn type_tag(&self) -> &'static str {
        match self {
            PaymentOutcome::ReservationSuccess(_) => "reservePaymentSuccess",
            PaymentOutcome::MatchSuccess(_) => "matchPaymentSuccess",
            PaymentOutcome::ReservationCancel(_) => "reservePaymentCancel",
            PaymentOutcome::MatchCancel(_) => "matchPaymentCancel",
        }
    }
}

pub const INVALID_REDIRECT_CODE: &str = "INVALID_REDIRECT_PARAMS";
pub const UNKNOWN_ERROR_CODE: &str = "UNKNOWN_ERROR";
pub const UNKNOWN_ERROR_MESSAGE: &str = "An unexpected error occurred while confirming the payment.";

/// Payload of the `paymentFail` slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    #[serde(rename = "type")]
    pub kind: SubjectKind,
    pub id: u64,
    pub code: String,
    pub message: String,
}

impl FailureRecord {
    pub fn new(subject: Subject, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: subject.kind,
            id: subject.id,
            code: code.into(),
            message: message.into(),
        }
    }

    /// 後端回報失敗時，type 與 id 一律取自發起確認的頁面
    pub fn declined(subject: Subject, declined: &DeclinedPayment) -> Self {
        Self::new(
            subject,
            declined.code.clone().unwrap_or_else(|| UNKNOWN_ERROR_CODE.to_string()),
            declined
                .message
                .clone()
                .unwrap_or_else(|| UNKNOWN_ERROR_MESSAGE.to_string()),
        )
    }

    pub fn unexpected(subject: Subject) -> Self {
        Self::new(subject, UNKNOWN_ERROR_CODE, UNKNOWN_ERROR_MESSAGE)
    }

    pub fn subject(&self) -> Subject {
        Subject::new(self.kind, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RefundStatusResponse {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefundProgress {
    Completed,
    Failed,
    InProgress(String),
}

impl RefundProgress {
    pub fn from_status(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "completed" => RefundProgress::Completed,
            "failed" => RefundProgress::Failed,
            other => RefundProgress::InProgress(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancellationReason {
    ScheduleChange,
    Weather,
    Personal,
    Other(String),
}

impl CancellationReason {
    pub fn code(&self) -> &'static str {
        match self {
            CancellationReason::ScheduleChange => "SCHEDULE_CHANGE",
            CancellationReason::Weather => "WEATHER",
            CancellationReason::Personal => "PERSONAL",
            CancellationReason::Other(_) => "OTHER",
        }
    }

    /// `Other` 必須附上說明文字
    pub fn parse(code: &str, detail: Option<&str>) -> Result<Self> {
        match code.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "schedule_change" => Ok(CancellationReason::ScheduleChange),
            "weather" => Ok(CancellationReason::Weather),
            "personal" => Ok(CancellationReason::Personal),
            "other" => match detail.map(str::trim) {
                Some(text) if !text.is_empty() => Ok(CancellationReason::Other(text.to_string())),
                _ => Err(PaymentError::ValidationError {
                    message: "a cancellation reason of 'other' needs a description".to_string(),
                }),
            },
            unknown => Err(PaymentError::ValidationError {
                message: format!("unknown cancellation reason '{}'", unknown),
            }),
        }
    }

    pub fn to_request(&self) -> CancelRequest {
        CancelRequest {
            reason: self.code().to_string(),
            detail: match self {
                CancellationReason::Other(text) => Some(text.clone()),
                _ => None,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CancelRequest {
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelResponse {
    pub refund_id: String,
}

/// 退款輪詢的間隔與上限
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_attempts: u32,
    pub max_duration: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            max_attempts: 20,
            max_duration: Duration::from_secs(60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_parse() {
        assert_eq!("reservation:42".parse::<Subject>().unwrap(), Subject::reservation(42));
        assert_eq!("match:7".parse::<Subject>().unwrap(), Subject::social_match(7));
        assert!("court:1".parse::<Subject>().is_err());
        assert!("reservation".parse::<Subject>().is_err());
        assert!("match:abc".parse::<Subject>().is_err());
    }

    #[test]
    fn test_redirect_params_from_query() {
        let params = RedirectParams::from_query("?orderId=ord%2D1&paymentKey=pk_abc&amount=15000&extra=1");
        assert_eq!(params.order_id.as_deref(), Some("ord-1"));
        assert_eq!(params.payment_key.as_deref(), Some("pk_abc"));
        assert_eq!(params.amount.as_deref(), Some("15000"));
    }

    #[test]
    fn test_intent_requires_all_params() {
        let params = RedirectParams {
            order_id: Some("ord-1".to_string()),
            payment_key: None,
            amount: Some("1000".to_string()),
        };
        let err = PaymentIntent::from_redirect(&params, Subject::reservation(1)).unwrap_err();
        assert!(matches!(err, PaymentError::InvalidRedirectError { ref field, .. } if field == "paymentKey"));
    }

    #[test]
    fn test_intent_into_request_sets_subject_field() {
        let params = RedirectParams::from_query("orderId=ord-1&paymentKey=pk&amount=2000");

        let reservation = PaymentIntent::from_redirect(&params, Subject::reservation(5)).unwrap();
        let body = serde_json::to_value(reservation.into_request()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"orderId": "ord-1", "paymentKey": "pk", "amount": 2000, "reservationId": 5})
        );

        let game = PaymentIntent::from_redirect(&params, Subject::social_match(9)).unwrap();
        let body = serde_json::to_value(game.into_request()).unwrap();
        assert_eq!(body["matchId"], 9);
        assert!(body.get("reservationId").is_none());
    }

    #[test]
    fn test_confirm_response_variants() {
        let success: ConfirmResponse = serde_json::from_value(serde_json::json!({
            "status": "success",
            "type": "reservation",
            "facilityName": "Riverside Tennis",
            "courtName": "Court 3",
            "startTime": "2026-10-20T18:00:00+09:00",
            "endTime": "2026-10-20T20:00:00+09:00"
        }))
        .unwrap();
        match success {
            ConfirmResponse::Success(p) => {
                assert_eq!(p.kind, Some(SubjectKind::Reservation));
                assert_eq!(p.court_name.as_deref(), Some("Court 3"));
            }
            other => panic!("unexpected response: {:?}", other),
        }

        let cancel: ConfirmResponse = serde_json::from_value(serde_json::json!({
            "status": "cancel",
            "type": "match",
            "message": "match is full"
        }))
        .unwrap();
        assert_eq!(
            cancel,
            ConfirmResponse::Cancel(CancelledPayment {
                kind: Some(SubjectKind::Match),
                reason: Some("match is full".to_string()),
            })
        );

        let untyped: ConfirmResponse = serde_json::from_value(serde_json::json!({
            "status": "success",
            "facilityName": "Riverside Tennis"
        }))
        .unwrap();
        assert!(matches!(untyped, ConfirmResponse::Success(ConfirmedPayment { kind: None, .. })));

        let odd_type: ConfirmResponse = serde_json::from_value(serde_json::json!({
            "status": "success",
            "type": "reservePayment"
        }))
        .unwrap();
        assert!(matches!(odd_type, ConfirmResponse::Success(ConfirmedPayment { kind: None, .. })));

        let unknown = serde_json::from_value::<ConfirmResponse>(serde_json::json!({"status": "pending"}));
        assert!(unknown.is_err());
    }

    #[test]
    fn test_outcome_type_tag_serialization() {
        let confirmed = ConfirmedPayment {
            kind: Some(SubjectKind::Reservation),
            facility_name: Some("Riverside Tennis".to_string()),
            court_name: None,
            start_time: None,
            end_time: None,
            amount: None,
        };
        let outcome = PaymentOutcome::success(Subject::reservation(3), "ord-9", 5000, &confirmed);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["type"], "reservePaymentSuccess");
        assert_eq!(json["orderId"], "ord-9");
        assert_eq!(json["amount"], 5000);

        let back: PaymentOutcome = serde_json::from_value(json).unwrap();
        assert_eq!(back, outcome);
        assert_eq!(back.subject(), Subject::reservation(3));
    }

    #[test]
    fn test_cancel_outcome_falls_back_to_default_reason() {
        let outcome = PaymentOutcome::cancelled(Subject::social_match(2), "ord-1", Some("  "));
        assert!(!outcome.is_success());
        assert_eq!(outcome.type_tag(), "matchPaymentCancel");
        match outcome {
            PaymentOutcome::MatchCancel(d) => assert_eq!(d.reason, DEFAULT_CANCEL_REASON),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_refund_progress_from_status() {
        assert_eq!(RefundProgress::from_status("completed"), RefundProgress::Completed);
        assert_eq!(RefundProgress::from_status("FAILED"), RefundProgress::Failed);
        assert_eq!(
            RefundProgress::from_status("processing"),
            RefundProgress::InProgress("processing".to_string())
        );
    }

    #[test]
    fn test_cancellation_reason_parse() {
        assert_eq!(
            CancellationReason::parse("schedule-change", None).unwrap(),
            CancellationReason::ScheduleChange
        );
        assert!(CancellationReason::parse("other", Some(" ")).is_err());
        let other = CancellationReason::parse("other", Some("injured")).unwrap();
        assert_eq!(
            other.to_request(),
            CancelRequest {
                reason: "OTHER".to_string(),
                detail: Some("injured".to_string()),
            }
        );
        assert!(CancellationReason::parse("bored", None).is_err());
    }
}
