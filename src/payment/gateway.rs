/// Pi 결제 게이트웨이 어댑터
/// 원격 결제 API의 approve/complete 호출을 감싼다. 호출 실패 시 로컬 상태는
/// 어떤 것도 변경하지 않는다 — 클라이언트가 전체 흐름을 재시도한다.
// region:    --- Imports
use crate::error::AppError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

// endregion: --- Imports

// region:    --- Payment DTO
/// 결제 완료 응답 페이로드
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentDto {
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub user_uid: Option<String>,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub memo: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    #[serde(default)]
    pub from_address: Option<String>,
    #[serde(default)]
    pub to_address: Option<String>,
    #[serde(default)]
    pub status: Option<PaymentStatusDto>,
    #[serde(default)]
    pub transaction: Option<TransactionDto>,
    #[serde(default)]
    pub user: Option<PaymentUserDto>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentStatusDto {
    #[serde(default)]
    pub transaction_verified: bool,
    #[serde(default)]
    pub developer_approved: bool,
    #[serde(default)]
    pub developer_completed: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionDto {
    #[serde(default)]
    pub txid: Option<String>,
    #[serde(default)]
    pub verified: bool,
    #[serde(default, rename = "_link")]
    pub link: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentUserDto {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub uid: Option<String>,
}
// endregion: --- Payment DTO

// region:    --- Payment Gateway
/// 결제 게이트웨이 트레이트
#[async_trait]
pub trait PaymentGateway {
    async fn approve(&self, payment_id: &str) -> Result<(), AppError>;
    async fn complete(&self, payment_id: &str, tx_id: &str) -> Result<PaymentDto, AppError>;
}

/// Pi API 구현체
pub struct PiGateway {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl PiGateway {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl PaymentGateway for PiGateway {
    /// 결제 승인: POST /v2/payments/{id}/approve
    async fn approve(&self, payment_id: &str) -> Result<(), AppError> {
        info!("{:<12} --> 결제 승인 요청: {}", "Gateway", payment_id);
        let response = self
            .client
            .post(format!("{}/v2/payments/{}/approve", self.api_url, payment_id))
            .header("Authorization", format!("Key {}", self.api_key))
            .send()
            .await
            .map_err(|e| AppError::Gateway(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Gateway(format!(
                "결제 승인 실패 ({status}): {body}"
            )));
        }

        info!("{:<12} --> 결제 승인 성공: {}", "Gateway", payment_id);
        Ok(())
    }

    /// 결제 완료: POST /v2/payments/{id}/complete, body {"txid": ...}
    async fn complete(&self, payment_id: &str, tx_id: &str) -> Result<PaymentDto, AppError> {
        info!(
            "{:<12} --> 결제 완료 요청: {} (tx: {})",
            "Gateway", payment_id, tx_id
        );
        let response = self
            .client
            .post(format!(
                "{}/v2/payments/{}/complete",
                self.api_url, payment_id
            ))
            .header("Authorization", format!("Key {}", self.api_key))
            .json(&serde_json::json!({ "txid": tx_id }))
            .send()
            .await
            .map_err(|e| AppError::Gateway(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Gateway(format!(
                "결제 완료 실패 ({status}): {body}"
            )));
        }

        let payment = response
            .json::<PaymentDto>()
            .await
            .map_err(|e| AppError::Gateway(format!("결제 응답 파싱 실패: {e}")))?;

        info!(
            "{:<12} --> 결제 완료 성공: {} ({} Pi)",
            "Gateway", payment_id, payment.amount
        );
        Ok(payment)
    }
}
// endregion: --- Payment Gateway

// endregion: --- Tests
