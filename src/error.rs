// region:    --- Imports
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

// endregion: --- Imports

// region:    --- App Error
/// 서비스 전역 오류 타입
/// Validation/Conflict는 호출자 잘못(4xx), Gateway/Store는 외부 협력자 장애(5xx).
#[derive(Debug, Error)]
pub enum AppError {
    /// 잘못된 입력 (재시도 불가)
    #[error("{message}")]
    Validation { code: &'static str, message: String },

    /// 중복 입찰, 낙찰 기록 불일치 등 상태 충돌
    #[error("{message}")]
    Conflict { code: &'static str, message: String },

    /// Pi 결제 게이트웨이 호출 실패. 로컬 상태는 변경되지 않는다.
    #[error("결제 게이트웨이 오류: {0}")]
    Gateway(String),

    /// 데이터베이스 장애
    #[error(transparent)]
    Store(#[from] sqlx::Error),
}

impl AppError {
    pub fn validation(code: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            code,
            message: message.into(),
        }
    }

    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        Self::Conflict {
            code,
            message: message.into(),
        }
    }

    /// 클라이언트에 노출되는 기계 판독용 오류 코드
    pub fn code(&self) -> &str {
        match self {
            Self::Validation { code, .. } | Self::Conflict { code, .. } => code,
            Self::Gateway(_) => "GATEWAY_ERROR",
            Self::Store(_) => "STORE_ERROR",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Gateway(_) => StatusCode::BAD_GATEWAY,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("{:<12} --> 서버 오류 응답: {:?}", "Error", self);
        }
        let body = serde_json::json!({
            "error": self.to_string(),
            "code": self.code(),
        });
        (status, Json(body)).into_response()
    }
}
// endregion: --- App Error

// endregion: --- Tests
