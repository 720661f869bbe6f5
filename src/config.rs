// region:    --- Imports
use chrono::{DateTime, Duration, Utc};
use tracing::warn;

// endregion: --- Imports

// region:    --- App Config
/// 서비스 전역 설정
/// 프로세스 시작 시점에 환경 변수에서 한 번 읽어 각 컴포넌트에 주입한다.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    /// Pi API 인증 키 (필수)
    pub pi_api_key: String,
    pub pi_api_url: String,
    pub auction_id: String,
    pub auction_start_time: DateTime<Utc>,
    pub auction_end_time: DateTime<Utc>,
    /// 최소 입찰 금액 (Pi)
    pub min_bid_amount: f64,
    /// 월 구독 고정 가격 (Pi)
    pub subscription_price: f64,
    /// 구독 결제 메모 판별에 쓰이는 상품명 토큰
    pub subscription_product_token: String,
    /// 결제 마감 스위퍼 실행 주기 (초)
    pub sweep_interval_secs: u64,
}

impl AppConfig {
    /// 환경 변수에서 설정 로드
    pub fn from_env() -> Result<Self, String> {
        let pi_api_key = std::env::var("PI_API_KEY")
            .map_err(|_| "PI_API_KEY 환경 변수가 설정되지 않았습니다".to_string())?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL 환경 변수가 설정되지 않았습니다".to_string())?;

        let now = Utc::now();
        let auction_start_time = parse_time_var("AUCTION_START_TIME")?.unwrap_or_else(|| {
            warn!(
                "{:<12} --> AUCTION_START_TIME 미설정: 현재 시각을 시작 시각으로 사용",
                "Config"
            );
            now
        });
        let auction_end_time = parse_time_var("AUCTION_END_TIME")?.unwrap_or_else(|| {
            warn!(
                "{:<12} --> AUCTION_END_TIME 미설정: 시작 10분 후를 종료 시각으로 사용",
                "Config"
            );
            auction_start_time + Duration::minutes(10)
        });

        Ok(Self {
            port: parse_var("PORT")?.unwrap_or(3000),
            database_url,
            pi_api_key,
            pi_api_url: std::env::var("PI_API_URL")
                .unwrap_or_else(|_| "https://api.minepi.com".to_string()),
            auction_id: std::env::var("AUCTION_ID").unwrap_or_else(|_| "auction_1".to_string()),
            auction_start_time,
            auction_end_time,
            min_bid_amount: parse_var("MIN_BID_AMOUNT")?.unwrap_or(3.0),
            subscription_price: parse_var("SUBSCRIPTION_PRICE")?.unwrap_or(1.0),
            subscription_product_token: std::env::var("SUBSCRIPTION_PRODUCT_TOKEN")
                .unwrap_or_else(|_| "appraisells".to_string()),
            sweep_interval_secs: parse_var("SWEEP_INTERVAL_SECS")?.unwrap_or(60),
        })
    }
}

/// 숫자형 환경 변수 파싱 (미설정 시 None)
fn parse_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>, String> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| format!("{name} 환경 변수 파싱 실패: {raw}")),
        Err(_) => Ok(None),
    }
}

/// RFC3339 시각 환경 변수 파싱 (미설정 시 None)
fn parse_time_var(name: &str) -> Result<Option<DateTime<Utc>>, String> {
    match std::env::var(name) {
        Ok(raw) => DateTime::parse_from_rfc3339(&raw)
            .map(|t| Some(t.with_timezone(&Utc)))
            .map_err(|e| format!("{name} 환경 변수 파싱 실패: {e}")),
        Err(_) => Ok(None),
    }
}
// endregion: --- App Config
