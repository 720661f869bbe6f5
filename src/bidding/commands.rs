/// 입찰 커맨드 처리
/// 검증 순서는 고정이다: 필수값 → 최소 금액 → 경매 시계 → 중복 입찰 → 금액 중복.
// region:    --- Imports
use crate::auction::clock::AuctionStatus;
use crate::config::AppConfig;
use crate::database::DatabaseManager;
use crate::error::AppError;
use crate::query::queries;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

// endregion: --- Imports

// region:    --- Commands
/// 입찰 명령
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PlaceBidCommand {
    pub username: Option<String>,
    pub user_uid: Option<String>,
    pub item_id: Option<String>,
    pub bid_amount: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// 검증을 통과한 입찰
#[derive(Debug, Clone)]
pub struct ValidatedBid {
    pub username: String,
    pub user_uid: String,
    pub item_id: String,
    pub bid_amount: f64,
    pub bid_time: DateTime<Utc>,
}

/// 입찰 성공 결과
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedBid {
    pub bid_id: i64,
    pub username: String,
    pub item_id: String,
    pub bid_amount: f64,
}

/// 요청 메타데이터 (감사 기록용)
#[derive(Debug, Default, Clone)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// 저장소 접근 전 단계의 입찰 검증 (순수)
pub fn validate_bid(
    cmd: PlaceBidCommand,
    clock: &AuctionStatus,
    min_bid_amount: f64,
    now: DateTime<Utc>,
) -> Result<ValidatedBid, AppError> {
    let (username, user_uid, item_id, bid_amount) =
        match (cmd.username, cmd.user_uid, cmd.item_id, cmd.bid_amount) {
            (Some(username), Some(user_uid), Some(item_id), Some(bid_amount))
                if !username.is_empty() && !user_uid.is_empty() && !item_id.is_empty() =>
            {
                (username, user_uid, item_id, bid_amount)
            }
            _ => {
                return Err(AppError::validation(
                    "MISSING_FIELDS",
                    "필수 입력값이 누락되었습니다.",
                ))
            }
        };

    if bid_amount < min_bid_amount {
        return Err(AppError::validation(
            "BELOW_MINIMUM",
            format!("최소 입찰 금액은 {min_bid_amount} Pi입니다."),
        ));
    }

    if !clock.is_active() {
        return Err(AppError::validation(
            clock.phase.rejection_code(),
            clock.message,
        ));
    }

    Ok(ValidatedBid {
        username,
        user_uid,
        item_id,
        bid_amount,
        bid_time: cmd.timestamp.unwrap_or(now),
    })
}

/// 입찰 처리
/// 중복 검사는 사전 조회로 결정적 오류 메시지를 내고, 동시 요청 경합은
/// 유니크 인덱스 위반을 같은 Conflict 오류로 되돌려 막는다.
pub async fn handle_place_bid(
    cmd: PlaceBidCommand,
    client: ClientInfo,
    db_manager: &DatabaseManager,
    config: &AppConfig,
) -> Result<PlacedBid, AppError> {
    info!("{:<12} --> 입찰 요청 처리 시작: {:?}", "Command", cmd);

    let now = Utc::now();
    let clock = crate::auction::clock::auction_status(
        now,
        config.auction_start_time,
        config.auction_end_time,
    );
    let bid = validate_bid(cmd, &clock, config.min_bid_amount, now)?;

    // 사용자당 출품작 하나에 한 번만 입찰 가능
    let already_bid: bool = sqlx::query_scalar(queries::EXISTS_USER_BID)
        .bind(&bid.username)
        .bind(&bid.item_id)
        .fetch_one(db_manager.pool())
        .await?;
    if already_bid {
        return Err(AppError::conflict(
            "ALREADY_BID",
            "이미 이 출품작에 입찰했습니다.",
        ));
    }

    // 동일 출품작에 동일 금액 입찰 불가
    let amount_taken: bool = sqlx::query_scalar(queries::EXISTS_AMOUNT_BID)
        .bind(&bid.item_id)
        .bind(bid.bid_amount)
        .fetch_one(db_manager.pool())
        .await?;
    if amount_taken {
        return Err(AppError::conflict(
            "AMOUNT_TAKEN",
            "이미 동일한 금액의 입찰이 있습니다.",
        ));
    }

    let bid_id: i64 = sqlx::query_scalar(queries::INSERT_BID)
        .bind(&config.auction_id)
        .bind(&bid.item_id)
        .bind(&bid.username)
        .bind(&bid.user_uid)
        .bind(bid.bid_amount)
        .bind(bid.bid_time)
        .bind(&client.ip_address)
        .bind(&client.user_agent)
        .fetch_one(db_manager.pool())
        .await
        .map_err(map_unique_violation)?;

    info!(
        "{:<12} --> 입찰 성공: {} - {} Pi on {}",
        "Command", bid.username, bid.bid_amount, bid.item_id
    );

    Ok(PlacedBid {
        bid_id,
        username: bid.username,
        item_id: bid.item_id,
        bid_amount: bid.bid_amount,
    })
}

/// 유니크 인덱스 위반을 사전 검사와 동일한 Conflict 오류로 변환
fn map_unique_violation(e: sqlx::Error) -> AppError {
    if let Some(db_err) = e.as_database_error() {
        match db_err.constraint() {
            Some("idx_bids_username_item") => {
                return AppError::conflict("ALREADY_BID", "이미 이 출품작에 입찰했습니다.")
            }
            Some("idx_bids_item_amount") => {
                return AppError::conflict("AMOUNT_TAKEN", "이미 동일한 금액의 입찰이 있습니다.")
            }
            _ => {}
        }
    }
    AppError::Store(e)
}
// endregion: --- Commands

// region:    --- Tests
#[cfg(test)]
mod tests {
    use super::*;
    use crate::auction::clock::auction_status;
    use chrono::Duration;

    fn cmd(username: Option<&str>, amount: Option<f64>) -> PlaceBidCommand {
        PlaceBidCommand {
            username: username.map(String::from),
            user_uid: Some("uid_1".to_string()),
            item_id: Some("art_piece_1".to_string()),
            bid_amount: amount,
            timestamp: None,
        }
    }

    fn active_clock(now: chrono::DateTime<Utc>) -> AuctionStatus {
        auction_status(now, now - Duration::minutes(1), now + Duration::minutes(9))
    }

    #[test]
    fn test_missing_fields_rejected_first() {
        // 금액도 미달이지만 필수값 누락이 먼저 보고된다
        let now = Utc::now();
        let err = validate_bid(cmd(None, Some(1.0)), &active_clock(now), 3.0, now).unwrap_err();
        assert_eq!(err.code(), "MISSING_FIELDS");
    }

    #[test]
    fn test_empty_username_counts_as_missing() {
        let now = Utc::now();
        let err = validate_bid(cmd(Some(""), Some(5.0)), &active_clock(now), 3.0, now).unwrap_err();
        assert_eq!(err.code(), "MISSING_FIELDS");
    }

    #[test]
    fn test_below_minimum_rejected() {
        let now = Utc::now();
        let err =
            validate_bid(cmd(Some("user_a"), Some(2.99)), &active_clock(now), 3.0, now).unwrap_err();
        assert_eq!(err.code(), "BELOW_MINIMUM");
    }

    #[test]
    fn test_below_minimum_reported_before_clock() {
        // 경매가 끝났어도 금액 검증이 먼저다
        let now = Utc::now();
        let ended = auction_status(now, now - Duration::minutes(20), now - Duration::minutes(10));
        let err = validate_bid(cmd(Some("user_a"), Some(1.0)), &ended, 3.0, now).unwrap_err();
        assert_eq!(err.code(), "BELOW_MINIMUM");
    }

    #[test]
    fn test_ended_auction_rejected() {
        let now = Utc::now();
        let ended = auction_status(now, now - Duration::minutes(20), now - Duration::minutes(10));
        let err = validate_bid(cmd(Some("user_a"), Some(5.0)), &ended, 3.0, now).unwrap_err();
        assert_eq!(err.code(), "ALREADY_ENDED");
    }

    #[test]
    fn test_not_started_auction_rejected() {
        let now = Utc::now();
        let pending = auction_status(now, now + Duration::minutes(5), now + Duration::minutes(15));
        let err = validate_bid(cmd(Some("user_a"), Some(5.0)), &pending, 3.0, now).unwrap_err();
        assert_eq!(err.code(), "NOT_STARTED");
    }

    #[test]
    fn test_valid_bid_passes() {
        let now = Utc::now();
        let bid = validate_bid(cmd(Some("user_a"), Some(3.0)), &active_clock(now), 3.0, now)
            .expect("최소 금액과 같은 입찰은 허용");
        assert_eq!(bid.username, "user_a");
        assert_eq!(bid.bid_time, now);
    }
}
// endregion: --- Tests
