/// 낙찰자 결정 및 결제 마감 관리
/// 1. 낙찰자 계산: 출품작별 최고 입찰 선정 후 낙찰 기록 upsert
/// 2. 마감 스위퍼: 기한이 지난 미결제 낙찰 기록을 expired로 전환
// region:    --- Imports
use crate::bidding::model::Bid;
use crate::database::DatabaseManager;
use crate::error::AppError;
use crate::query::queries;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::info;

// endregion: --- Imports

// region:    --- Winner Model
/// 낙찰 후 결제 완료까지의 유예 시간
pub const PAYMENT_WINDOW_HOURS: i64 = 48;

/// 낙찰 기록
/// (auction_id, item_id) 유니크. payment_status는 pending에서 paid 또는 expired로만
/// 전환되며 되돌아가지 않는다.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct WinnerRecord {
    pub id: i64,
    pub auction_id: String,
    pub item_id: String,
    pub winner_username: String,
    pub winner_user_uid: String,
    pub winning_bid: f64,
    pub winning_timestamp: DateTime<Utc>,
    pub auction_end_time: DateTime<Utc>,
    /// pending | paid | expired | failed
    pub payment_status: String,
    pub payment_deadline: DateTime<Utc>,
    pub payment_id: Option<String>,
    pub tx_id: Option<String>,
    pub paid_amount: Option<f64>,
    pub paid_at: Option<DateTime<Utc>>,
    pub expired_at: Option<DateTime<Utc>>,
    pub digital_art_status: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// 낙찰 요약 (계산 응답용)
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct WinnerSummary {
    pub item_id: String,
    pub winner: String,
    pub winning_bid: f64,
}

/// 낙찰자 계산 결과
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct WinnerCalculation {
    pub winners_count: usize,
    pub winners: Vec<WinnerSummary>,
}
// endregion: --- Winner Model

// region:    --- Winner Calculator
/// 출품작별 최고 입찰 선정 (순수)
/// 엄격히 더 큰 금액만 현재 최고를 교체한다. 같은 금액이면 먼저 본 입찰이 유지되는데,
/// (item_id, bid_amount) 유니크 제약 하에서는 도달할 수 없는 경우다.
pub fn select_highest_bids(bids: &[Bid]) -> Vec<&Bid> {
    let mut by_item: HashMap<&str, &Bid> = HashMap::new();
    for bid in bids {
        match by_item.get(bid.item_id.as_str()) {
            Some(current) if bid.bid_amount <= current.bid_amount => {}
            _ => {
                by_item.insert(bid.item_id.as_str(), bid);
            }
        }
    }
    let mut winners: Vec<&Bid> = by_item.into_values().collect();
    winners.sort_by(|a, b| a.item_id.cmp(&b.item_id));
    winners
}

/// 낙찰자 계산
/// 재실행에 안전하다: upsert는 payment_status가 pending인 기록만 갱신하므로
/// 이미 paid/expired인 낙찰 기록을 되돌리지 않는다. 출품작별 쓰기는 독립이며
/// 전체 롤백을 보장하지 않는다.
pub async fn compute_winners(
    db_manager: &DatabaseManager,
    auction_id: &str,
) -> Result<WinnerCalculation, AppError> {
    info!("{:<12} --> 낙찰자 계산 시작: {}", "Winner", auction_id);

    // 입찰 시각 오름차순: 동률이면 먼저 스캔된(이른) 입찰이 이긴다
    let bids: Vec<Bid> = sqlx::query_as(queries::GET_ACTIVE_BIDS)
        .bind(auction_id)
        .fetch_all(db_manager.pool())
        .await?;
    info!(
        "{:<12} --> {}건의 활성 입찰 조회됨: {}",
        "Winner",
        bids.len(),
        auction_id
    );

    let winning_bids = select_highest_bids(&bids);

    let auction_end_time = Utc::now();
    let payment_deadline = auction_end_time + Duration::hours(PAYMENT_WINDOW_HOURS);

    let mut winners = Vec::with_capacity(winning_bids.len());
    for bid in winning_bids {
        sqlx::query(queries::UPSERT_WINNER)
            .bind(auction_id)
            .bind(&bid.item_id)
            .bind(&bid.username)
            .bind(&bid.user_uid)
            .bind(bid.bid_amount)
            .bind(bid.bid_time)
            .bind(auction_end_time)
            .bind(payment_deadline)
            .execute(db_manager.pool())
            .await?;

        // 입찰 상태 전환: 낙찰 입찰은 winner, 같은 출품작의 나머지 활성 입찰은 lost
        sqlx::query(queries::MARK_LOSING_BIDS)
            .bind(auction_id)
            .bind(&bid.item_id)
            .bind(bid.id)
            .execute(db_manager.pool())
            .await?;
        sqlx::query(queries::MARK_WINNING_BID)
            .bind(bid.id)
            .execute(db_manager.pool())
            .await?;

        info!(
            "{:<12} --> 낙찰: {} - {} ({} Pi)",
            "Winner", bid.item_id, bid.username, bid.bid_amount
        );
        winners.push(WinnerSummary {
            item_id: bid.item_id.clone(),
            winner: bid.username.clone(),
            winning_bid: bid.bid_amount,
        });
    }

    info!(
        "{:<12} --> 낙찰 기록 {}건 생성 완료: {}",
        "Winner",
        winners.len(),
        auction_id
    );

    Ok(WinnerCalculation {
        winners_count: winners.len(),
        winners,
    })
}
// endregion: --- Winner Calculator

// region:    --- Deadline Sweeper
/// 결제 마감 스위퍼
/// pending이면서 기한이 지난 낙찰 기록을 expired로 전환하고 전환 건수를 반환한다.
/// 조건부 갱신이므로 멱등하며, 결제 완료 처리와 동시에 실행되어도 안전하다
/// (패자의 갱신은 0건에 매칭되어 no-op).
pub async fn sweep_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(queries::EXPIRE_OVERDUE_WINNERS)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
// endregion: --- Deadline Sweeper

// endregion: --- Tests
