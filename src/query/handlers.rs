// region:    --- Imports
use super::queries;
use crate::database::DatabaseManager;
use crate::winner::WinnerRecord;
use serde::Serialize;
use sqlx::Error as SqlxError;
use tracing::info;

// endregion: --- Imports

// region:    --- Query Models
/// 출품작별 최고 입찰
#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct HighestBid {
    pub item_id: String,
    pub bid_amount: f64,
    pub username: String,
}
// endregion: --- Query Models

// region:    --- Query Handlers

/// 출품작별 최고 입찰 조회 (입찰이 있는 출품작만)
pub async fn get_highest_bids(
    db_manager: &DatabaseManager,
    auction_id: &str,
) -> Result<Vec<HighestBid>, SqlxError> {
    info!("{:<12} --> 최고 입찰 조회: {}", "Query", auction_id);
    let auction_id = auction_id.to_string();
    db_manager
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query_as::<_, HighestBid>(queries::GET_HIGHEST_BIDS)
                    .bind(auction_id)
                    .fetch_all(&mut **tx)
                    .await
            })
        })
        .await
}

/// 경매의 낙찰 기록 조회 (출품작 id 순)
pub async fn get_auction_winners(
    db_manager: &DatabaseManager,
    auction_id: &str,
) -> Result<Vec<WinnerRecord>, SqlxError> {
    info!("{:<12} --> 낙찰 기록 조회: {}", "Query", auction_id);
    let auction_id = auction_id.to_string();
    db_manager
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query_as::<_, WinnerRecord>(queries::GET_AUCTION_WINNERS)
                    .bind(auction_id)
                    .fetch_all(&mut **tx)
                    .await
            })
        })
        .await
}

/// 사용자의 낙찰 기록 조회
pub async fn get_user_wins(
    db_manager: &DatabaseManager,
    username: &str,
) -> Result<Vec<WinnerRecord>, SqlxError> {
    info!("{:<12} --> 사용자 낙찰 조회: {}", "Query", username);
    let username = username.to_string();
    db_manager
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query_as::<_, WinnerRecord>(queries::GET_USER_WINS)
                    .bind(username)
                    .fetch_all(&mut **tx)
                    .await
            })
        })
        .await
}

/// 기한이 남은 미결제 낙찰 기록 조회
pub async fn get_pending_payments(
    db_manager: &DatabaseManager,
) -> Result<Vec<WinnerRecord>, SqlxError> {
    info!("{:<12} --> 미결제 낙찰 조회", "Query");
    db_manager
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query_as::<_, WinnerRecord>(queries::GET_PENDING_PAYMENTS)
                    .fetch_all(&mut **tx)
                    .await
            })
        })
        .await
}

// endregion: --- Query Handlers
