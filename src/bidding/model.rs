use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// 입찰 모델
// 한 출품작에 대한 한 사용자의 입찰 시도. (username, item_id)와 (item_id, bid_amount)는
// 유니크 인덱스로 보장된다.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Bid {
    pub id: i64,
    pub auction_id: String,
    pub item_id: String,
    pub username: String,
    pub user_uid: String,
    pub bid_amount: f64,
    /// active | winner | lost
    pub status: String,
    pub bid_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
