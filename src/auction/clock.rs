/// 경매 시계
/// 고정된 시작/종료 시각과 현재 시각만으로 경매 단계를 계산하는 순수 함수.
/// 부수 효과와 재시도 없음.
// region:    --- Imports
use chrono::{DateTime, Utc};
use serde::Serialize;

// endregion: --- Imports

// region:    --- Auction Clock
/// 경매 단계
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuctionPhase {
    NotStarted,
    Active,
    Ended,
}

impl AuctionPhase {
    /// 입찰 거부 시 사용하는 오류 코드
    pub fn rejection_code(&self) -> &'static str {
        match self {
            Self::NotStarted => "NOT_STARTED",
            Self::Active => "ACTIVE",
            Self::Ended => "ALREADY_ENDED",
        }
    }
}

/// 경매 상태 계산 결과
#[derive(Debug, Clone, Serialize)]
pub struct AuctionStatus {
    pub phase: AuctionPhase,
    pub message: &'static str,
    /// 시작 전이면 시작까지, 진행 중이면 종료까지 남은 시간. 종료 후에는 0.
    pub time_remaining_ms: i64,
}

impl AuctionStatus {
    pub fn is_active(&self) -> bool {
        self.phase == AuctionPhase::Active
    }
}

/// 경매 단계 계산. 종료 시각 경계는 종료 측에 포함된다(now == end ⇒ 종료).
pub fn auction_status(
    now: DateTime<Utc>,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
) -> AuctionStatus {
    if now < start_time {
        AuctionStatus {
            phase: AuctionPhase::NotStarted,
            message: "경매가 아직 시작되지 않았습니다.",
            time_remaining_ms: (start_time - now).num_milliseconds(),
        }
    } else if now >= end_time {
        AuctionStatus {
            phase: AuctionPhase::Ended,
            message: "경매가 이미 종료되었습니다.",
            time_remaining_ms: 0,
        }
    } else {
        AuctionStatus {
            phase: AuctionPhase::Active,
            message: "경매가 진행 중입니다.",
            time_remaining_ms: (end_time - now).num_milliseconds(),
        }
    }
}
// endregion: --- Auction Clock

// endregion: --- Tests
