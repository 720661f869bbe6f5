/// 결제 마감 스케줄러
/// 기한이 지난 미결제 낙찰 기록을 주기적으로 만료 처리한다.
/// 같은 전환은 POST /mark-expired-payments 로 수동 실행할 수도 있다.
// region:    --- Imports
use crate::winner;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{debug, error, info};

// endregion: --- Imports

// region:    --- Payment Deadline Scheduler
/// 결제 마감 스케줄러
pub struct PaymentDeadlineScheduler {
    pool: Arc<PgPool>,
    interval_secs: u64,
}

impl PaymentDeadlineScheduler {
    pub fn new(pool: Arc<PgPool>, interval_secs: u64) -> Self {
        Self {
            pool,
            interval_secs,
        }
    }

    /// 스케줄러 시작
    pub async fn start(&self) {
        let pool = Arc::clone(&self.pool);
        let mut tick = interval(Duration::from_secs(self.interval_secs));
        tokio::spawn(async move {
            loop {
                tick.tick().await;
                match winner::sweep_expired(&pool).await {
                    Ok(0) => {
                        debug!("{:<12} --> 만료된 미결제 낙찰 없음", "Scheduler");
                    }
                    Ok(count) => {
                        info!(
                            "{:<12} --> 미결제 낙찰 {}건 만료 처리",
                            "Scheduler", count
                        );
                    }
                    Err(e) => {
                        error!(
                            "{:<12} --> 결제 마감 처리 중 오류 발생: {:?}",
                            "Scheduler", e
                        );
                    }
                }
            }
        });
    }
}
// endregion: --- Payment Deadline Scheduler
