/// 결제 완료 정산
/// 게이트웨이가 완료를 확정한 결제를 분류하고(구독/낙찰/기타) 해당 상태 전이를
/// 수행한다. 원격 결제는 이미 확정된 뒤이므로 조회 불일치는 소프트 실패로
/// 기록만 남기고 응답을 실패시키지 않는다.
// region:    --- Imports
use crate::auction::catalog;
use crate::config::AppConfig;
use crate::database::DatabaseManager;
use crate::error::AppError;
use crate::payment::gateway::PaymentDto;
use crate::query::queries;
use crate::winner::WinnerRecord;
use chrono::{Duration, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

// endregion: --- Imports

// region:    --- Payment Classification
/// 결제 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentKind {
    AuctionItem,
    Subscription,
    Unknown,
}

impl PaymentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuctionItem => "auction_item",
            Self::Subscription => "subscription",
            Self::Unknown => "unknown",
        }
    }
}

/// 결제 분류. 판별자는 우선순위 순서로 평가된다:
/// 낙찰 결제가 구독보다 먼저다 (금액이 구독 가격과 같아도 낙찰 메모가 있으면 낙찰).
pub fn classify(payment: &PaymentDto, subscription_price: f64, product_token: &str) -> PaymentKind {
    let memo = payment.memo.as_deref();
    let metadata = payment.metadata.as_ref();

    if is_auction_item_payment(memo, metadata) {
        return PaymentKind::AuctionItem;
    }
    if is_subscription_payment(payment.amount, memo, metadata, subscription_price, product_token) {
        return PaymentKind::Subscription;
    }
    PaymentKind::Unknown
}

/// 낙찰 결제 판별자: 메타데이터 type 또는 낙찰 메모 문구
pub fn is_auction_item_payment(memo: Option<&str>, metadata: Option<&Value>) -> bool {
    metadata_str(metadata, "type") == Some("auction_winner_payment")
        || memo_contains(memo, "won auction item")
        || memo_contains(memo, "auction item")
}

/// 구독 결제 판별자: 메타데이터 paymentType, 구독 메모 문구, 또는 고정 구독 가격
pub fn is_subscription_payment(
    amount: f64,
    memo: Option<&str>,
    metadata: Option<&Value>,
    subscription_price: f64,
    product_token: &str,
) -> bool {
    metadata_str(metadata, "paymentType") == Some("monthly_subscription")
        || memo_contains(memo, "subscription")
        || memo_contains(memo, "30-day")
        || memo_contains(memo, product_token)
        || amount == subscription_price
}

fn metadata_str<'a>(metadata: Option<&'a Value>, key: &str) -> Option<&'a str> {
    metadata.and_then(|m| m.get(key)).and_then(Value::as_str)
}

fn memo_contains(memo: Option<&str>, needle: &str) -> bool {
    memo.map(|m| m.to_lowercase().contains(&needle.to_lowercase()))
        .unwrap_or(false)
}

/// 메모에서 출품작 식별자 추출 (best-effort 복구 경로 전용)
pub fn parse_item_from_memo(memo: &str) -> Option<String> {
    // "You won auction item: item3" 형태가 우선
    if let Some((_, tail)) = memo.rsplit_once(':') {
        let candidate = tail.trim().trim_matches(|c: char| c.is_ascii_punctuation());
        if !candidate.is_empty() && !candidate.contains(char::is_whitespace) {
            return Some(candidate.to_string());
        }
    }
    // 콜론이 없으면 토큰에서 출품작 id 형태를 찾는다
    memo.split_whitespace()
        .map(|t| t.trim_matches(|c: char| c.is_ascii_punctuation()))
        .find(|t| {
            catalog::asset_for(t).is_some()
                || has_item_suffix(t, "item")
                || has_item_suffix(t, "art_piece")
        })
        .map(|t| t.to_string())
}

/// "item3", "art_piece_2"처럼 접두어 뒤에 식별 꼬리가 붙은 토큰만 인정한다.
/// 맨몸 "item" 단어는 출품작 식별자가 아니다.
fn has_item_suffix(token: &str, prefix: &str) -> bool {
    token
        .strip_prefix(prefix)
        .and_then(|rest| rest.chars().next())
        .map(|c| c.is_ascii_digit() || c == '_')
        .unwrap_or(false)
}
// endregion: --- Payment Classification

// region:    --- Reconciler
/// 정산 결과 요약
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileOutcome {
    pub kind: &'static str,
    pub winner_updated: bool,
    pub delivery_created: bool,
    pub subscription_created: bool,
    pub note: Option<String>,
}

/// 결제 완료 콜백 처리
pub async fn on_payment_completed(
    db_manager: &DatabaseManager,
    config: &AppConfig,
    payment_id: &str,
    tx_id: &str,
    payment: &PaymentDto,
) -> Result<ReconcileOutcome, AppError> {
    let (username, user_uid) = resolve_identity(payment);
    let kind = classify(
        payment,
        config.subscription_price,
        &config.subscription_product_token,
    );
    info!(
        "{:<12} --> 결제 분류: {} -> {} ({} Pi)",
        "Reconciler",
        payment_id,
        kind.as_str(),
        payment.amount
    );

    // 완료된 결제는 종류와 무관하게 기록한다
    sqlx::query(queries::INSERT_PAYMENT)
        .bind(payment_id)
        .bind(tx_id)
        .bind(&username)
        .bind(&user_uid)
        .bind(payment.amount)
        .bind(&payment.memo)
        .bind(kind.as_str())
        .bind(serde_json::to_value(payment).unwrap_or(Value::Null))
        .execute(db_manager.pool())
        .await?;

    let mut outcome = ReconcileOutcome {
        kind: kind.as_str(),
        winner_updated: false,
        delivery_created: false,
        subscription_created: false,
        note: None,
    };

    match kind {
        PaymentKind::AuctionItem => {
            settle_auction_payment(
                db_manager,
                config,
                payment_id,
                tx_id,
                payment,
                username.as_deref(),
                &mut outcome,
            )
            .await?;
        }
        PaymentKind::Subscription => {
            create_subscription(
                db_manager,
                payment_id,
                tx_id,
                payment.amount,
                username.as_deref(),
                user_uid.as_deref(),
                &mut outcome,
            )
            .await?;
        }
        PaymentKind::Unknown => {
            info!(
                "{:<12} --> 분류되지 않은 결제: 기록만 남김 ({})",
                "Reconciler", payment_id
            );
        }
    }

    log_activity(
        db_manager,
        username.as_deref(),
        "payment_completed",
        serde_json::json!({
            "paymentId": payment_id,
            "txId": tx_id,
            "kind": kind.as_str(),
            "amount": payment.amount,
        }),
    )
    .await;

    Ok(outcome)
}

/// 결제 페이로드에서 사용자 식별 정보 추출
fn resolve_identity(payment: &PaymentDto) -> (Option<String>, Option<String>) {
    let metadata = payment.metadata.as_ref();
    let username = payment
        .user
        .as_ref()
        .and_then(|u| u.username.clone())
        .or_else(|| metadata_str(metadata, "username").map(String::from));
    let user_uid = payment
        .user
        .as_ref()
        .and_then(|u| u.uid.clone())
        .or_else(|| metadata_str(metadata, "userUid").map(String::from))
        .or_else(|| payment.user_uid.clone());
    (username, user_uid)
}

/// 낙찰 결제 정산
/// 1차: 구조화 메타데이터의 출품작 식별자. 2차(복구 경로): 메모 파싱 후
/// (username, item_id, pending) 조회. 불일치는 소프트 실패.
async fn settle_auction_payment(
    db_manager: &DatabaseManager,
    config: &AppConfig,
    payment_id: &str,
    tx_id: &str,
    payment: &PaymentDto,
    username: Option<&str>,
    outcome: &mut ReconcileOutcome,
) -> Result<(), AppError> {
    let metadata = payment.metadata.as_ref();

    let updated: Option<WinnerRecord> = if let Some(item_id) = metadata_str(metadata, "itemId") {
        let auction_id = metadata_str(metadata, "auctionId").unwrap_or(&config.auction_id);
        mark_winner_paid(
            db_manager,
            auction_id,
            item_id,
            payment_id,
            Some(tx_id),
            Some(payment.amount),
        )
        .await?
    } else if let (Some(memo), Some(username)) = (payment.memo.as_deref(), username) {
        match parse_item_from_memo(memo) {
            Some(item_id) => {
                warn!(
                    "{:<12} --> 메타데이터에 출품작 식별자 없음: 메모 파싱 복구 경로 사용 ({})",
                    "Reconciler", item_id
                );
                sqlx::query_as::<_, WinnerRecord>(queries::MARK_WINNER_PAID_BY_USER_ITEM)
                    .bind(username)
                    .bind(&item_id)
                    .bind(payment_id)
                    .bind(tx_id)
                    .bind(payment.amount)
                    .fetch_optional(db_manager.pool())
                    .await?
            }
            None => {
                warn!(
                    "{:<12} --> 메모에서 출품작 식별자를 찾지 못함: {:?}",
                    "Reconciler", memo
                );
                None
            }
        }
    } else {
        None
    };

    match updated {
        Some(record) => {
            create_delivery_record(db_manager, &record).await?;
            outcome.winner_updated = true;
            outcome.delivery_created = true;
            info!(
                "{:<12} --> 낙찰 결제 처리 완료: {}/{} ({})",
                "Reconciler", record.auction_id, record.item_id, payment_id
            );
        }
        None => {
            warn!(
                "{:<12} --> 일치하는 pending 낙찰 기록 없음: {} (소프트 실패)",
                "Reconciler", payment_id
            );
            outcome.note = Some("일치하는 낙찰 기록을 찾지 못했습니다".to_string());
        }
    }
    Ok(())
}

/// (auction_id, item_id) 기준 pending -> paid 조건부 전환
pub async fn mark_winner_paid(
    db_manager: &DatabaseManager,
    auction_id: &str,
    item_id: &str,
    payment_id: &str,
    tx_id: Option<&str>,
    paid_amount: Option<f64>,
) -> Result<Option<WinnerRecord>, sqlx::Error> {
    sqlx::query_as::<_, WinnerRecord>(queries::MARK_WINNER_PAID_BY_ITEM)
        .bind(auction_id)
        .bind(item_id)
        .bind(payment_id)
        .bind(tx_id)
        .bind(paid_amount)
        .fetch_optional(db_manager.pool())
        .await
}

/// 수동(관리자) 낙찰 결제 정산
/// 정산 대상 기록이 없으면 하드 실패다 — 관리자 경로는 불일치를 숨기지 않는다.
pub async fn process_winner_payment(
    db_manager: &DatabaseManager,
    auction_id: &str,
    item_id: &str,
    payment_id: &str,
    tx_id: Option<&str>,
) -> Result<WinnerRecord, AppError> {
    let record = mark_winner_paid(db_manager, auction_id, item_id, payment_id, tx_id, None)
        .await?
        .ok_or_else(|| {
            AppError::conflict(
                "WINNER_NOT_FOUND",
                "결제 대기 중인 낙찰 기록을 찾을 수 없습니다.",
            )
        })?;
    create_delivery_record(db_manager, &record).await?;
    info!(
        "{:<12} --> 수동 낙찰 결제 처리: {}/{} ({})",
        "Reconciler", auction_id, item_id, payment_id
    );
    Ok(record)
}

/// paid 전환된 낙찰 기록에 대한 디지털 아트 전달 기록 생성
pub async fn create_delivery_record(
    db_manager: &DatabaseManager,
    record: &WinnerRecord,
) -> Result<(), sqlx::Error> {
    let payment_details = serde_json::json!({
        "paymentId": record.payment_id,
        "txId": record.tx_id,
        "paidAmount": record.paid_amount,
        "paidAt": record.paid_at,
    });
    let digital_asset = catalog::asset_for(&record.item_id)
        .map(|a| serde_json::to_value(a).unwrap_or(Value::Null))
        .unwrap_or_else(|| {
            serde_json::json!({
                "itemId": record.item_id,
                "title": "Unknown Artwork",
                "artist": "Hanoi Boi",
            })
        });

    sqlx::query(queries::INSERT_DELIVERY)
        .bind(record.id)
        .bind(&record.winner_username)
        .bind(&record.winner_user_uid)
        .bind(&record.item_id)
        .bind(&record.auction_id)
        .bind(payment_details)
        .bind(digital_asset)
        .execute(db_manager.pool())
        .await?;

    info!(
        "{:<12} --> 디지털 아트 전달 기록 생성: {} -> {}",
        "Reconciler", record.item_id, record.winner_username
    );
    Ok(())
}

/// 구독 결제 처리: 30일 구독 생성 및 프로필 구독 요약 갱신
async fn create_subscription(
    db_manager: &DatabaseManager,
    payment_id: &str,
    tx_id: &str,
    amount: f64,
    username: Option<&str>,
    user_uid: Option<&str>,
    outcome: &mut ReconcileOutcome,
) -> Result<(), AppError> {
    let Some(username) = username else {
        warn!(
            "{:<12} --> 구독 결제에 사용자 식별 정보 없음: {} (소프트 실패)",
            "Reconciler", payment_id
        );
        outcome.note = Some("구독 결제에 사용자 정보가 없습니다".to_string());
        return Ok(());
    };

    let start_date = Utc::now();
    let end_date = start_date + Duration::days(30);

    sqlx::query(queries::INSERT_SUBSCRIPTION)
        .bind(username)
        .bind(user_uid.unwrap_or_default())
        .bind(start_date)
        .bind(end_date)
        .bind(payment_id)
        .bind(tx_id)
        .bind(amount)
        .execute(db_manager.pool())
        .await?;

    sqlx::query(queries::UPSERT_PROFILE_SUBSCRIPTION)
        .bind(username)
        .bind(user_uid.unwrap_or_default())
        .bind(amount)
        .bind(end_date)
        .execute(db_manager.pool())
        .await?;

    outcome.subscription_created = true;
    info!(
        "{:<12} --> 구독 생성: {} (만료 {})",
        "Reconciler", username, end_date
    );
    Ok(())
}

/// 전달 기록 접근 로그 추가. 첫 접근 시 delivery_status가 ready -> delivered로
/// 전진하며 되돌아가지 않는다. 기록이 없으면 None.
pub async fn record_delivery_access(
    db_manager: &DatabaseManager,
    username: &str,
    item_id: &str,
    ip_address: Option<&str>,
    user_agent: Option<&str>,
) -> Result<Option<String>, sqlx::Error> {
    let entry = serde_json::json!([{
        "accessedAt": Utc::now(),
        "ip": ip_address,
        "userAgent": user_agent,
    }]);
    sqlx::query_scalar::<_, String>(queries::RECORD_DELIVERY_ACCESS)
        .bind(username)
        .bind(item_id)
        .bind(entry)
        .fetch_optional(db_manager.pool())
        .await
}

/// 사용자 활동 기록. 관측용 쓰기이므로 실패해도 본 작업을 막지 않는다.
pub async fn log_activity(
    db_manager: &DatabaseManager,
    username: Option<&str>,
    activity: &str,
    detail: Value,
) {
    if let Err(e) = sqlx::query(queries::INSERT_ACTIVITY)
        .bind(username)
        .bind(activity)
        .bind(detail)
        .execute(db_manager.pool())
        .await
    {
        warn!("{:<12} --> 활동 기록 실패 (무시): {:?}", "Reconciler", e);
    }
}
// endregion: --- Reconciler

// endregion: --- Tests
