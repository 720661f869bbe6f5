// region:    --- Imports
use crate::auction::{catalog, clock};
use crate::bidding::commands::{handle_place_bid as command_place_bid, ClientInfo, PlaceBidCommand};
use crate::config::AppConfig;
use crate::database::DatabaseManager;
use crate::error::AppError;
use crate::payment::gateway::{PaymentGateway, PiGateway};
use crate::payment::reconciler;
use crate::query;
use crate::winner::{self, WinnerCalculation, WinnerSummary};
use axum::extract::{Path, State};
use axum::http::header::USER_AGENT;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

// endregion: --- Imports

/// 애플리케이션 상태
pub type AppState = (Arc<DatabaseManager>, Arc<PiGateway>, Arc<AppConfig>);

// region:    --- Request DTO
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovePaymentRequest {
    pub payment_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletePaymentRequest {
    pub payment_id: Option<String>,
    pub tx_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculateWinnersRequest {
    pub auction_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayAuctionWinRequest {
    pub auction_id: Option<String>,
    pub item_id: Option<String>,
    pub payment_id: Option<String>,
    pub tx_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryAccessRequest {
    pub username: Option<String>,
    pub item_id: Option<String>,
}

fn required(field: Option<String>, name: &str) -> Result<String, AppError> {
    match field {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::validation(
            "MISSING_FIELDS",
            format!("{name} 값이 필요합니다."),
        )),
    }
}

/// 감사 기록용 요청 메타데이터 추출
fn client_info(headers: &HeaderMap) -> ClientInfo {
    ClientInfo {
        ip_address: headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .map(String::from),
        user_agent: headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(String::from),
    }
}
// endregion: --- Request DTO

// region:    --- Payment Handlers

/// 결제 승인 프록시
pub async fn handle_approve_payment(
    State((_, gateway, _)): State<AppState>,
    Json(req): Json<ApprovePaymentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let payment_id = required(req.payment_id, "paymentId")?;
    info!("{:<12} --> 결제 승인 요청: {}", "Handler", payment_id);

    gateway.approve(&payment_id).await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "결제가 승인되었습니다.",
        "paymentId": payment_id,
    })))
}

/// 결제 완료 프록시 및 정산
/// 게이트웨이 확정이 먼저다. 게이트웨이 호출이 실패하면 로컬 상태는 변경되지 않는다.
pub async fn handle_complete_payment(
    State((db_manager, gateway, config)): State<AppState>,
    Json(req): Json<CompletePaymentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let payment_id = required(req.payment_id, "paymentId")?;
    let tx_id = required(req.tx_id, "txId")?;
    info!(
        "{:<12} --> 결제 완료 요청: {} (tx: {})",
        "Handler", payment_id, tx_id
    );

    let payment = gateway.complete(&payment_id, &tx_id).await?;
    let outcome =
        reconciler::on_payment_completed(&db_manager, &config, &payment_id, &tx_id, &payment)
            .await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "결제가 완료되었습니다.",
        "data": payment,
        "outcome": outcome,
    })))
}

/// 수동(관리자) 낙찰 결제 정산
pub async fn handle_pay_auction_win(
    State((db_manager, _, config)): State<AppState>,
    Json(req): Json<PayAuctionWinRequest>,
) -> Result<impl IntoResponse, AppError> {
    let item_id = required(req.item_id, "itemId")?;
    let payment_id = required(req.payment_id, "paymentId")?;
    let auction_id = req.auction_id.unwrap_or_else(|| config.auction_id.clone());

    let record = reconciler::process_winner_payment(
        &db_manager,
        &auction_id,
        &item_id,
        &payment_id,
        req.tx_id.as_deref(),
    )
    .await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "paymentId": payment_id,
        "winner": record,
    })))
}

// endregion: --- Payment Handlers

// region:    --- Bidding Handlers

/// 입찰 요청 처리
pub async fn handle_bid(
    State((db_manager, _, config)): State<AppState>,
    headers: HeaderMap,
    Json(cmd): Json<PlaceBidCommand>,
) -> Result<impl IntoResponse, AppError> {
    let placed = command_place_bid(cmd, client_info(&headers), &db_manager, &config).await?;

    reconciler::log_activity(
        &db_manager,
        Some(&placed.username),
        "bid_placed",
        serde_json::json!({ "bidId": placed.bid_id, "itemId": placed.item_id }),
    )
    .await;

    Ok(Json(serde_json::json!({
        "success": true,
        "bidId": placed.bid_id,
        "bidAmount": placed.bid_amount,
        "itemId": placed.item_id,
    })))
}

/// 경매 상태 조회
pub async fn handle_auction_status(
    State((_, _, config)): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let status = clock::auction_status(
        Utc::now(),
        config.auction_start_time,
        config.auction_end_time,
    );
    info!(
        "{:<12} --> 경매 상태 조회: {:?}",
        "HandlerQuery", status.phase
    );

    Ok(Json(serde_json::json!({
        "isActive": status.is_active(),
        "status": status.phase,
        "message": status.message,
        "auctionId": config.auction_id,
        "startTime": config.auction_start_time,
        "endTime": config.auction_end_time,
        "timeRemainingMs": status.time_remaining_ms,
    })))
}

/// 출품작별 최고 입찰가 조회
/// 입찰이 없는 출품작은 { bidAmount: 0, username: null } 센티널을 돌려준다.
pub async fn handle_highest_bids(
    State((db_manager, _, config)): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let highest = query::handlers::get_highest_bids(&db_manager, &config.auction_id).await?;

    let mut result = serde_json::Map::new();
    for item_id in catalog::item_ids() {
        let entry = match highest.iter().find(|b| b.item_id == item_id) {
            Some(bid) => serde_json::json!({
                "bidAmount": bid.bid_amount,
                "username": bid.username,
            }),
            None => serde_json::json!({ "bidAmount": 0, "username": null }),
        };
        result.insert(item_id.to_string(), entry);
    }

    Ok(Json(serde_json::Value::Object(result)))
}

// endregion: --- Bidding Handlers

// region:    --- Winner Handlers

/// 낙찰자 계산
/// 이미 낙찰 기록이 있으면 재계산 없이 기존 결과를 돌려준다
/// (반복 호출로 결제 기한이 밀리는 것을 방지).
pub async fn handle_calculate_winners(
    State((db_manager, _, config)): State<AppState>,
    Json(req): Json<CalculateWinnersRequest>,
) -> Result<impl IntoResponse, AppError> {
    let auction_id = req.auction_id.unwrap_or_else(|| config.auction_id.clone());

    let existing = query::handlers::get_auction_winners(&db_manager, &auction_id).await?;
    let calculation = if existing.is_empty() {
        winner::compute_winners(&db_manager, &auction_id).await?
    } else {
        info!(
            "{:<12} --> 기존 낙찰 기록 {}건 반환 (재계산 생략): {}",
            "Handler",
            existing.len(),
            auction_id
        );
        WinnerCalculation {
            winners_count: existing.len(),
            winners: existing
                .into_iter()
                .map(|w| WinnerSummary {
                    item_id: w.item_id,
                    winner: w.winner_username,
                    winning_bid: w.winning_bid,
                })
                .collect(),
        }
    };

    Ok(Json(serde_json::json!({
        "success": true,
        "auctionId": auction_id,
        "winnersCount": calculation.winners_count,
        "winners": calculation.winners,
    })))
}

/// 사용자 낙찰 조회
pub async fn handle_user_wins(
    State((db_manager, _, _)): State<AppState>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let wins = query::handlers::get_user_wins(&db_manager, &username).await?;
    Ok(Json(wins))
}

/// 미결제 낙찰 조회
pub async fn handle_pending_payments(
    State((db_manager, _, _)): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let pending = query::handlers::get_pending_payments(&db_manager).await?;
    Ok(Json(pending))
}

/// 기한 경과 미결제 낙찰 만료 처리 (수동 트리거)
pub async fn handle_mark_expired_payments(
    State((db_manager, _, _)): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let count = winner::sweep_expired(db_manager.pool()).await?;
    info!(
        "{:<12} --> 미결제 낙찰 {}건 만료 처리 (수동)",
        "Handler", count
    );
    Ok(Json(serde_json::json!({
        "success": true,
        "expiredCount": count,
    })))
}

// endregion: --- Winner Handlers

// region:    --- Delivery Handlers

/// 디지털 아트 접근 기록
pub async fn handle_delivery_access(
    State((db_manager, _, _)): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<DeliveryAccessRequest>,
) -> Result<impl IntoResponse, AppError> {
    let username = required(req.username, "username")?;
    let item_id = required(req.item_id, "itemId")?;
    let client = client_info(&headers);

    let delivery_status = reconciler::record_delivery_access(
        &db_manager,
        &username,
        &item_id,
        client.ip_address.as_deref(),
        client.user_agent.as_deref(),
    )
    .await?
    .ok_or_else(|| {
        AppError::conflict("DELIVERY_NOT_FOUND", "전달 기록을 찾을 수 없습니다.")
    })?;

    Ok(Json(serde_json::json!({
        "success": true,
        "deliveryStatus": delivery_status,
    })))
}

/// 헬스 체크
pub async fn handle_health(
    State((_, _, config)): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(serde_json::json!({
        "status": "Server is running",
        "timestamp": Utc::now(),
        "auctionId": config.auction_id,
        "piApiKeySet": !config.pi_api_key.is_empty(),
    })))
}

// endregion: --- Delivery Handlers
