//! 통합 테스트
//! 실행 중인 서버(localhost:3000)와 PostgreSQL이 필요하므로 기본 실행에서는
//! 제외된다: cargo test -- --ignored

use chrono::{DateTime, Duration, Utc};
use pi_auction_service::config::AppConfig;
use pi_auction_service::database::DatabaseManager;
use pi_auction_service::payment::gateway::{PaymentDto, PaymentUserDto};
use pi_auction_service::payment::reconciler;
use pi_auction_service::query;
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;

const BASE_URL: &str = "http://localhost:3000";

/// 데이터베이스 매니저 설정
async fn setup() -> Arc<DatabaseManager> {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    Arc::new(
        DatabaseManager::new(&database_url)
            .await
            .expect("Failed to connect"),
    )
}

/// 실행별로 겹치지 않는 테스트 사용자 이름 생성
fn test_username(prefix: &str) -> String {
    format!("{}_{}", prefix, Utc::now().timestamp_millis())
}

/// 정산 로직 직접 호출용 설정 (게이트웨이는 호출하지 않는다)
fn test_config(auction_id: &str) -> AppConfig {
    AppConfig {
        port: 0,
        database_url: String::new(),
        pi_api_key: "test_key".to_string(),
        pi_api_url: "http://localhost:0".to_string(),
        auction_id: auction_id.to_string(),
        auction_start_time: Utc::now(),
        auction_end_time: Utc::now() + Duration::minutes(10),
        min_bid_amount: 3.0,
        subscription_price: 1.0,
        subscription_product_token: "appraisells".to_string(),
        sweep_interval_secs: 60,
    }
}

/// 테스트용 입찰 직접 삽입 (서버 검증 우회)
async fn insert_test_bid(
    db_manager: &DatabaseManager,
    auction_id: &str,
    item_id: &str,
    username: &str,
    bid_amount: f64,
) {
    sqlx::query(
        "INSERT INTO auction_bids (auction_id, item_id, username, user_uid, bid_amount, status, bid_time)
         VALUES ($1, $2, $3, $4, $5, 'active', now())",
    )
    .bind(auction_id)
    .bind(item_id)
    .bind(username)
    .bind(format!("uid_{username}"))
    .bind(bid_amount)
    .execute(db_manager.pool())
    .await
    .expect("Failed to insert test bid");
}

/// 테스트용 낙찰 기록 직접 삽입
async fn insert_test_winner(
    db_manager: &DatabaseManager,
    auction_id: &str,
    item_id: &str,
    username: &str,
    payment_status: &str,
    deadline_offset: Duration,
) {
    sqlx::query(
        "INSERT INTO auction_winners
            (auction_id, item_id, winner_username, winner_user_uid, winning_bid,
             winning_timestamp, auction_end_time, payment_status, payment_deadline)
         VALUES ($1, $2, $3, $4, 15.0, now(), now(), $5, $6)",
    )
    .bind(auction_id)
    .bind(item_id)
    .bind(username)
    .bind(format!("uid_{username}"))
    .bind(payment_status)
    .bind(Utc::now() + deadline_offset)
    .execute(db_manager.pool())
    .await
    .expect("Failed to insert test winner");
}

/// 입찰 검증 순서 테스트: 최소 금액 -> 중복 입찰 -> 금액 중복
#[tokio::test]
#[ignore = "실행 중인 서버와 데이터베이스 필요"]
async fn test_place_bid_validations() {
    let client = Client::new();
    let user_a = test_username("bidder_a");
    let user_b = test_username("bidder_b");

    // 최소 금액 미달
    let response = client
        .post(format!("{BASE_URL}/place-bid"))
        .json(&json!({
            "username": user_a,
            "userUid": format!("uid_{user_a}"),
            "itemId": "art_piece_1",
            "bidAmount": 2.99
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "BELOW_MINIMUM");

    // 정상 입찰
    let response = client
        .post(format!("{BASE_URL}/place-bid"))
        .json(&json!({
            "username": user_a,
            "userUid": format!("uid_{user_a}"),
            "itemId": "art_piece_1",
            "bidAmount": 7.0
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["itemId"], "art_piece_1");

    // 입찰 활동 기록은 입찰자에게 귀속된다
    let db_manager = setup().await;
    let activity_user: Option<String> = sqlx::query_scalar(
        "SELECT username FROM user_activities WHERE activity = 'bid_placed' AND username = $1",
    )
    .bind(&user_a)
    .fetch_optional(db_manager.pool())
    .await
    .unwrap();
    assert_eq!(activity_user.as_deref(), Some(user_a.as_str()));

    // 같은 사용자의 같은 출품작 재입찰 거부 (금액 무관)
    let response = client
        .post(format!("{BASE_URL}/place-bid"))
        .json(&json!({
            "username": user_a,
            "userUid": format!("uid_{user_a}"),
            "itemId": "art_piece_1",
            "bidAmount": 20.0
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "ALREADY_BID");

    // 다른 사용자의 동일 금액 입찰 거부
    let response = client
        .post(format!("{BASE_URL}/place-bid"))
        .json(&json!({
            "username": user_b,
            "userUid": format!("uid_{user_b}"),
            "itemId": "art_piece_1",
            "bidAmount": 7.0
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "AMOUNT_TAKEN");

    // 7.01은 성공
    let response = client
        .post(format!("{BASE_URL}/place-bid"))
        .json(&json!({
            "username": user_b,
            "userUid": format!("uid_{user_b}"),
            "itemId": "art_piece_1",
            "bidAmount": 7.01
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
}

/// 경매 상태 조회 테스트
#[tokio::test]
#[ignore = "실행 중인 서버와 데이터베이스 필요"]
async fn test_auction_status() {
    let client = Client::new();
    let response = client
        .get(format!("{BASE_URL}/auction-status"))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.unwrap();
    assert!(body["auctionId"].is_string());
    assert!(body["timeRemainingMs"].is_number());
    assert!(matches!(
        body["status"].as_str(),
        Some("not_started") | Some("active") | Some("ended")
    ));
}

/// 최고 입찰가 조회: 입찰 없는 출품작은 0/null 센티널
#[tokio::test]
#[ignore = "실행 중인 서버와 데이터베이스 필요"]
async fn test_highest_bids_sentinel() {
    let client = Client::new();
    let response = client
        .get(format!("{BASE_URL}/highest-bids"))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.unwrap();
    for item_id in [
        "art_piece_1",
        "art_piece_2",
        "art_piece_3",
        "art_piece_4",
        "art_piece_5",
    ] {
        assert!(body[item_id]["bidAmount"].is_number(), "item: {item_id}");
    }
}

/// 낙찰자 계산 테스트: 최고가 선정 및 재호출 시 기존 결과 반환
#[tokio::test]
#[ignore = "실행 중인 서버와 데이터베이스 필요"]
async fn test_calculate_winners_idempotent() {
    let db_manager = setup().await;
    let client = Client::new();

    // 전용 경매 id로 다른 테스트와 격리
    let auction_id = format!("test_auction_{}", Utc::now().timestamp_millis());
    let user_low = test_username("calc_low");
    let user_high = test_username("calc_high");
    let user_mid = test_username("calc_mid");

    insert_test_bid(&db_manager, &auction_id, "art_piece_1", &user_low, 5.0).await;
    insert_test_bid(&db_manager, &auction_id, "art_piece_1", &user_high, 7.0).await;
    insert_test_bid(&db_manager, &auction_id, "art_piece_1", &user_mid, 3.0).await;

    let response = client
        .post(format!("{BASE_URL}/calculate-winners"))
        .json(&json!({ "auctionId": auction_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["winnersCount"], 1);
    assert_eq!(body["winners"][0]["winner"], user_high.as_str());
    assert_eq!(body["winners"][0]["winningBid"], 7.0);

    // 낙찰 기록 확인 (pending + 마감 시한 존재)
    let wins = query::handlers::get_user_wins(&db_manager, &user_high)
        .await
        .unwrap();
    assert_eq!(wins.len(), 1);
    assert_eq!(wins[0].payment_status, "pending");
    assert!(wins[0].payment_deadline > Utc::now() + Duration::hours(47));

    // 재호출은 재계산 없이 동일한 결과를 돌려준다
    let response = client
        .post(format!("{BASE_URL}/calculate-winners"))
        .json(&json!({ "auctionId": auction_id }))
        .send()
        .await
        .expect("Failed to send request");
    let body2: Value = response.json().await.unwrap();
    assert_eq!(body2["winnersCount"], 1);
    assert_eq!(body2["winners"][0]["winner"], user_high.as_str());

    let wins_after = query::handlers::get_user_wins(&db_manager, &user_high)
        .await
        .unwrap();
    assert_eq!(wins_after[0].payment_deadline, wins[0].payment_deadline);
}

/// 마감 스위퍼 테스트: 기한 경과 pending만 expired로 전환
#[tokio::test]
#[ignore = "실행 중인 서버와 데이터베이스 필요"]
async fn test_mark_expired_payments() {
    let db_manager = setup().await;
    let client = Client::new();

    let auction_id = format!("test_sweep_{}", Utc::now().timestamp_millis());
    let overdue_user = test_username("sweep_overdue");
    let paid_user = test_username("sweep_paid");

    // 기한이 지난 pending 기록과, 같은 기한의 paid 기록
    insert_test_winner(
        &db_manager,
        &auction_id,
        "art_piece_1",
        &overdue_user,
        "pending",
        Duration::milliseconds(-1),
    )
    .await;
    insert_test_winner(
        &db_manager,
        &auction_id,
        "art_piece_2",
        &paid_user,
        "paid",
        Duration::milliseconds(-1),
    )
    .await;

    let response = client
        .post(format!("{BASE_URL}/mark-expired-payments"))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let body: Value = response.json().await.unwrap();
    assert!(body["expiredCount"].as_u64().unwrap() >= 1);

    let overdue = query::handlers::get_user_wins(&db_manager, &overdue_user)
        .await
        .unwrap();
    assert_eq!(overdue[0].payment_status, "expired");
    assert!(overdue[0].expired_at.is_some());

    // paid 기록은 건드리지 않는다
    let paid = query::handlers::get_user_wins(&db_manager, &paid_user)
        .await
        .unwrap();
    assert_eq!(paid[0].payment_status, "paid");
}

/// 정산 메모 복구 경로 테스트: 메타데이터에 출품작 식별자가 없어도
/// 메모 파싱으로 (username, item_id) pending 기록을 찾아 paid 전환
#[tokio::test]
#[ignore = "데이터베이스 필요"]
async fn test_reconcile_auction_payment_by_memo() {
    let db_manager = setup().await;

    let auction_id = format!("test_memo_{}", Utc::now().timestamp_millis());
    let username = test_username("memo_winner");
    insert_test_winner(
        &db_manager,
        &auction_id,
        "item3",
        &username,
        "pending",
        Duration::hours(48),
    )
    .await;

    let config = test_config(&auction_id);
    let payment_id = format!("test_memo_pay_{}", Utc::now().timestamp_millis());
    let payment = PaymentDto {
        amount: 15.0,
        memo: Some("You won auction item: item3".to_string()),
        user: Some(PaymentUserDto {
            username: Some(username.clone()),
            uid: Some(format!("uid_{username}")),
        }),
        ..Default::default()
    };

    let outcome =
        reconciler::on_payment_completed(&db_manager, &config, &payment_id, "tx_memo_1", &payment)
            .await
            .expect("Failed to reconcile payment");
    assert_eq!(outcome.kind, "auction_item");
    assert!(outcome.winner_updated);
    assert!(outcome.delivery_created);

    let wins = query::handlers::get_user_wins(&db_manager, &username)
        .await
        .unwrap();
    assert_eq!(wins[0].payment_status, "paid");
    assert_eq!(wins[0].payment_id.as_deref(), Some(payment_id.as_str()));
    assert_eq!(wins[0].paid_amount, Some(15.0));
    assert_eq!(
        wins[0].digital_art_status.as_deref(),
        Some("ready_for_delivery")
    );

    // 전달 기록이 ready 상태로 생성된다
    let delivery_status: String = sqlx::query_scalar(
        "SELECT delivery_status FROM digital_art_delivery WHERE username = $1 AND item_id = 'item3'",
    )
    .bind(&username)
    .fetch_one(db_manager.pool())
    .await
    .unwrap();
    assert_eq!(delivery_status, "ready");
}

/// 구독 결제 정산 테스트: 30일 구독 생성 및 프로필 갱신
#[tokio::test]
#[ignore = "데이터베이스 필요"]
async fn test_reconcile_subscription_payment() {
    let db_manager = setup().await;

    let username = test_username("sub_user");
    let config = test_config("auction_1");
    let payment_id = format!("test_sub_pay_{}", Utc::now().timestamp_millis());
    let payment = PaymentDto {
        amount: 1.0,
        memo: Some("Monthly subscription to Appraisells".to_string()),
        user: Some(PaymentUserDto {
            username: Some(username.clone()),
            uid: Some(format!("uid_{username}")),
        }),
        ..Default::default()
    };

    let before = Utc::now();
    let outcome =
        reconciler::on_payment_completed(&db_manager, &config, &payment_id, "tx_sub_1", &payment)
            .await
            .expect("Failed to reconcile payment");
    assert_eq!(outcome.kind, "subscription");
    assert!(outcome.subscription_created);

    // 구독 기간은 30일
    let (end_date, status): (DateTime<Utc>, String) =
        sqlx::query_as("SELECT end_date, status FROM user_subscriptions WHERE payment_id = $1")
            .bind(&payment_id)
            .fetch_one(db_manager.pool())
            .await
            .unwrap();
    assert_eq!(status, "active");
    assert!(end_date >= before + Duration::days(30));
    assert!(end_date <= Utc::now() + Duration::days(30));

    // 프로필 구독 요약 갱신
    let subscription_active: bool =
        sqlx::query_scalar("SELECT subscription_active FROM user_profiles WHERE username = $1")
            .bind(&username)
            .fetch_one(db_manager.pool())
            .await
            .unwrap();
    assert!(subscription_active);

    // 완료 결제는 종류와 무관하게 payments에 기록된다
    let kind: String = sqlx::query_scalar("SELECT kind FROM payments WHERE payment_id = $1")
        .bind(&payment_id)
        .fetch_one(db_manager.pool())
        .await
        .unwrap();
    assert_eq!(kind, "subscription");
}

/// 수동 낙찰 결제 정산 테스트: pending -> paid 전환 및 전달 기록 생성
#[tokio::test]
#[ignore = "실행 중인 서버와 데이터베이스 필요"]
async fn test_pay_auction_win() {
    let db_manager = setup().await;
    let client = Client::new();

    let auction_id = format!("test_pay_{}", Utc::now().timestamp_millis());
    let username = test_username("pay_winner");
    insert_test_winner(
        &db_manager,
        &auction_id,
        "art_piece_2",
        &username,
        "pending",
        Duration::hours(48),
    )
    .await;

    let payment_id = format!("test_payment_{}", Utc::now().timestamp_millis());
    let response = client
        .post(format!("{BASE_URL}/pay-auction-win"))
        .json(&json!({
            "auctionId": auction_id,
            "itemId": "art_piece_2",
            "paymentId": payment_id,
            "txId": "test_tx_1"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let wins = query::handlers::get_user_wins(&db_manager, &username)
        .await
        .unwrap();
    assert_eq!(wins[0].payment_status, "paid");
    assert_eq!(wins[0].payment_id.as_deref(), Some(payment_id.as_str()));
    assert_eq!(wins[0].digital_art_status.as_deref(), Some("ready_for_delivery"));

    // 전달 기록이 ready 상태로 생성되고, 첫 접근 시 delivered로 전진한다
    let response = client
        .post(format!("{BASE_URL}/digital-art/access"))
        .json(&json!({ "username": username, "itemId": "art_piece_2" }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["deliveryStatus"], "delivered");

    // 같은 낙찰 기록을 다시 정산하려 하면 충돌
    let response = client
        .post(format!("{BASE_URL}/pay-auction-win"))
        .json(&json!({
            "auctionId": auction_id,
            "itemId": "art_piece_2",
            "paymentId": "another_payment",
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "WINNER_NOT_FOUND");
}
