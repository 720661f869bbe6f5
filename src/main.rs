// region:    --- Imports
use axum::{
    routing::{get, post},
    Router,
};
use pi_auction_service::config::AppConfig;
use pi_auction_service::database::DatabaseManager;
use pi_auction_service::handlers;
use pi_auction_service::payment::gateway::PiGateway;
use pi_auction_service::scheduler::PaymentDeadlineScheduler;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
// endregion: --- Imports

// region:    --- Main
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // logging 초기화
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .with_target(false)
        .init();

    // 설정 로드 (PI_API_KEY가 없으면 기동 실패)
    let config = match AppConfig::from_env() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            error!("{:<12} --> 설정 로드 실패: {}", "Main", e);
            return Err(e.into());
        }
    };

    // DatabaseManager 생성
    let db_manager = match DatabaseManager::new(&config.database_url).await {
        Ok(db_manager) => Arc::new(db_manager),
        Err(e) => {
            error!("{:<12} --> 데이터베이스 연결 실패: {:?}", "Main", e);
            return Err(e.into());
        }
    };

    // 스키마 초기화
    if let Err(e) = db_manager.initialize_database().await {
        error!("{:<12} --> 데이터베이스 초기화 실패: {:?}", "Main", e);
        return Err(e.into());
    }
    info!("{:<12} --> 데이터베이스 초기화 성공", "Main");

    // Pi 결제 게이트웨이 어댑터 생성
    let gateway = Arc::new(PiGateway::new(
        config.pi_api_url.clone(),
        config.pi_api_key.clone(),
    ));

    // 결제 마감 스케줄러 시작
    let scheduler =
        PaymentDeadlineScheduler::new(db_manager.get_pool(), config.sweep_interval_secs);
    scheduler.start().await;

    // 프론트엔드(Pi 브라우저)를 위한 cors 설정
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // 라우터 설정
    let routes_all = Router::new()
        .route("/approve-payment", post(handlers::handle_approve_payment))
        .route("/complete-payment", post(handlers::handle_complete_payment))
        .route("/place-bid", post(handlers::handle_bid))
        .route("/auction-status", get(handlers::handle_auction_status))
        .route("/highest-bids", get(handlers::handle_highest_bids))
        .route(
            "/calculate-winners",
            post(handlers::handle_calculate_winners),
        )
        .route("/user-wins/:username", get(handlers::handle_user_wins))
        .route("/pay-auction-win", post(handlers::handle_pay_auction_win))
        .route("/pending-payments", get(handlers::handle_pending_payments))
        .route(
            "/mark-expired-payments",
            post(handlers::handle_mark_expired_payments),
        )
        .route("/digital-art/access", post(handlers::handle_delivery_access))
        .route("/health", get(handlers::handle_health))
        .layer(cors)
        .with_state((db_manager, gateway, Arc::clone(&config)));

    // 리스너 생성
    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!(
        "{:<12} --> Web Server: Listening on {}",
        "Main",
        listener.local_addr()?
    );

    // 서버 실행
    if let Err(err) = axum::serve(listener, routes_all.into_make_service()).await {
        error!("{:<12} --> Server error: {}", "Main", err);
    }
    Ok(())
}
// endregion: --- Main
