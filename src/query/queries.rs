/// 사용자 입찰 존재 여부
pub const EXISTS_USER_BID: &str =
    "SELECT EXISTS(SELECT 1 FROM auction_bids WHERE username = $1 AND item_id = $2)";

/// 동일 금액 입찰 존재 여부
pub const EXISTS_AMOUNT_BID: &str =
    "SELECT EXISTS(SELECT 1 FROM auction_bids WHERE item_id = $1 AND bid_amount = $2)";

/// 입찰 삽입
pub const INSERT_BID: &str = r#"
    INSERT INTO auction_bids
        (auction_id, item_id, username, user_uid, bid_amount, status, bid_time, ip_address, user_agent)
    VALUES ($1, $2, $3, $4, $5, 'active', $6, $7, $8)
    RETURNING id
"#;

/// 경매의 활성 입찰 조회 (입찰 시각 오름차순)
pub const GET_ACTIVE_BIDS: &str = r#"
    SELECT id, auction_id, item_id, username, user_uid, bid_amount, status, bid_time, created_at
    FROM auction_bids
    WHERE auction_id = $1 AND status = 'active'
    ORDER BY bid_time ASC
"#;

/// 출품작별 최고 입찰 조회
pub const GET_HIGHEST_BIDS: &str = r#"
    SELECT DISTINCT ON (item_id) item_id, bid_amount, username
    FROM auction_bids
    WHERE auction_id = $1 AND status = 'active'
    ORDER BY item_id, bid_amount DESC
"#;

/// 낙찰 기록 upsert
/// pending 상태의 기존 기록만 덮어쓴다. paid/expired 기록은 재계산에도 보존된다.
pub const UPSERT_WINNER: &str = r#"
    INSERT INTO auction_winners
        (auction_id, item_id, winner_username, winner_user_uid, winning_bid,
         winning_timestamp, auction_end_time, payment_status, payment_deadline)
    VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending', $8)
    ON CONFLICT ON CONSTRAINT uq_winners_auction_item DO UPDATE SET
        winner_username = EXCLUDED.winner_username,
        winner_user_uid = EXCLUDED.winner_user_uid,
        winning_bid = EXCLUDED.winning_bid,
        winning_timestamp = EXCLUDED.winning_timestamp,
        auction_end_time = EXCLUDED.auction_end_time,
        payment_deadline = EXCLUDED.payment_deadline
    WHERE auction_winners.payment_status = 'pending'
"#;

/// 낙찰 입찰 상태 전환
pub const MARK_WINNING_BID: &str = "UPDATE auction_bids SET status = 'winner' WHERE id = $1";

/// 패찰 입찰 상태 전환
pub const MARK_LOSING_BIDS: &str = r#"
    UPDATE auction_bids SET status = 'lost'
    WHERE auction_id = $1 AND item_id = $2 AND status = 'active' AND id <> $3
"#;

/// 기한 경과 낙찰 기록 만료 처리 (조건부 갱신, 멱등)
pub const EXPIRE_OVERDUE_WINNERS: &str = r#"
    UPDATE auction_winners
    SET payment_status = 'expired', expired_at = now()
    WHERE payment_status = 'pending' AND payment_deadline < now()
"#;

/// 경매의 낙찰 기록 조회
pub const GET_AUCTION_WINNERS: &str = r#"
    SELECT id, auction_id, item_id, winner_username, winner_user_uid, winning_bid,
           winning_timestamp, auction_end_time, payment_status, payment_deadline,
           payment_id, tx_id, paid_amount, paid_at, expired_at, digital_art_status, created_at
    FROM auction_winners
    WHERE auction_id = $1
    ORDER BY item_id
"#;

/// 사용자의 낙찰 기록 조회 (최신순)
pub const GET_USER_WINS: &str = r#"
    SELECT id, auction_id, item_id, winner_username, winner_user_uid, winning_bid,
           winning_timestamp, auction_end_time, payment_status, payment_deadline,
           payment_id, tx_id, paid_amount, paid_at, expired_at, digital_art_status, created_at
    FROM auction_winners
    WHERE winner_username = $1
    ORDER BY created_at DESC
"#;

/// 기한이 남은 미결제 낙찰 기록 조회
pub const GET_PENDING_PAYMENTS: &str = r#"
    SELECT id, auction_id, item_id, winner_username, winner_user_uid, winning_bid,
           winning_timestamp, auction_end_time, payment_status, payment_deadline,
           payment_id, tx_id, paid_amount, paid_at, expired_at, digital_art_status, created_at
    FROM auction_winners
    WHERE payment_status = 'pending' AND payment_deadline >= now()
    ORDER BY payment_deadline
"#;

/// (auction_id, item_id) 기준 낙찰 기록 결제 완료 전환
/// pending 기록만 매칭하므로 마감 스위퍼와의 경합에서 한쪽만 성공한다.
pub const MARK_WINNER_PAID_BY_ITEM: &str = r#"
    UPDATE auction_winners
    SET payment_status = 'paid', payment_id = $3, tx_id = $4,
        paid_amount = COALESCE($5, winning_bid),
        paid_at = now(), digital_art_status = 'ready_for_delivery'
    WHERE auction_id = $1 AND item_id = $2 AND payment_status = 'pending'
    RETURNING id, auction_id, item_id, winner_username, winner_user_uid, winning_bid,
        winning_timestamp, auction_end_time, payment_status, payment_deadline,
        payment_id, tx_id, paid_amount, paid_at, expired_at, digital_art_status, created_at
"#;

/// (winner_username, item_id) 기준 낙찰 기록 결제 완료 전환 (메모 파싱 복구 경로)
pub const MARK_WINNER_PAID_BY_USER_ITEM: &str = r#"
    UPDATE auction_winners
    SET payment_status = 'paid', payment_id = $3, tx_id = $4,
        paid_amount = COALESCE($5, winning_bid),
        paid_at = now(), digital_art_status = 'ready_for_delivery'
    WHERE winner_username = $1 AND item_id = $2 AND payment_status = 'pending'
    RETURNING id, auction_id, item_id, winner_username, winner_user_uid, winning_bid,
        winning_timestamp, auction_end_time, payment_status, payment_deadline,
        payment_id, tx_id, paid_amount, paid_at, expired_at, digital_art_status, created_at
"#;

/// 디지털 아트 전달 기록 생성
pub const INSERT_DELIVERY: &str = r#"
    INSERT INTO digital_art_delivery
        (winner_id, username, user_uid, item_id, auction_id, delivery_status,
         payment_details, digital_asset)
    VALUES ($1, $2, $3, $4, $5, 'ready', $6, $7)
"#;

/// 전달 기록 접근 로그 추가 및 상태 전진 (ready -> delivered, 단조)
pub const RECORD_DELIVERY_ACCESS: &str = r#"
    UPDATE digital_art_delivery
    SET access_log = access_log || $3::jsonb,
        delivery_status = CASE WHEN delivery_status = 'ready' THEN 'delivered'
                               ELSE delivery_status END
    WHERE username = $1 AND item_id = $2
    RETURNING delivery_status
"#;

/// 구독 기록 생성
pub const INSERT_SUBSCRIPTION: &str = r#"
    INSERT INTO user_subscriptions
        (username, user_uid, subscription_type, start_date, end_date, payment_id, tx_id,
         status, pi_amount)
    VALUES ($1, $2, 'monthly', $3, $4, $5, $6, 'active', $7)
"#;

/// 사용자 프로필의 구독 요약 upsert
pub const UPSERT_PROFILE_SUBSCRIPTION: &str = r#"
    INSERT INTO user_profiles
        (username, user_uid, total_payments, total_amount_paid, last_payment,
         subscription_active, subscription_type, subscription_end_date)
    VALUES ($1, $2, 1, $3, now(), TRUE, 'monthly', $4)
    ON CONFLICT (username) DO UPDATE SET
        total_payments = user_profiles.total_payments + 1,
        total_amount_paid = user_profiles.total_amount_paid + EXCLUDED.total_amount_paid,
        last_payment = now(),
        subscription_active = TRUE,
        subscription_type = 'monthly',
        subscription_end_date = EXCLUDED.subscription_end_date,
        updated_at = now()
"#;

/// 완료 결제 기록 (payment_id 중복 시 no-op)
pub const INSERT_PAYMENT: &str = r#"
    INSERT INTO payments (payment_id, tx_id, username, user_uid, amount, memo, kind, payload)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
    ON CONFLICT (payment_id) DO NOTHING
"#;

/// 사용자 활동 기록 (best-effort)
pub const INSERT_ACTIVITY: &str =
    "INSERT INTO user_activities (username, activity, detail) VALUES ($1, $2, $3)";
