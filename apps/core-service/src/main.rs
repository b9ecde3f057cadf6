//! # Core Service サーバー
//!
//! SIMAWA のワークフロー（活動・公文書・LPJ）を実行する内部サービス。
//!
//! ## 役割
//!
//! - **ビジネスロジック**: スコープ付きロールによる認可と 3 種類のワークフロー
//! - **データ永続化**: PostgreSQL へのエンティティ保存
//! - **定期処理**: 活動リマインダーと終了した活動の完了
//!
//! ## 環境変数
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `CORE_HOST` | No | バインドアドレス（デフォルト: `0.0.0.0`） |
//! | `CORE_PORT` | **Yes** | ポート番号 |
//! | `DATABASE_URL` | **Yes** | PostgreSQL 接続 URL |
//! | `REMINDER_INTERVAL_HOURS` | No | リマインダー処理の実行間隔（デフォルト: 12） |
//! | `REMINDER_ENABLED` | No | リマインダー処理を起動するか（デフォルト: `true`） |
//! | `LOG_FORMAT` | No | `json` で JSON 形式のログを出力 |
//!
//! ## 起動方法
//!
//! ```bash
//! CORE_PORT=13001 DATABASE_URL=postgres://... cargo run -p simawa-core-service
//! ```

use std::{net::SocketAddr, sync::Arc};

use axum::{Router, routing::get};
use simawa_core_service::{
    config::CoreConfig,
    handler::{ReadinessState, health_check, readiness_check},
    usecase::{
        ActivityUseCase,
        AuthorizationResolver,
        NotificationService,
        ReminderSweep,
        TransitionEngine,
        spawn_reminder_worker,
    },
};
use simawa_domain::clock::{Clock, SystemClock};
use simawa_infra::{
    PgTransactionManager,
    db,
    repository::{
        ActivityRepository,
        PostgresActivityRepository,
        PostgresAuditLogRepository,
        PostgresHistoryRepository,
        PostgresNotificationRepository,
        PostgresOrganizationRepository,
        PostgresRoleRepository,
    },
};
use simawa_shared::observability::{TracingConfig, init_tracing};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Core Service サーバーのエントリーポイント
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env ファイルを読み込む（存在する場合）
    dotenvy::dotenv().ok();

    // トレーシング初期化
    init_tracing(&TracingConfig::from_env("simawa-core-service"));

    // 設定読み込み
    let config = CoreConfig::from_env()?;

    tracing::info!(
        "Core Service サーバーを起動します: {}:{}",
        config.host,
        config.port
    );

    // データベース接続プールを作成
    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("データベースに接続しました");

    db::run_migrations(&pool).await?;
    tracing::info!("マイグレーションを適用しました");

    let readiness_state = Arc::new(ReadinessState { pool: pool.clone() });

    // 依存コンポーネントを初期化
    let activity_repo: Arc<dyn ActivityRepository> =
        Arc::new(PostgresActivityRepository::new(pool.clone()));
    let history_repo = Arc::new(PostgresHistoryRepository::new(pool.clone()));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let resolver = Arc::new(AuthorizationResolver::new(
        Arc::new(PostgresRoleRepository::new(pool.clone())),
        Arc::new(PostgresOrganizationRepository::new(pool.clone())),
    ));
    let notifier = Arc::new(NotificationService::new(Arc::new(
        PostgresNotificationRepository::new(pool.clone()),
    )));
    let engine = Arc::new(TransitionEngine::new(
        resolver,
        Arc::new(PgTransactionManager::new(pool.clone())),
        history_repo.clone(),
        Arc::new(PostgresAuditLogRepository::new(pool.clone())),
        notifier.clone(),
        clock.clone(),
    ));

    let activity_usecase = Arc::new(ActivityUseCase::new(
        activity_repo.clone(),
        history_repo,
        engine,
    ));

    // リマインダー処理
    if config.reminder.enabled {
        let sweep = Arc::new(ReminderSweep::new(
            activity_repo,
            activity_usecase,
            notifier,
            clock,
        ));
        spawn_reminder_worker(sweep, config.reminder.interval);
        tracing::info!(
            "リマインダー処理を起動しました（間隔: {} 秒）",
            config.reminder.interval.as_secs()
        );
    }

    // ルーター構築
    let app = Router::new()
        .route("/health", get(health_check))
        .merge(
            Router::new()
                .route("/health/ready", get(readiness_check))
                .with_state(readiness_state),
        )
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Core Service サーバーが起動しました: {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
