use std::sync::Arc;

use spinwheel_backend::{
    AppError, AppResult,
    config::Config,
    database::{create_pool, run_migrations},
    logging::init_logging,
    services::QuantityLedger,
    store::{ParticipantLedgerStore, SeaOrmParticipantLedger, SeaOrmRewardInventory},
};

/// 运维入口:
/// - `migrate`（默认）: 执行数据库迁移
/// - `reset-daily`: 重置奖品当日发放数与参与者当日已用次数，供外部定时任务调用
#[tokio::main]
async fn main() {
    init_logging();

    if let Err(err) = run().await {
        err.log();
        std::process::exit(1);
    }
}

async fn run() -> AppResult<()> {
    // 加载配置
    let config = Config::from_toml()?;
    let database = config.database.as_ref().ok_or_else(|| {
        AppError::ConfigError("DATABASE_URL or [database] section is required".into())
    })?;

    // 创建数据库连接池
    let pool = create_pool(database).await?;

    // 运行数据库迁移
    run_migrations(&pool).await?;
    log::info!(
        "Spin policy: daily_spin_cap={}, max_commit_retries={}, weighting_mode={:?}",
        config.spin.daily_spin_cap,
        config.spin.max_commit_retries,
        config.spin.weighting_mode
    );

    let command = std::env::args().nth(1).unwrap_or_else(|| "migrate".into());
    match command.as_str() {
        "migrate" => {
            log::info!("Migrations applied");
        }
        "reset-daily" => {
            let ledger = QuantityLedger::new(Arc::new(SeaOrmRewardInventory::new(pool.clone())));
            let rewards = ledger.reset_all_daily().await?;
            let participants = SeaOrmParticipantLedger::new(pool).reset_all_daily().await?;
            log::info!("Daily reset: {rewards} rewards, {participants} participant events");
        }
        other => {
            return Err(AppError::ValidationError(format!(
                "Unknown command: {other} (expected migrate or reset-daily)"
            )));
        }
    }
    Ok(())
}
