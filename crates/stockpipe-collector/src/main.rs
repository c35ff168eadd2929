//! Standalone stock data collector CLI.

use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use stockpipe_collector::{config, modules, CollectorConfig};
use stockpipe_data::{StockDataRepository, YahooChartProvider};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "stockpipe-collector")]
#[command(about = "Stockpipe Daily Stock Data Collector", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// 일봉 데이터 1회 수집
    Collect {
        /// 특정 심볼만 수집 (쉼표로 구분, 예: "AAPL,MSFT")
        #[arg(long)]
        symbols: Option<String>,
    },

    /// 데몬 모드: 주기적으로 수집 실행
    Daemon,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // 로깅 초기화
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "stockpipe_collector={level},stockpipe_data={level}",
                    level = cli.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Stockpipe Data Collector 시작");

    // 설정 로드
    let config = CollectorConfig::from_env()?;
    tracing::debug!(symbols = config.symbols.len(), "설정 로드 완료");

    // DB 연결 (실패 시 어떤 심볼도 처리하기 전에 실행 전체 중단)
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&config.database_url)
        .await?;
    tracing::info!("데이터베이스 연결 성공");

    // 스키마 준비
    StockDataRepository::new(pool.clone()).ensure_schema().await?;

    let provider = YahooChartProvider::new();

    // 명령 실행
    match cli.command {
        Commands::Collect { symbols } => {
            let target = match symbols {
                Some(raw) => config::parse_symbol_list(&raw),
                None => config.symbols.clone(),
            };
            let window = config.fetch.resolve_window()?;

            let summary =
                modules::collect_prices(&pool, &provider, &config, &target, window).await?;
            summary.log_summary("일봉 수집");
        }
        Commands::Daemon => {
            tracing::info!(
                "=== 데몬 모드 시작 (주기: {}분) ===",
                config.daemon.interval_minutes
            );

            let mut interval = tokio::time::interval(config.daemon.interval());
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("종료 신호 수신, 데몬 종료 중...");
                        break;
                    }
                    _ = interval.tick() => {
                        tracing::info!("=== 수집 실행 시작 ===");

                        // 매 주기마다 범위를 다시 계산 (기본: 최근 N일)
                        match config.fetch.resolve_window() {
                            Ok(window) => {
                                match modules::collect_prices(
                                    &pool,
                                    &provider,
                                    &config,
                                    &config.symbols,
                                    window,
                                )
                                .await
                                {
                                    Ok(summary) => summary.log_summary("일봉 수집"),
                                    Err(e) => tracing::error!("수집 실행 실패: {}", e),
                                }
                            }
                            Err(e) => tracing::error!("수집 범위 계산 실패: {}", e),
                        }

                        tracing::info!(
                            "=== 수집 완료, 다음 실행: {}분 후 ===",
                            config.daemon.interval_minutes
                        );
                    }
                }
            }
        }
    }

    pool.close().await;
    tracing::info!("Stockpipe Data Collector 종료");

    Ok(())
}
