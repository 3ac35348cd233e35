//! 日志初始化
//!
//! 本地环境仅输出控制台；其他环境按天滚动写入 info/error 两个日志文件

use std::sync::OnceLock;

use tracing::info;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

use crate::config::env_or_default;

// 全局保持日志文件句柄，防止guard被丢弃后日志丢失
static INFO_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
static ERROR_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

/// 设置日志
///
/// 环境变量：`APP_ENV`（local 时仅控制台）、`LOG_LEVEL`、`LOG_DIR`
pub fn setup_logging() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let app_env = env_or_default("APP_ENV", "local");
    let log_level = env_or_default("LOG_LEVEL", "info");
    let log_dir = env_or_default("LOG_DIR", "log_files");

    if app_env == "local" {
        Registry::default()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(false)
                    .with_file(true)
                    .with_line_number(true)
                    .with_writer(std::io::stdout)
                    .with_filter(EnvFilter::new(&log_level)),
            )
            .try_init()?;

        info!("Log configuration setup successfully!");
        return Ok(());
    }

    std::fs::create_dir_all(&log_dir)
        .map_err(|e| anyhow::anyhow!("Failed to create log directory '{}': {}", log_dir, e))?;

    let info_file = RollingFileAppender::new(Rotation::DAILY, &log_dir, "info.log");
    let error_file = RollingFileAppender::new(Rotation::DAILY, &log_dir, "error.log");

    let (info_non_blocking, info_guard) = tracing_appender::non_blocking(info_file);
    let (error_non_blocking, error_guard) = tracing_appender::non_blocking(error_file);

    // 保存guard到全局，防止被丢弃
    INFO_GUARD
        .set(info_guard)
        .map_err(|_| anyhow::anyhow!("Failed to set INFO_GUARD"))?;
    ERROR_GUARD
        .set(error_guard)
        .map_err(|_| anyhow::anyhow!("Failed to set ERROR_GUARD"))?;

    Registry::default()
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_file(true)
                .with_line_number(true)
                .with_writer(info_non_blocking)
                .with_filter(EnvFilter::new(&log_level)),
        )
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_file(true)
                .with_line_number(true)
                .with_writer(error_non_blocking)
                .with_filter(EnvFilter::new("error")),
        )
        .try_init()?;

    info!(
        "Log configuration setup successfully! Environment: {}, Log Level: {}",
        app_env, log_level
    );
    Ok(())
}
