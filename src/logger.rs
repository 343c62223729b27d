//! 日志初始化（tracing）
//!
//! 通过 `RUST_LOG` 控制输出，例如 `RUST_LOG=water_tracker=trace`。

use once_cell::sync::Lazy;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_FILTER: &str = "water_tracker=debug,warn";

/// 安装全局 subscriber，重复调用无副作用
pub fn init_logger() {
    static INIT: Lazy<()> = Lazy::new(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        // try_init：测试或嵌入场景下可能已有 subscriber
        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(true)
                    .with_line_number(true),
            )
            .try_init();
    });
    Lazy::force(&INIT);
}
