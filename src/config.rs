//! 应用常量与环境变量覆盖

use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;

/// 应用名（窗口标题、托盘提示、数据目录）
pub const APP_NAME: &str = "Water Tracker";

/// 数据目录名（位于系统的本地应用数据目录下）
pub const DATA_DIR_NAME: &str = "water-tracker";

/// 状态文件名
pub const DATA_FILENAME: &str = "water_data.json";

/// 水瓶容量（ml），填充比例的分母
pub const CAPACITY_ML: u64 = 3000;

/// 「+150 ml」快捷按钮的量
pub const QUICK_ADD_ML: u64 = 150;

/// 提醒间隔可选范围（分钟）
pub const INTERVAL_RANGE: RangeInclusive<u32> = 1..=180;

/// 倒计时刷新周期
pub const TICK: Duration = Duration::from_secs(1);

/// 主窗口默认尺寸
pub const WINDOW_SIZE: (f32, f32) = (520.0, 380.0);

/// 打包进二进制的水瓶源图
pub const BUNDLED_BOTTLE: &[u8] = include_bytes!("../assets/bottle.png");

/// 打包进二进制的托盘图标
pub const BUNDLED_TRAY_ICON: &[u8] = include_bytes!("../assets/tray_icon.png");

/// 替换水瓶源图的路径
pub const ENV_BOTTLE: &str = "WATER_TRACKER_BOTTLE";

/// 覆盖数据目录
pub const ENV_DATA_DIR: &str = "WATER_TRACKER_DATA_DIR";

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// 用户指定的水瓶源图（未设置则用内置图）
pub fn bottle_override() -> Option<PathBuf> {
    env_path(ENV_BOTTLE)
}

/// 状态文件所在目录
pub fn data_dir() -> PathBuf {
    env_path(ENV_DATA_DIR).unwrap_or_else(|| {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DATA_DIR_NAME)
    })
}
