//! Water Tracker — 饮水记录与定时喝水提醒桌面小工具（Rust + egui）

mod app;
mod config;
mod error;
mod fill;
mod logger;
mod reminder;
mod scheduler;
mod silhouette;
mod sound;
mod state;
mod store;
mod tray;

use tracing::{error, info};

use crate::error::{AppError, Result};
use crate::silhouette::{BottleAssets, SilhouetteParams};
use crate::store::Store;

/// 水瓶素材：优先用环境变量指定的图片，否则用内置图
fn load_bottle() -> Result<BottleAssets> {
    let params = SilhouetteParams::default();
    match config::bottle_override() {
        Some(path) => {
            info!(path = %path.display(), "using custom bottle image");
            BottleAssets::open(&path, &params)
        }
        None => BottleAssets::from_bytes(config::BUNDLED_BOTTLE, &params),
    }
}

fn main() -> std::result::Result<(), AppError> {
    logger::init_logger();
    info!("starting {}", config::APP_NAME);

    // 没有水瓶图就无法渲染主视图，直接退出
    let assets =
        load_bottle().inspect_err(|e| error!(error = %e, "cannot start without a bottle image"))?;
    info!(width = assets.width(), height = assets.height(), "bottle assets ready");

    let store = Store::default_location();
    let saved = store.load();

    let icon = tray::icon_rgba();
    let (icon_w, icon_h) = icon.dimensions();
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([config::WINDOW_SIZE.0, config::WINDOW_SIZE.1])
            .with_title(config::APP_NAME)
            .with_icon(egui::IconData {
                rgba: icon.into_raw(),
                width: icon_w,
                height: icon_h,
            }),
        ..Default::default()
    };
    eframe::run_native(
        config::APP_NAME,
        options,
        Box::new(move |cc| {
            let app = app::WaterTrackerApp::new(cc, assets, store, saved)
                .inspect_err(|e| error!(error = %e, "could not start reminder thread"))
                .map_err(|e| e.to_string())?;
            Ok(Box::new(app))
        }),
    )?;
    Ok(())
}
