//! 错误类型

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// 水瓶源图无法解码，主视图无从渲染
    #[error("failed to decode bottle image: {0}")]
    BottleImage(#[from] image::ImageError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("could not play sound: {0}")]
    Sound(String),
    #[error("tray icon unavailable: {0}")]
    Tray(String),
    #[error("ui error: {0}")]
    Ui(#[from] eframe::Error),
}

/// 自定义饮水量输入校验失败
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("Please enter a valid integer.")]
    NotAnInteger,
    #[error("Please enter a positive integer.")]
    NotPositive,
}
