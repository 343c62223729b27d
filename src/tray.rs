//! 系统托盘：关闭窗口时可隐藏到托盘。
//!
//! 菜单事件由一个后台线程接收，翻译成 [`TrayCommand`] 后经 channel
//! 交回 UI 线程处理。后台线程不碰应用状态，只在 Windows 上把隐藏的
//! 原生窗口重新显示出来，让 UI 线程恢复出帧。
//! Linux 上图标由单独的 GTK 线程持有。

use std::sync::Arc;
use std::sync::atomic::{AtomicIsize, Ordering};

use crossbeam_channel::{Receiver, Sender, unbounded};
use image::{Rgba, RgbaImage};
use tracing::{debug, warn};

use crate::config;
use crate::error::{AppError, Result};

/// 托盘菜单项 id
pub const MENU_SHOW: &str = "show";
pub const MENU_EXIT: &str = "exit";

/// 托盘图标生成失败时的圆形颜色
const DROP_RGB: (u8, u8, u8) = (30, 144, 255);

/// 托盘菜单发回 UI 线程的意图
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrayCommand {
    Show,
    Exit,
}

pub fn command_for(menu_id: &str) -> Option<TrayCommand> {
    match menu_id {
        MENU_SHOW => Some(TrayCommand::Show),
        MENU_EXIT => Some(TrayCommand::Exit),
        _ => None,
    }
}

/// 把菜单 id 流转发为命令；UI 端关闭 channel 后退出
#[cfg_attr(
    not(any(windows, target_os = "macos", target_os = "linux")),
    allow(dead_code)
)]
fn forward_events(
    ids: impl IntoIterator<Item = String>,
    tx: &Sender<TrayCommand>,
    wake: impl Fn(),
) {
    for id in ids {
        let Some(cmd) = command_for(&id) else { continue };
        debug!(?cmd, "tray menu event");
        if tx.send(cmd).is_err() {
            break;
        }
        wake();
    }
}

/// 圆形图标（内置图标无法解码时使用）
pub fn fallback_icon(size: u32) -> RgbaImage {
    let c = size as f32 * 0.5;
    let r = size as f32 * 0.44;
    RgbaImage::from_fn(size, size, |x, y| {
        let dx = x as f32 + 0.5 - c;
        let dy = y as f32 + 0.5 - c;
        if (dx * dx + dy * dy).sqrt() <= r {
            Rgba([DROP_RGB.0, DROP_RGB.1, DROP_RGB.2, 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    })
}

/// 托盘/窗口图标像素
pub fn icon_rgba() -> RgbaImage {
    match image::load_from_memory(config::BUNDLED_TRAY_ICON) {
        Ok(img) => img.to_rgba8(),
        Err(e) => {
            warn!(error = %e, "bundled tray icon unreadable, using generated one");
            fallback_icon(32)
        }
    }
}

/// 把菜单项和图标组装成托盘图标；Linux 上必须在 GTK 线程里调用
#[cfg(any(windows, target_os = "macos", target_os = "linux"))]
fn build_tray() -> Result<tray_icon::TrayIcon> {
    use tray_icon::TrayIconBuilder;
    use tray_icon::menu::{Menu, MenuItem};

    let tray_err = |e: &dyn std::fmt::Display| AppError::Tray(e.to_string());
    let menu = Menu::new();
    let show = MenuItem::with_id(MENU_SHOW, "Show Water Tracker", true, None);
    let exit = MenuItem::with_id(MENU_EXIT, "Exit", true, None);
    menu.append(&show).map_err(|e| tray_err(&e))?;
    menu.append(&exit).map_err(|e| tray_err(&e))?;

    let rgba = icon_rgba();
    let (w, h) = rgba.dimensions();
    let icon = tray_icon::Icon::from_rgba(rgba.into_raw(), w, h).map_err(|e| tray_err(&e))?;

    TrayIconBuilder::new()
        .with_menu(Box::new(menu))
        .with_tooltip(config::APP_NAME)
        .with_icon(icon)
        .build()
        .map_err(|e| tray_err(&e))
}

/// 直接把隐藏的原生窗口显示出来。
///
/// Windows 上隐藏窗口收不到 WM_PAINT，UI 线程不会再出帧，
/// 只能由托盘线程先把窗口唤出，之后的命令才会被 `update` 处理。
#[cfg(windows)]
fn reveal_window(window: &AtomicIsize) {
    use windows_sys::Win32::UI::WindowsAndMessaging::{SW_SHOW, ShowWindow};

    let hwnd = window.load(Ordering::Acquire);
    if hwnd != 0 {
        unsafe {
            ShowWindow(hwnd as _, SW_SHOW);
        }
    }
}

#[cfg(not(windows))]
fn reveal_window(_window: &AtomicIsize) {}

#[cfg(target_os = "linux")]
mod gtk_host {
    //! tray-icon 在 Linux 上依赖 GTK，图标必须在跑 GTK 主循环的线程里创建和修改

    use std::time::Duration;

    use crossbeam_channel::{Sender, TryRecvError, bounded, unbounded};
    use gtk::glib;
    use tracing::{debug, warn};

    use crate::error::{AppError, Result};

    /// 主循环检查可见性指令的间隔
    const POLL: Duration = Duration::from_millis(100);
    const STARTUP_TIMEOUT: Duration = Duration::from_secs(5);

    /// 托盘线程句柄；drop 后线程退出 GTK 主循环
    pub struct GtkTray {
        visible: Sender<bool>,
    }

    impl GtkTray {
        /// 启动 GTK 线程并创建（可见的）托盘图标，失败时返回错误
        pub fn spawn() -> Result<Self> {
            let (visible_tx, visible_rx) = unbounded::<bool>();
            let (ready_tx, ready_rx) = bounded::<std::result::Result<(), String>>(1);
            std::thread::Builder::new()
                .name("tray-gtk".into())
                .spawn(move || {
                    if let Err(e) = gtk::init() {
                        let _ = ready_tx.send(Err(e.to_string()));
                        return;
                    }
                    let tray = match super::build_tray() {
                        Ok(tray) => tray,
                        Err(e) => {
                            let _ = ready_tx.send(Err(e.to_string()));
                            return;
                        }
                    };
                    let _ = ready_tx.send(Ok(()));
                    glib::timeout_add_local(POLL, move || loop {
                        match visible_rx.try_recv() {
                            Ok(visible) => {
                                if let Err(e) = tray.set_visible(visible) {
                                    warn!(error = %e, "could not change tray visibility");
                                }
                            }
                            Err(TryRecvError::Empty) => return glib::ControlFlow::Continue,
                            Err(TryRecvError::Disconnected) => {
                                gtk::main_quit();
                                return glib::ControlFlow::Break;
                            }
                        }
                    });
                    debug!("gtk tray loop running");
                    gtk::main();
                    debug!("gtk tray loop stopped");
                })?;

            match ready_rx.recv_timeout(STARTUP_TIMEOUT) {
                Ok(Ok(())) => Ok(Self {
                    visible: visible_tx,
                }),
                Ok(Err(e)) => Err(AppError::Tray(e)),
                Err(_) => Err(AppError::Tray("tray thread did not start".into())),
            }
        }

        pub fn set_visible(&self, visible: bool) {
            let _ = self.visible.send(visible);
        }
    }
}

/// 托盘宿主：持有图标与命令 channel，图标只在窗口隐藏期间可见
pub struct TrayHost {
    tx: Sender<TrayCommand>,
    rx: Receiver<TrayCommand>,
    forwarder_started: bool,
    shown: bool,
    /// 原生窗口句柄（只在 Windows 上记录），托盘线程据此唤出窗口
    window: Arc<AtomicIsize>,
    #[cfg(any(windows, target_os = "macos"))]
    icon: Option<tray_icon::TrayIcon>,
    #[cfg(target_os = "linux")]
    gtk: Option<gtk_host::GtkTray>,
}

impl Default for TrayHost {
    fn default() -> Self {
        let (tx, rx) = unbounded();
        Self {
            tx,
            rx,
            forwarder_started: false,
            shown: false,
            window: Arc::new(AtomicIsize::new(0)),
            #[cfg(any(windows, target_os = "macos"))]
            icon: None,
            #[cfg(target_os = "linux")]
            gtk: None,
        }
    }
}

impl TrayHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// UI 线程每帧轮询
    pub fn try_recv(&self) -> Option<TrayCommand> {
        self.rx.try_recv().ok()
    }

    pub fn is_shown(&self) -> bool {
        self.shown
    }

    /// 记下原生窗口句柄，供托盘线程在窗口隐藏时使用
    pub fn remember_window(&self, raw: isize) {
        self.window.store(raw, Ordering::Release);
    }

    /// 显示托盘图标；首次调用时启动事件转发线程
    pub fn show_icon(&mut self, ctx: &egui::Context) -> Result<()> {
        if self.shown {
            return Ok(());
        }
        self.start_forwarder(ctx)?;
        self.platform_show()?;
        self.shown = true;
        debug!("tray icon shown");
        Ok(())
    }

    /// 隐藏托盘图标（恢复窗口或退出时）
    pub fn hide_icon(&mut self) {
        if !self.shown {
            return;
        }
        self.platform_hide();
        self.shown = false;
        debug!("tray icon removed");
    }

    #[cfg(any(windows, target_os = "macos", target_os = "linux"))]
    fn start_forwarder(&mut self, ctx: &egui::Context) -> Result<()> {
        if self.forwarder_started {
            return Ok(());
        }
        let tx = self.tx.clone();
        let window = Arc::clone(&self.window);
        let ctx = ctx.clone();
        std::thread::Builder::new()
            .name("tray-events".into())
            .spawn(move || {
                let events = tray_icon::menu::MenuEvent::receiver();
                forward_events(events.iter().map(|e| e.id.0), &tx, || {
                    reveal_window(&window);
                    ctx.request_repaint();
                });
            })?;
        self.forwarder_started = true;
        Ok(())
    }

    #[cfg(not(any(windows, target_os = "macos", target_os = "linux")))]
    fn start_forwarder(&mut self, _ctx: &egui::Context) -> Result<()> {
        Err(AppError::Tray("not supported on this platform".into()))
    }

    #[cfg(any(windows, target_os = "macos"))]
    fn platform_show(&mut self) -> Result<()> {
        self.icon = Some(build_tray()?);
        Ok(())
    }

    #[cfg(any(windows, target_os = "macos"))]
    fn platform_hide(&mut self) {
        self.icon = None;
    }

    /// GTK 线程只建一次，之后切换可见性
    #[cfg(target_os = "linux")]
    fn platform_show(&mut self) -> Result<()> {
        if let Some(gtk) = &self.gtk {
            gtk.set_visible(true);
            return Ok(());
        }
        self.gtk = Some(gtk_host::GtkTray::spawn()?);
        Ok(())
    }

    #[cfg(target_os = "linux")]
    fn platform_hide(&mut self) {
        if let Some(gtk) = &self.gtk {
            gtk.set_visible(false);
        }
    }

    #[cfg(not(any(windows, target_os = "macos", target_os = "linux")))]
    fn platform_show(&mut self) -> Result<()> {
        Err(AppError::Tray("not supported on this platform".into()))
    }

    #[cfg(not(any(windows, target_os = "macos", target_os = "linux")))]
    fn platform_hide(&mut self) {}
}
