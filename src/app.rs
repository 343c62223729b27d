//! egui 主界面：左侧水瓶图，右侧饮水记录与提醒控制

use std::collections::VecDeque;
use std::path::PathBuf;

use crossbeam_channel::{Receiver, Sender, unbounded};
use eframe::egui;
use tracing::{info, warn};

use crate::config::{CAPACITY_ML, INTERVAL_RANGE, QUICK_ADD_ML, TICK};
use crate::error::Result;
use crate::fill;
use crate::scheduler::Scheduler;
use crate::silhouette::BottleAssets;
use crate::sound::SoundPlayer;
use crate::state::{AppState, Applied, Command, Warning};
use crate::store::{PersistedState, Store};
use crate::tray::{TrayCommand, TrayHost};

/// 浅灰背景
const BG_RGB: (u8, u8, u8) = (240, 240, 240);

pub struct WaterTrackerApp {
    state: AppState,
    assets: BottleAssets,
    store: Store,
    scheduler: Scheduler,
    tray: TrayHost,
    bottle_texture: Option<egui::TextureHandle>,
    /// 饮水量变化后需要重绘水瓶
    bottle_dirty: bool,
    custom_input: String,
    /// 是否显示「重置」确认框
    confirm_reset: bool,
    /// 待显示的警告，逐条弹出
    warnings: VecDeque<Warning>,
    /// 文件选择框在后台线程打开，结果经 channel 送回
    picked_tx: Sender<Option<PathBuf>>,
    picked_rx: Receiver<Option<PathBuf>>,
    picking_sound: bool,
    /// 托盘「Exit」发起的关闭，不再拦截
    exiting: bool,
}

impl WaterTrackerApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        assets: BottleAssets,
        store: Store,
        saved: PersistedState,
    ) -> Result<Self> {
        cc.egui_ctx.set_visuals(egui::Visuals::light());
        let state = AppState::from_persisted(&saved);
        let ctx = cc.egui_ctx.clone();
        let scheduler = Scheduler::spawn(state.reminder.clone(), SoundPlayer::new, move || {
            ctx.request_repaint()
        })?;
        let (picked_tx, picked_rx) = unbounded();
        Ok(Self {
            state,
            assets,
            store,
            scheduler,
            tray: TrayHost::new(),
            bottle_texture: None,
            bottle_dirty: true,
            custom_input: String::new(),
            confirm_reset: false,
            warnings: VecDeque::new(),
            picked_tx,
            picked_rx,
            picking_sound: false,
            exiting: false,
        })
    }

    fn dispatch(&mut self, cmd: Command) {
        let applied = self.state.apply(cmd);
        self.handle_applied(applied);
    }

    fn handle_applied(&mut self, applied: Applied) {
        match applied {
            Applied::Redraw => self.bottle_dirty = true,
            Applied::Updated => {}
            Applied::Reminder(ctl) => self.scheduler.send(ctl),
        }
    }

    fn add_custom(&mut self) {
        match self.state.add_custom(&self.custom_input) {
            Ok(applied) => {
                self.handle_applied(applied);
                self.custom_input.clear();
            }
            Err(e) => self.warnings.push_back(Warning::invalid_entry(e)),
        }
    }

    /// 在后台线程打开文件选择框，不阻塞界面刷新
    fn choose_sound_file(&mut self, ctx: &egui::Context) {
        if self.picking_sound {
            return;
        }
        let tx = self.picked_tx.clone();
        let ctx = ctx.clone();
        let spawned = std::thread::Builder::new()
            .name("sound-picker".into())
            .spawn(move || {
                let dialog = rfd::AsyncFileDialog::new()
                    .set_title("Select Reminder Sound")
                    .add_filter("Audio Files", &["mp3", "wav"])
                    .add_filter("All Files", &["*"]);
                let picked = futures::executor::block_on(dialog.pick_file());
                let _ = tx.send(picked.map(|f| f.path().to_path_buf()));
                ctx.request_repaint();
            });
        match spawned {
            Ok(_) => self.picking_sound = true,
            Err(e) => warn!(error = %e, "could not open file dialog"),
        }
    }

    fn take_picked_sound(&mut self) {
        while let Ok(picked) = self.picked_rx.try_recv() {
            self.picking_sound = false;
            if let Some(path) = picked {
                self.dispatch(Command::ChooseSound(path));
            }
        }
    }

    /// 写盘失败只记日志，不打扰用户
    fn save(&self) {
        if let Err(e) = self.store.save(&self.state.to_persisted()) {
            warn!(path = %self.store.path().display(), error = %e, "could not save state");
        }
    }

    /// 饮水量变化后重新合成水瓶并更新纹理
    fn refresh_bottle(&mut self, ctx: &egui::Context) {
        if !self.bottle_dirty && self.bottle_texture.is_some() {
            return;
        }
        let img = fill::render(&self.assets, self.state.consumption, CAPACITY_ML);
        let size = [img.width() as usize, img.height() as usize];
        let color = egui::ColorImage::from_rgba_unmultiplied(size, img.as_raw());
        match &mut self.bottle_texture {
            Some(texture) => texture.set(color, egui::TextureOptions::LINEAR),
            None => {
                self.bottle_texture =
                    Some(ctx.load_texture("bottle", color, egui::TextureOptions::LINEAR));
            }
        }
        self.bottle_dirty = false;
    }

    /// 关闭窗口：先保存，再退出或隐藏到托盘
    fn on_close_requested(&mut self, ctx: &egui::Context) {
        self.save();
        if self.exiting || !self.state.minimize_to_tray {
            self.tray.hide_icon();
            return;
        }
        ctx.send_viewport_cmd(egui::ViewportCommand::CancelClose);
        match self.tray.show_icon(ctx) {
            Ok(()) => {
                info!("hidden to tray");
                ctx.send_viewport_cmd(egui::ViewportCommand::Visible(false));
            }
            Err(e) => {
                warn!(error = %e, "tray unavailable, minimizing instead");
                ctx.send_viewport_cmd(egui::ViewportCommand::Minimized(true));
            }
        }
    }

    fn on_tray_command(&mut self, ctx: &egui::Context, cmd: TrayCommand) {
        info!(?cmd, "tray");
        match cmd {
            TrayCommand::Show => {
                self.tray.hide_icon();
                ctx.send_viewport_cmd(egui::ViewportCommand::Visible(true));
                ctx.send_viewport_cmd(egui::ViewportCommand::Focus);
            }
            TrayCommand::Exit => {
                self.exiting = true;
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            }
        }
    }
}

/// 原生窗口句柄，托盘线程在窗口隐藏时用它把窗口唤出
#[cfg(windows)]
fn native_window(frame: &eframe::Frame) -> Option<isize> {
    use raw_window_handle::{HasWindowHandle, RawWindowHandle};

    match frame.window_handle().ok()?.as_raw() {
        RawWindowHandle::Win32(handle) => Some(handle.hwnd.get()),
        _ => None,
    }
}

#[cfg(not(windows))]
fn native_window(_frame: &eframe::Frame) -> Option<isize> {
    None
}

impl eframe::App for WaterTrackerApp {
    fn update(&mut self, ctx: &egui::Context, frame: &mut eframe::Frame) {
        let warnings = self.scheduler.poll();
        self.warnings.extend(warnings);
        self.take_picked_sound();
        while let Some(cmd) = self.tray.try_recv() {
            self.on_tray_command(ctx, cmd);
        }
        if ctx.input(|i| i.viewport().close_requested()) {
            if let Some(hwnd) = native_window(frame) {
                self.tray.remember_window(hwnd);
            }
            self.on_close_requested(ctx);
        }

        self.refresh_bottle(ctx);
        self.ui_main(ctx);
        if self.confirm_reset {
            self.ui_confirm_reset(ctx);
        }
        if !self.warnings.is_empty() {
            self.ui_warning(ctx);
        }

        ctx.request_repaint_after(TICK);
    }
}

impl WaterTrackerApp {
    fn ui_main(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default()
            .frame(
                egui::Frame::NONE
                    .fill(egui::Color32::from_rgb(BG_RGB.0, BG_RGB.1, BG_RGB.2))
                    .inner_margin(10.0),
            )
            .show(ctx, |ui| {
                ui.horizontal_top(|ui| {
                    if let Some(texture) = &self.bottle_texture {
                        ui.image(egui::load::SizedTexture::from_handle(texture));
                    }
                    ui.add_space(16.0);
                    ui.vertical_centered(|ui| self.ui_controls(ui));
                });
            });
    }

    fn ui_controls(&mut self, ui: &mut egui::Ui) {
        ui.add_space(4.0);
        ui.label(egui::RichText::new(self.state.status_text()).size(18.0));
        ui.add_space(6.0);

        if ui.button(format!("+{QUICK_ADD_ML} ml")).clicked() {
            self.dispatch(Command::AddAmount(QUICK_ADD_ML));
        }
        ui.add_space(6.0);

        ui.horizontal(|ui| {
            ui.label("Custom amount (ml):");
            let resp = ui.add(egui::TextEdit::singleline(&mut self.custom_input).desired_width(50.0));
            let submitted = resp.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            if ui.button("Add").clicked() || submitted {
                self.add_custom();
            }
        });
        ui.add_space(6.0);

        if ui.button("Reset Water").clicked() {
            self.confirm_reset = true;
        }
        ui.add_space(10.0);

        let mut to_tray = self.state.minimize_to_tray;
        if ui.checkbox(&mut to_tray, "Minimize to Tray on Close").changed() {
            self.dispatch(Command::SetMinimizeToTray(to_tray));
        }
        ui.add_space(10.0);

        ui.horizontal(|ui| {
            ui.label("Reminder Interval (min):");
            // 读到的 0 原样显示，用户改动后才落入范围
            let mut minutes = self.state.reminder.interval_minutes;
            let resp = ui.add(
                egui::DragValue::new(&mut minutes)
                    .range(INTERVAL_RANGE)
                    .clamp_existing_to_range(false)
                    .speed(1),
            );
            if resp.changed() {
                self.dispatch(Command::SetInterval(minutes));
            }
        });
        ui.add_space(6.0);

        let status = self.scheduler.status().clone();
        if ui.button(status.button_label).clicked() {
            self.dispatch(Command::ToggleReminder);
        }
        ui.label(egui::RichText::new(status.countdown).size(12.0));
        ui.add_space(6.0);

        ui.horizontal(|ui| {
            ui.label("Custom Sound:");
            ui.add_sized(
                [140.0, 18.0],
                egui::Label::new(self.state.sound_label()).truncate(),
            );
            let browse = ui.add_enabled(!self.picking_sound, egui::Button::new("Browse"));
            if browse.clicked() {
                self.choose_sound_file(ui.ctx());
            }
            if self.state.reminder.sound_path.is_some() && ui.button("Clear").clicked() {
                self.dispatch(Command::ClearSound);
            }
        });
    }

    fn ui_confirm_reset(&mut self, ctx: &egui::Context) {
        let modal = egui::Modal::new(egui::Id::new("confirm-reset")).show(ctx, |ui| {
            ui.heading("Reset");
            ui.label("Reset all water consumption to 0?");
            ui.add_space(8.0);
            ui.horizontal(|ui| {
                if ui.button("Yes").clicked() {
                    self.dispatch(Command::Reset);
                    self.confirm_reset = false;
                }
                if ui.button("No").clicked() {
                    self.confirm_reset = false;
                }
            });
        });
        // Esc 或点击遮罩视同「No」
        if modal.should_close() {
            self.confirm_reset = false;
        }
    }

    fn ui_warning(&mut self, ctx: &egui::Context) {
        let Some(warning) = self.warnings.front().cloned() else { return };
        let modal = egui::Modal::new(egui::Id::new("warning")).show(ctx, |ui| {
            ui.heading(warning.title);
            ui.label(&warning.message);
            ui.add_space(8.0);
            ui.button("OK").clicked()
        });
        if modal.inner || modal.should_close() {
            self.warnings.pop_front();
        }
    }
}
