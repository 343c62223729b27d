//! 提醒调度线程。
//!
//! 倒计时和发声都在独立线程上按 [`TICK`] 推进，不依赖窗口刷新：
//! 窗口隐藏到托盘后 UI 线程可能不再出帧，提醒照样触发。
//! UI 线程经 channel 发送 [`Control`]，收取状态快照和警告。

use std::path::PathBuf;
use std::thread::JoinHandle;

use chrono::{DateTime, Utc};
use crossbeam_channel::{Receiver, Sender, select, tick, unbounded};
use tracing::{debug, info, warn};

use crate::config::TICK;
use crate::error::Result;
use crate::reminder::{ReminderTimer, effective_interval};
use crate::sound::Alerts;
use crate::state::{ReminderConfig, Warning};

/// UI 发给提醒线程的指令
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Control {
    Toggle,
    SetInterval(u32),
    SetSound(Option<PathBuf>),
}

/// 界面上显示的提醒状态
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReminderStatus {
    pub countdown: String,
    pub button_label: &'static str,
}

impl ReminderStatus {
    fn of(timer: &ReminderTimer) -> Self {
        Self {
            countdown: timer.countdown_display(),
            button_label: timer.button_label(),
        }
    }
}

impl Default for ReminderStatus {
    fn default() -> Self {
        Self::of(&ReminderTimer::default())
    }
}

/// 提醒线程发回 UI 的消息
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Report {
    Status(ReminderStatus),
    Warning(Warning),
}

/// 计时器 + 提醒设置 + 声音出口，由提醒线程独占
pub struct ReminderDriver<A> {
    pub timer: ReminderTimer,
    pub config: ReminderConfig,
    alerts: A,
}

impl<A: Alerts> ReminderDriver<A> {
    pub fn new(config: ReminderConfig, alerts: A) -> Self {
        Self {
            timer: ReminderTimer::default(),
            config,
            alerts,
        }
    }

    pub fn handle(&mut self, ctl: Control, now: DateTime<Utc>) {
        debug!(?ctl, "reminder control");
        match ctl {
            Control::Toggle => self.timer.toggle(now, self.config.interval_minutes),
            Control::SetInterval(minutes) => self.config.interval_minutes = minutes,
            Control::SetSound(path) => self.config.sound_path = path,
        }
    }

    /// 推进一拍：先收取异步播放失败，再推进计时器，到点则发声
    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<Warning> {
        let mut warnings = Vec::new();
        while let Some(e) = self.alerts.take_failure() {
            warn!(error = %e, "custom sound failed during playback");
            self.alerts.bell();
            warnings.push(Warning::sound_error(&e));
        }

        self.timer.tick(now, self.config.interval_minutes);
        if self.timer.take_alert() {
            info!(
                interval = effective_interval(self.config.interval_minutes),
                "reminder fired"
            );
            warnings.extend(self.fire());
        }
        warnings
    }

    /// 播放自选提示音，失败时退回系统提示音并返回警告
    pub fn fire(&mut self) -> Option<Warning> {
        let Some(path) = &self.config.sound_path else {
            self.alerts.bell();
            return None;
        };
        match self.alerts.play_file(path) {
            Ok(()) => None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "custom sound failed");
                self.alerts.bell();
                Some(Warning::sound_error(&e))
            }
        }
    }

    pub fn status(&self) -> ReminderStatus {
        ReminderStatus::of(&self.timer)
    }

    #[cfg(test)]
    pub fn alerts(&self) -> &A {
        &self.alerts
    }
}

/// 提醒线程主循环：控制 channel 断开即退出
fn run<A: Alerts>(
    mut driver: ReminderDriver<A>,
    controls: Receiver<Control>,
    reports: Sender<Report>,
    wake: impl Fn(),
) {
    let ticker = tick(TICK);
    let mut last = driver.status();
    loop {
        let mut warnings = Vec::new();
        select! {
            recv(controls) -> msg => match msg {
                Ok(ctl) => driver.handle(ctl, Utc::now()),
                Err(_) => break,
            },
            recv(ticker) -> _ => warnings = driver.tick(Utc::now()),
        }

        let status = driver.status();
        let changed = status != last;
        if changed {
            last = status.clone();
            if reports.send(Report::Status(status)).is_err() {
                break;
            }
        }
        let notify = changed || !warnings.is_empty();
        for w in warnings {
            if reports.send(Report::Warning(w)).is_err() {
                break;
            }
        }
        if notify {
            wake();
        }
    }
    debug!("reminder thread stopped");
}

/// UI 端持有的提醒线程句柄，drop 时关闭并等待线程结束
pub struct Scheduler {
    controls: Option<Sender<Control>>,
    reports: Receiver<Report>,
    status: ReminderStatus,
    worker: Option<JoinHandle<()>>,
}

impl Scheduler {
    /// 启动提醒线程。声音出口在线程内创建（音频输出句柄不能跨线程移动）
    pub fn spawn<A, F, W>(config: ReminderConfig, make_alerts: F, wake: W) -> Result<Self>
    where
        A: Alerts,
        F: FnOnce() -> A + Send + 'static,
        W: Fn() + Send + 'static,
    {
        let (control_tx, control_rx) = unbounded();
        let (report_tx, report_rx) = unbounded();
        let worker = std::thread::Builder::new()
            .name("reminder".into())
            .spawn(move || {
                let driver = ReminderDriver::new(config, make_alerts());
                run(driver, control_rx, report_tx, wake);
            })?;
        Ok(Self {
            controls: Some(control_tx),
            reports: report_rx,
            status: ReminderStatus::default(),
            worker: Some(worker),
        })
    }

    pub fn send(&self, ctl: Control) {
        let sent = self.controls.as_ref().is_some_and(|tx| tx.send(ctl).is_ok());
        if !sent {
            warn!("reminder thread is gone");
        }
    }

    /// 收取线程发来的消息（不阻塞），返回新警告
    pub fn poll(&mut self) -> Vec<Warning> {
        let mut warnings = Vec::new();
        for report in self.reports.try_iter() {
            match report {
                Report::Status(status) => self.status = status,
                Report::Warning(w) => warnings.push(w),
            }
        }
        warnings
    }

    pub fn status(&self) -> &ReminderStatus {
        &self.status
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.controls.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("reminder thread panicked");
            }
        }
    }
}
