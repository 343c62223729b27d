//! 喝水提醒计时器：固定周期、到点后自我重排的倒计时

use chrono::{DateTime, Duration, Utc};

/// 未运行时倒计时区域显示的文字
pub const IDLE_MESSAGE: &str = "No reminder active.";

/// 计时器状态
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerState {
    Stopped,
    Running,
}

/// 间隔至少 1 分钟（持久化里可能读到 0）
pub fn effective_interval(interval_minutes: u32) -> u32 {
    interval_minutes.max(1)
}

fn period(interval_minutes: u32) -> Duration {
    Duration::minutes(effective_interval(interval_minutes) as i64)
}

/// 提醒计时器，不持久化，每次启动都是 Stopped
#[derive(Clone, Debug)]
pub struct ReminderTimer {
    pub state: TimerState,
    pub next_fire_time: Option<DateTime<Utc>>,
    pub time_left_secs: i64,
    /// 本次 tick 刚到点（用于播放提示音），取走后清空
    alert_pending: bool,
}

impl Default for ReminderTimer {
    fn default() -> Self {
        Self {
            state: TimerState::Stopped,
            next_fire_time: None,
            time_left_secs: 0,
            alert_pending: false,
        }
    }
}

impl ReminderTimer {
    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    /// 开始计时，下次提醒在 now + interval
    pub fn start(&mut self, now: DateTime<Utc>, interval_minutes: u32) {
        self.state = TimerState::Running;
        self.schedule(now, interval_minutes);
    }

    /// 停止计时并清掉已排的提醒
    pub fn stop(&mut self) {
        self.state = TimerState::Stopped;
        self.next_fire_time = None;
        self.time_left_secs = 0;
        self.alert_pending = false;
    }

    pub fn toggle(&mut self, now: DateTime<Utc>, interval_minutes: u32) {
        match self.state {
            TimerState::Running => self.stop(),
            TimerState::Stopped => self.start(now, interval_minutes),
        }
    }

    /// 每秒由提醒线程调用。到点则挂起提醒并按当前间隔重排；
    /// 计时中途修改间隔只在下次重排时生效。
    pub fn tick(&mut self, now: DateTime<Utc>, interval_minutes: u32) {
        if self.state != TimerState::Running {
            return;
        }
        let Some(next) = self.next_fire_time else { return };
        self.time_left_secs = (next - now).num_seconds();
        if self.time_left_secs <= 0 {
            self.alert_pending = true;
            self.schedule(now, interval_minutes);
        }
    }

    fn schedule(&mut self, now: DateTime<Utc>, interval_minutes: u32) {
        let next = now + period(interval_minutes);
        self.next_fire_time = Some(next);
        self.time_left_secs = (next - now).num_seconds();
    }

    /// 取走「刚到点」标记
    pub fn take_alert(&mut self) -> bool {
        std::mem::take(&mut self.alert_pending)
    }

    /// 倒计时文字，秒补足两位
    pub fn countdown_display(&self) -> String {
        match self.state {
            TimerState::Stopped => IDLE_MESSAGE.to_owned(),
            TimerState::Running => {
                let s = self.time_left_secs.max(0);
                format!("Next reminder in: {}:{:02}", s / 60, s % 60)
            }
        }
    }

    pub fn button_label(&self) -> &'static str {
        match self.state {
            TimerState::Stopped => "Start Reminder",
            TimerState::Running => "Stop Reminder",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
    }

    fn secs(n: i64) -> Duration {
        Duration::seconds(n)
    }

    #[test]
    fn starts_stopped() {
        let timer = ReminderTimer::default();
        assert!(!timer.is_running());
        assert_eq!(timer.countdown_display(), IDLE_MESSAGE);
        assert_eq!(timer.button_label(), "Start Reminder");
    }

    #[test]
    fn start_schedules_one_interval_ahead() {
        let mut timer = ReminderTimer::default();
        timer.start(t0(), 1);
        assert_eq!(timer.next_fire_time, Some(t0() + secs(60)));
        assert_eq!(timer.countdown_display(), "Next reminder in: 1:00");
        assert_eq!(timer.button_label(), "Stop Reminder");
    }

    #[test]
    fn countdown_pads_seconds() {
        let mut timer = ReminderTimer::default();
        timer.start(t0(), 2);
        timer.tick(t0() + secs(55), 2);
        assert_eq!(timer.countdown_display(), "Next reminder in: 1:05");
        timer.tick(t0() + secs(111), 2);
        assert_eq!(timer.countdown_display(), "Next reminder in: 0:09");
    }

    #[test]
    fn fires_after_interval_and_reschedules_without_drift() {
        let mut timer = ReminderTimer::default();
        timer.start(t0(), 1);

        for s in 1..60 {
            timer.tick(t0() + secs(s), 1);
            assert!(!timer.take_alert(), "fired early at {s}s");
        }

        let fire = t0() + secs(60);
        timer.tick(fire, 1);
        assert!(timer.take_alert());
        assert!(!timer.take_alert());
        assert_eq!(timer.next_fire_time, Some(fire + secs(60)));

        // 后续每个周期都在 60 秒整点触发
        let mut fired_at = Vec::new();
        for s in 61..=240 {
            let now = t0() + secs(s);
            timer.tick(now, 1);
            if timer.take_alert() {
                fired_at.push(s);
            }
        }
        assert_eq!(fired_at, vec![120, 180, 240]);
    }

    #[test]
    fn late_tick_reschedules_from_fire_time() {
        let mut timer = ReminderTimer::default();
        timer.start(t0(), 1);
        let late = t0() + secs(61);
        timer.tick(late, 1);
        assert!(timer.take_alert());
        assert_eq!(timer.next_fire_time, Some(late + secs(60)));
    }

    #[test]
    fn interval_change_applies_at_next_reschedule() {
        let mut timer = ReminderTimer::default();
        timer.start(t0(), 1);
        timer.tick(t0() + secs(30), 5);
        assert_eq!(timer.next_fire_time, Some(t0() + secs(60)));
        timer.tick(t0() + secs(60), 5);
        assert!(timer.take_alert());
        assert_eq!(timer.next_fire_time, Some(t0() + secs(60 + 300)));
    }

    #[test]
    fn zero_interval_is_clamped_at_use() {
        let mut timer = ReminderTimer::default();
        timer.start(t0(), 0);
        assert_eq!(timer.next_fire_time, Some(t0() + secs(60)));
        assert_eq!(effective_interval(0), 1);
        assert_eq!(effective_interval(45), 45);
    }

    #[test]
    fn stop_clears_schedule_and_ignores_ticks() {
        let mut timer = ReminderTimer::default();
        timer.start(t0(), 1);
        timer.stop();
        assert_eq!(timer.next_fire_time, None);
        assert_eq!(timer.countdown_display(), IDLE_MESSAGE);
        timer.tick(t0() + secs(3600), 1);
        assert!(!timer.take_alert());
    }

    #[test]
    fn toggle_switches_state() {
        let mut timer = ReminderTimer::default();
        timer.toggle(t0(), 3);
        assert!(timer.is_running());
        timer.toggle(t0() + secs(5), 3);
        assert!(!timer.is_running());
    }
}
