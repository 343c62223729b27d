//! 应用状态与命令：UI 只负责把点击翻译成 Command，状态转换都在这里

use std::path::PathBuf;

use tracing::info;

use crate::error::{AppError, InputError};
use crate::scheduler::Control;
use crate::store::PersistedState;

/// 提醒设置（与饮水量一起持久化）
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReminderConfig {
    /// 读到的 0 原样保留，使用时再取 max(1, ..)
    pub interval_minutes: u32,
    pub sound_path: Option<PathBuf>,
}

/// UI 发出的离散操作
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    AddAmount(u64),
    Reset,
    ToggleReminder,
    ChooseSound(PathBuf),
    ClearSound,
    SetInterval(u32),
    SetMinimizeToTray(bool),
}

/// 命令执行结果
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Applied {
    /// 饮水量变了，需要重绘水瓶
    Redraw,
    Updated,
    /// 需要转交提醒线程
    Reminder(Control),
}

/// 需要弹窗提示用户的警告
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Warning {
    pub title: &'static str,
    pub message: String,
}

impl Warning {
    pub fn invalid_entry(err: InputError) -> Self {
        Self {
            title: "Invalid Entry",
            message: err.to_string(),
        }
    }

    pub fn sound_error(err: &AppError) -> Self {
        Self {
            title: "Sound Error",
            message: format!("Could not play custom sound:\n{err}"),
        }
    }
}

/// 整个应用唯一的可变状态
#[derive(Clone, Debug, Default)]
pub struct AppState {
    pub consumption: u64,
    pub reminder: ReminderConfig,
    pub minimize_to_tray: bool,
}

/// 解析自定义饮水量：必须是正整数
pub fn parse_custom_amount(input: &str) -> Result<u64, InputError> {
    let n: i64 = input.trim().parse().map_err(|_| InputError::NotAnInteger)?;
    if n <= 0 {
        return Err(InputError::NotPositive);
    }
    Ok(n as u64)
}

impl AppState {
    pub fn from_persisted(saved: &PersistedState) -> Self {
        let sound = saved.custom_sound.trim();
        Self {
            consumption: saved.total_consumed,
            reminder: ReminderConfig {
                interval_minutes: saved.reminder_interval,
                sound_path: (!sound.is_empty()).then(|| PathBuf::from(sound)),
            },
            ..Default::default()
        }
    }

    pub fn to_persisted(&self) -> PersistedState {
        PersistedState {
            total_consumed: self.consumption,
            custom_sound: self
                .reminder
                .sound_path
                .as_ref()
                .map(|p| p.to_string_lossy().trim().to_owned())
                .unwrap_or_default(),
            reminder_interval: self.reminder.interval_minutes,
        }
    }

    pub fn apply(&mut self, cmd: Command) -> Applied {
        info!(?cmd, "apply");
        match cmd {
            Command::AddAmount(ml) => {
                self.consumption = self.consumption.saturating_add(ml);
                Applied::Redraw
            }
            Command::Reset => {
                self.consumption = 0;
                Applied::Redraw
            }
            Command::ToggleReminder => Applied::Reminder(Control::Toggle),
            Command::ChooseSound(path) => {
                self.reminder.sound_path = Some(path.clone());
                Applied::Reminder(Control::SetSound(Some(path)))
            }
            Command::ClearSound => {
                self.reminder.sound_path = None;
                Applied::Reminder(Control::SetSound(None))
            }
            Command::SetInterval(minutes) => {
                self.reminder.interval_minutes = minutes;
                Applied::Reminder(Control::SetInterval(minutes))
            }
            Command::SetMinimizeToTray(on) => {
                self.minimize_to_tray = on;
                Applied::Updated
            }
        }
    }

    /// 校验输入后追加；输入无效时状态不变
    pub fn add_custom(&mut self, input: &str) -> Result<Applied, InputError> {
        let ml = parse_custom_amount(input)?;
        Ok(self.apply(Command::AddAmount(ml)))
    }

    /// 「Custom Sound:」后显示的文件名
    pub fn sound_label(&self) -> String {
        self.reminder
            .sound_path
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "No sound selected".to_owned())
    }

    pub fn status_text(&self) -> String {
        format!("Consumed: {} ml", self.consumption)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_reset() {
        let mut state = AppState::default();
        assert_eq!(state.apply(Command::AddAmount(150)), Applied::Redraw);
        state.apply(Command::AddAmount(150));
        assert_eq!(state.consumption, 300);
        assert_eq!(state.status_text(), "Consumed: 300 ml");
        assert_eq!(state.apply(Command::Reset), Applied::Redraw);
        assert_eq!(state.consumption, 0);
    }

    #[test]
    fn consumption_is_not_clamped_to_capacity() {
        let mut state = AppState::default();
        state.apply(Command::AddAmount(9000));
        assert_eq!(state.consumption, 9000);
    }

    #[test]
    fn custom_amount_validation() {
        assert_eq!(parse_custom_amount("250"), Ok(250));
        assert_eq!(parse_custom_amount(" 42 "), Ok(42));
        assert_eq!(parse_custom_amount("abc"), Err(InputError::NotAnInteger));
        assert_eq!(parse_custom_amount("1.5"), Err(InputError::NotAnInteger));
        assert_eq!(parse_custom_amount(""), Err(InputError::NotAnInteger));
        assert_eq!(parse_custom_amount("-5"), Err(InputError::NotPositive));
        assert_eq!(parse_custom_amount("0"), Err(InputError::NotPositive));
    }

    #[test]
    fn rejected_input_leaves_state_untouched() {
        let mut state = AppState::default();
        state.apply(Command::AddAmount(600));
        for bad in ["-5", "abc", "0"] {
            assert!(state.add_custom(bad).is_err());
            assert_eq!(state.consumption, 600);
        }
        assert_eq!(state.add_custom("100"), Ok(Applied::Redraw));
        assert_eq!(state.consumption, 700);
    }

    #[test]
    fn warning_messages() {
        let w = Warning::invalid_entry(InputError::NotPositive);
        assert_eq!(w.title, "Invalid Entry");
        assert_eq!(w.message, "Please enter a positive integer.");
        let w = Warning::invalid_entry(InputError::NotAnInteger);
        assert_eq!(w.message, "Please enter a valid integer.");
        let w = Warning::sound_error(&AppError::Sound("bad header".into()));
        assert_eq!(w.title, "Sound Error");
        assert!(w.message.starts_with("Could not play custom sound:\n"));
        assert!(w.message.contains("bad header"));
    }

    #[test]
    fn persisted_round_trip_keeps_zero_interval() {
        let saved = PersistedState {
            total_consumed: 450,
            custom_sound: String::new(),
            reminder_interval: 0,
        };
        let state = AppState::from_persisted(&saved);
        assert_eq!(state.reminder.interval_minutes, 0);
        assert_eq!(state.reminder.sound_path, None);
        assert_eq!(state.to_persisted(), saved);
    }

    #[test]
    fn sound_path_round_trips_and_is_trimmed() {
        let saved = PersistedState {
            total_consumed: 0,
            custom_sound: "  /tmp/ding.wav ".into(),
            reminder_interval: 10,
        };
        let state = AppState::from_persisted(&saved);
        assert_eq!(state.reminder.sound_path, Some(PathBuf::from("/tmp/ding.wav")));
        assert_eq!(state.sound_label(), "ding.wav");
        assert_eq!(state.to_persisted().custom_sound, "/tmp/ding.wav");
    }

    #[test]
    fn sound_commands_are_forwarded_to_reminder() {
        let mut state = AppState::default();
        assert_eq!(state.sound_label(), "No sound selected");
        assert_eq!(
            state.apply(Command::ChooseSound("/a/b/chime.mp3".into())),
            Applied::Reminder(Control::SetSound(Some("/a/b/chime.mp3".into())))
        );
        assert_eq!(state.sound_label(), "chime.mp3");
        assert_eq!(
            state.apply(Command::ClearSound),
            Applied::Reminder(Control::SetSound(None))
        );
        assert_eq!(state.reminder.sound_path, None);
    }

    #[test]
    fn reminder_commands_are_forwarded() {
        let mut state = AppState::default();
        assert_eq!(
            state.apply(Command::SetInterval(0)),
            Applied::Reminder(Control::SetInterval(0))
        );
        assert_eq!(state.reminder.interval_minutes, 0);
        assert_eq!(
            state.apply(Command::ToggleReminder),
            Applied::Reminder(Control::Toggle)
        );
    }

    #[test]
    fn minimize_to_tray_flag() {
        let mut state = AppState::default();
        assert_eq!(state.apply(Command::SetMinimizeToTray(true)), Applied::Updated);
        assert!(state.minimize_to_tray);
    }
}
