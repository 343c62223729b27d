//! 提示音：播放用户选择的音频文件，失败或未选择时退回系统提示音。
//! 所有播放都不阻塞调用线程。

use std::path::Path;

use crate::error::{AppError, Result};

/// 提醒到点时的声音出口
pub trait Alerts {
    /// 非阻塞地播放音频文件；文件无法打开或解码时返回错误
    fn play_file(&mut self, path: &Path) -> Result<()>;
    /// 后备提示音
    fn bell(&mut self);
    /// 取出一条已开始、但随后失败的播放（如外部播放器以非 0 状态退出）
    fn take_failure(&mut self) -> Option<AppError> {
        None
    }
}

/// 默认实现：Windows/macOS 用 rodio，Linux 交给系统播放器进程
pub struct SoundPlayer {
    #[cfg(any(windows, target_os = "macos"))]
    output: Option<(rodio::OutputStream, rodio::OutputStreamHandle)>,
    #[cfg(not(any(windows, target_os = "macos")))]
    players: Vec<String>,
    #[cfg(not(any(windows, target_os = "macos")))]
    failures: (
        crossbeam_channel::Sender<AppError>,
        crossbeam_channel::Receiver<AppError>,
    ),
}

#[cfg(any(windows, target_os = "macos"))]
impl Default for SoundPlayer {
    fn default() -> Self {
        Self { output: None }
    }
}

#[cfg(not(any(windows, target_os = "macos")))]
impl Default for SoundPlayer {
    fn default() -> Self {
        Self::with_players(["paplay", "aplay"])
    }
}

impl SoundPlayer {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(any(windows, target_os = "macos"))]
impl SoundPlayer {
    /// 首次播放时才打开输出设备，之后复用
    fn handle(&mut self) -> Result<&rodio::OutputStreamHandle> {
        if self.output.is_none() {
            let pair = rodio::OutputStream::try_default()
                .map_err(|e| AppError::Sound(e.to_string()))?;
            self.output = Some(pair);
        }
        match &self.output {
            Some((_, handle)) => Ok(handle),
            None => Err(AppError::Sound("no audio output".into())),
        }
    }
}

#[cfg(not(any(windows, target_os = "macos")))]
impl SoundPlayer {
    /// 按顺序尝试的播放器命令
    pub fn with_players<I, S>(players: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            players: players.into_iter().map(Into::into).collect(),
            failures: crossbeam_channel::unbounded(),
        }
    }

    /// 后台等待播放器退出，非 0 退出码作为失败送回
    fn reap(&self, player: String, mut child: std::process::Child) -> Result<()> {
        let failures = self.failures.0.clone();
        std::thread::Builder::new()
            .name("sound-reaper".into())
            .spawn(move || {
                let failure = match child.wait() {
                    Ok(status) if status.success() => return,
                    Ok(status) => AppError::Sound(format!("{player} exited with {status}")),
                    Err(e) => AppError::Sound(format!("{player}: {e}")),
                };
                tracing::debug!(error = %failure, "sound player failed");
                let _ = failures.send(failure);
            })?;
        Ok(())
    }
}

impl Alerts for SoundPlayer {
    #[cfg(any(windows, target_os = "macos"))]
    fn play_file(&mut self, path: &Path) -> Result<()> {
        use std::io::BufReader;

        let file = std::fs::File::open(path)?;
        // 先解码再交给 sink，格式错误能立刻反馈
        let source = rodio::Decoder::new(BufReader::new(file))
            .map_err(|e| AppError::Sound(e.to_string()))?;
        let sink =
            rodio::Sink::try_new(self.handle()?).map_err(|e| AppError::Sound(e.to_string()))?;
        sink.append(source);
        sink.detach();
        Ok(())
    }

    #[cfg(not(any(windows, target_os = "macos")))]
    fn play_file(&mut self, path: &Path) -> Result<()> {
        use std::process::{Command, Stdio};

        if !path.is_file() {
            return Err(AppError::Sound(format!("{} is not a file", path.display())));
        }
        let mut last_err = None;
        for player in &self.players {
            let spawned = Command::new(player)
                .arg(path)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn();
            match spawned {
                Ok(child) => return self.reap(player.clone(), child),
                Err(e) => last_err = Some(e),
            }
        }
        Err(AppError::Sound(match last_err {
            Some(e) => format!("no audio player available: {e}"),
            None => "no audio player configured".into(),
        }))
    }

    #[cfg(not(any(windows, target_os = "macos")))]
    fn take_failure(&mut self) -> Option<AppError> {
        self.failures.1.try_recv().ok()
    }

    fn bell(&mut self) {
        #[cfg(windows)]
        {
            use windows_sys::Win32::UI::WindowsAndMessaging::{MB_OK, MessageBeep};
            unsafe { MessageBeep(MB_OK) };
        }
        #[cfg(target_os = "macos")]
        {
            let _ = std::process::Command::new("osascript")
                .args(["-e", "beep"])
                .spawn();
        }
        #[cfg(not(any(windows, target_os = "macos")))]
        {
            eprint!("\x07");
        }
    }
}

#[cfg(all(test, not(any(windows, target_os = "macos"))))]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::{Duration, Instant};

    fn sound_file() -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"not really audio").unwrap();
        f
    }

    fn wait_for_failure(player: &mut SoundPlayer, within: Duration) -> Option<AppError> {
        let deadline = Instant::now() + within;
        while Instant::now() < deadline {
            if let Some(e) = player.take_failure() {
                return Some(e);
            }
            std::thread::sleep(Duration::from_millis(20));
        }
        None
    }

    #[test]
    fn player_exit_failure_is_reported_later() {
        let file = sound_file();
        let mut player = SoundPlayer::with_players(["false"]);
        assert!(player.play_file(file.path()).is_ok());
        let failure = wait_for_failure(&mut player, Duration::from_secs(5))
            .expect("failing player should be reported");
        assert!(failure.to_string().contains("false exited with"));
    }

    #[test]
    fn player_exit_success_reports_nothing() {
        let file = sound_file();
        let mut player = SoundPlayer::with_players(["true"]);
        assert!(player.play_file(file.path()).is_ok());
        assert!(wait_for_failure(&mut player, Duration::from_millis(300)).is_none());
    }

    #[test]
    fn falls_through_to_next_player() {
        let file = sound_file();
        let mut player = SoundPlayer::with_players(["water-tracker-no-such-player", "false"]);
        assert!(player.play_file(file.path()).is_ok());
        assert!(wait_for_failure(&mut player, Duration::from_secs(5)).is_some());
    }

    #[test]
    fn missing_player_or_file_fails_immediately() {
        let file = sound_file();
        let mut player = SoundPlayer::with_players(["water-tracker-no-such-player"]);
        assert!(matches!(player.play_file(file.path()), Err(AppError::Sound(_))));
        let mut player = SoundPlayer::with_players(["true"]);
        assert!(player.play_file(Path::new("/nonexistent/ding.wav")).is_err());
    }
}
