//! JSON 持久化：饮水总量、提示音路径、提醒间隔
//!
//! 尽力而为：读失败用默认值，写失败由调用方记录日志后忽略。

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config;
use crate::error::Result;

/// 落盘的三个字段（键名即文件格式）
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedState {
    pub total_consumed: u64,
    pub custom_sound: String,
    pub reminder_interval: u32,
}

/// 固定位置的状态文件
#[derive(Clone, Debug)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 应用数据目录下的 water_data.json
    pub fn default_location() -> Self {
        Self::new(config::data_dir().join(config::DATA_FILENAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 读取状态；文件缺失、损坏或类型不符时返回默认值
    pub fn load(&self) -> PersistedState {
        match self.try_load() {
            Ok(state) => {
                debug!(path = %self.path.display(), ?state, "state loaded");
                state
            }
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "using default state");
                PersistedState::default()
            }
        }
    }

    fn try_load(&self) -> Result<PersistedState> {
        let text = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// 写入状态（目录不存在则创建）
    pub fn save(&self, state: &PersistedState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string(state)?;
        std::fs::write(&self.path, text)?;
        debug!(path = %self.path.display(), "state saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> Store {
        Store::new(dir.path().join("nested").join(config::DATA_FILENAME))
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let state = store_in(&dir).load();
        assert_eq!(state, PersistedState::default());
        assert_eq!(state.reminder_interval, 0);
        assert_eq!(state.custom_sound, "");
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        for state in [
            PersistedState::default(),
            PersistedState {
                total_consumed: 1650,
                custom_sound: "/home/me/sounds/drip.wav".into(),
                reminder_interval: 45,
            },
            PersistedState {
                total_consumed: 12_000,
                custom_sound: r"C:\Users\me\Music\ding ✓.mp3".into(),
                reminder_interval: 180,
            },
        ] {
            store.save(&state).unwrap();
            assert_eq!(store.load(), state);
        }
    }

    #[test]
    fn file_is_a_flat_object_with_fixed_keys() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store
            .save(&PersistedState {
                total_consumed: 300,
                custom_sound: String::new(),
                reminder_interval: 20,
            })
            .unwrap();
        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(
            raw,
            serde_json::json!({
                "total_consumed": 300,
                "custom_sound": "",
                "reminder_interval": 20
            })
        );
    }

    #[test]
    fn malformed_json_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        for text in ["{not json", "[]", r#"{"total_consumed": -4}"#, r#"{"total_consumed": "lots"}"#] {
            std::fs::write(store.path(), text).unwrap();
            assert_eq!(store.load(), PersistedState::default(), "input: {text}");
        }
    }

    #[test]
    fn missing_keys_fall_back_individually() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), r#"{"total_consumed": 900, "extra": true}"#).unwrap();
        let state = store.load();
        assert_eq!(state.total_consumed, 900);
        assert_eq!(state.custom_sound, "");
        assert_eq!(state.reminder_interval, 0);
    }

    #[test]
    fn save_into_unwritable_location_errors() {
        let dir = TempDir::new().unwrap();
        // 父路径是一个普通文件，无法创建目录
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let store = Store::new(blocker.join(config::DATA_FILENAME));
        assert!(store.save(&PersistedState::default()).is_err());
    }
}
