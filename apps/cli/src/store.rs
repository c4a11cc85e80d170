//! TOML 配置持久化（`ConfigStore` 的文件实现）
//!
//! 核心只通过 [`ConfigStore`] 边界触发持久化，文件 I/O 全部在这里。

use std::fs;
use std::path::PathBuf;

use spincoat_control::config::ConfigStoreError;
use spincoat_control::{CoaterConfig, ConfigStore};

pub struct TomlConfigStore {
    path: PathBuf,
}

impl TomlConfigStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// 加载配置；文件不存在时落盘默认值并返回之
    pub fn load_or_default(&self) -> Result<CoaterConfig, ConfigStoreError> {
        if self.path.exists() {
            self.load()
        } else {
            let config = CoaterConfig::default();
            self.save(&config)?;
            Ok(config)
        }
    }
}

impl ConfigStore for TomlConfigStore {
    fn load(&self) -> Result<CoaterConfig, ConfigStoreError> {
        let text = fs::read_to_string(&self.path)
            .map_err(|e| ConfigStoreError(format!("read {}: {e}", self.path.display())))?;
        toml::from_str(&text).map_err(|e| ConfigStoreError(format!("parse: {e}")))
    }

    fn save(&self, config: &CoaterConfig) -> Result<(), ConfigStoreError> {
        let text = toml::to_string_pretty(config)
            .map_err(|e| ConfigStoreError(format!("serialize: {e}")))?;
        fs::write(&self.path, text)
            .map_err(|e| ConfigStoreError(format!("write {}: {e}", self.path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = TomlConfigStore::new(dir.path().join("spincoat.toml"));

        let mut config = CoaterConfig::default();
        config.coating_rpm = 4500.0;
        config.pid.kp = 0.0003;
        store.save(&config).unwrap();

        assert_eq!(store.load().unwrap(), config);
    }

    #[test]
    fn test_load_or_default_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spincoat.toml");
        let store = TomlConfigStore::new(path.clone());

        let config = store.load_or_default().unwrap();
        assert_eq!(config, CoaterConfig::default());
        assert!(path.exists());
    }
}
