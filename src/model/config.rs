//! アプリケーション設定管理モジュール
//!
//! 計算デバイス、モデル、保存先、カメラコマンドをJSON形式で保存・読み込みします。

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::model::model_storage::DEFAULT_MODEL_FILE;

/// 計算デバイスの種類
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum DeviceType {
    /// WGPU (GPU) バックエンド（`gpu` feature が必要）
    Wgpu,
    /// NdArray (CPU) バックエンド
    #[default]
    Cpu,
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceType::Wgpu => write!(f, "WGPU (GPU)"),
            DeviceType::Cpu => write!(f, "CPU (NdArray)"),
        }
    }
}

/// モデル設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSettings {
    /// 起動時に読み込むモデルバンドルのパス
    pub model_path: String,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model_path: format!("assets/{}", DEFAULT_MODEL_FILE),
        }
    }
}

/// 画像の保存先
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// アプリ専用の撮影画像ディレクトリ
    pub pictures_dir: String,
    /// 共有メディアライブラリのルート（"Pictures" 以下に保存）
    pub media_library_dir: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            pictures_dir: "data/Pictures".to_string(),
            media_library_dir: "media".to_string(),
        }
    }
}

/// カメラ設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraSettings {
    /// 撮影コマンド（argv）。`{output}` は保存先パスに置換される
    pub command: Vec<String>,
    /// 権限確認をスキップする
    #[serde(default)]
    pub auto_grant: bool,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            command: vec![
                "fswebcam".to_string(),
                "--no-banner".to_string(),
                "-r".to_string(),
                "1280x720".to_string(),
                "{output}".to_string(),
            ],
            auto_grant: false,
        }
    }
}

/// アプリケーション設定
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// 計算デバイスの種類
    #[serde(default)]
    pub device_type: DeviceType,
    /// モデル設定
    #[serde(default)]
    pub model: ModelSettings,
    /// 保存先設定
    #[serde(default)]
    pub storage: StorageSettings,
    /// カメラ設定
    #[serde(default)]
    pub camera: CameraSettings,
}

impl AppConfig {
    /// 設定ファイルのデフォルトパス
    pub fn default_path() -> PathBuf {
        PathBuf::from("config.json")
    }

    /// 設定を読み込む
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// 指定パスから設定を読み込む、存在しないか壊れている場合はデフォルト設定を返す
    pub fn load_or_default_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!("設定ファイルが存在しません。デフォルト設定を使用します");
            return Self::default();
        }

        match Self::load(path) {
            Ok(config) => {
                tracing::info!("設定ファイルを読み込みました: {}", path.display());
                config
            }
            Err(e) => {
                tracing::warn!(
                    "設定ファイルの読み込みに失敗しました ({}): {}。デフォルト設定を使用します",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// デフォルトパスから設定を読み込む
    pub fn load_or_default() -> Self {
        Self::load_or_default_from(Self::default_path())
    }

    /// 設定を保存する
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// モデルパスを設定
    pub fn set_model_path(&mut self, path: String) {
        self.model.model_path = path;
    }

    /// 設定情報を表示用テキストにする
    pub fn describe(&self) -> String {
        format!(
            "=== アプリケーション設定 ===\n\
             計算デバイス: {}\n\
             モデルパス: {}\n\
             撮影画像: {}\n\
             メディアライブラリ: {}\n\
             カメラコマンド: {}\n\
             ========================",
            self.device_type,
            self.model.model_path,
            self.storage.pictures_dir,
            self.storage.media_library_dir,
            self.camera.command.join(" "),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.device_type, DeviceType::Cpu);
        assert!(config.model.model_path.ends_with(DEFAULT_MODEL_FILE));
        assert!(config.camera.command.iter().any(|a| a == "{output}"));
        assert!(!config.camera.auto_grant);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = AppConfig::default();
        config.set_model_path("models/custom.tar.gz".to_string());
        config.device_type = DeviceType::Wgpu;
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.model.model_path, "models/custom.tar.gz");
        assert_eq!(loaded.device_type, DeviceType::Wgpu);
    }

    #[test]
    fn test_partial_file_uses_section_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "camera": { "command": ["raspistill", "-o", "{output}"] } }"#).unwrap();

        let config = AppConfig::load_or_default_from(&path);
        assert_eq!(config.camera.command[0], "raspistill");
        assert_eq!(config.storage.pictures_dir, "data/Pictures");
        assert_eq!(config.device_type, DeviceType::Cpu);
    }

    #[test]
    fn test_broken_file_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ broken").unwrap();

        let config = AppConfig::load_or_default_from(&path);
        assert_eq!(config.storage.media_library_dir, "media");
    }

    #[test]
    fn test_device_type_display() {
        assert_eq!(format!("{}", DeviceType::Wgpu), "WGPU (GPU)");
        assert_eq!(format!("{}", DeviceType::Cpu), "CPU (NdArray)");
    }
}
