use crate::error::{Result, TruckCaptureError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use truck_capture_common::{CaptureSettings, UploadSettings};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub capture: CaptureSettings,
    pub upload: UploadSettings,
    /// 撮影結果の出力先（未設定ならカレントディレクトリ）
    pub output_dir: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| TruckCaptureError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("truck-capture").join("config.json"))
    }

    pub fn validate(&self) -> Result<()> {
        self.capture.validate()?;
        self.upload.validate()?;
        Ok(())
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn set_jpeg_quality(&mut self, quality: f32) -> Result<()> {
        let mut capture = self.capture.clone();
        capture.jpeg_quality = quality;
        capture.validate()?;
        self.capture = capture;
        Ok(())
    }

    pub fn set_timeout_ms(&mut self, timeout_ms: u64) -> Result<()> {
        let mut capture = self.capture.clone();
        capture.acquisition_timeout_ms = timeout_ms;
        capture.validate()?;
        self.capture = capture;
        Ok(())
    }
}
