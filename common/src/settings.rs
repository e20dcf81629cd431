//! 撮影設定

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_JPEG_QUALITY: f32 = 0.8;

/// カメラの向き
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    /// 背面カメラ
    #[default]
    Environment,
    /// 前面カメラ
    User,
}

impl Facing {
    pub fn as_str(&self) -> &'static str {
        match self {
            Facing::Environment => "environment",
            Facing::User => "user",
        }
    }
}

/// 希望解像度（デバイスが近い値を選ぶ）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

/// カメラ要求の制約
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConstraints {
    pub facing: Facing,
    pub ideal: Resolution,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptureSettings {
    pub facing: Facing,
    pub ideal_width: u32,
    pub ideal_height: u32,
    pub jpeg_quality: f32,
    pub acquisition_timeout_ms: u64,
    /// 書類撮影ではページごとにカメラを閉じない
    pub keep_camera_open_for_pages: bool,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            facing: Facing::Environment,
            ideal_width: 1920,
            ideal_height: 1080,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            acquisition_timeout_ms: 10_000,
            keep_camera_open_for_pages: true,
        }
    }
}

impl CaptureSettings {
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: CaptureSettings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.jpeg_quality) {
            return Err(Error::Config(format!(
                "JPEG品質は0.0〜1.0で指定してください: {}",
                self.jpeg_quality
            )));
        }
        if self.ideal_width == 0 || self.ideal_height == 0 {
            return Err(Error::Config(format!(
                "解像度が不正です: {}x{}",
                self.ideal_width, self.ideal_height
            )));
        }
        if self.acquisition_timeout_ms == 0 {
            return Err(Error::Config("タイムアウトは1ms以上にしてください".into()));
        }
        Ok(())
    }

    pub fn constraints(&self) -> StreamConstraints {
        StreamConstraints {
            facing: self.facing,
            ideal: Resolution {
                width: self.ideal_width,
                height: self.ideal_height,
            },
        }
    }

    pub fn acquisition_timeout(&self) -> Duration {
        Duration::from_millis(self.acquisition_timeout_ms)
    }
}

/// 品質を0.0〜1.0に収める（NaNは既定値）
pub fn clamp_quality(quality: f32) -> f32 {
    if quality.is_nan() {
        DEFAULT_JPEG_QUALITY
    } else {
        quality.clamp(0.0, 1.0)
    }
}
