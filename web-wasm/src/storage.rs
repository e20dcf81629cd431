//! 設定の保存（localStorage）
//!
//! 読めない値や範囲外の値は既定値に戻す。

use gloo::storage::{LocalStorage, Storage};
use serde::de::DeserializeOwned;
use serde::Serialize;
use truck_capture_common::{CaptureSettings, UploadSettings};

const CAPTURE_SETTINGS_KEY: &str = "truck-capture.capture-settings";
const UPLOAD_SETTINGS_KEY: &str = "truck-capture.upload-settings";

fn load_or_default<T, F>(key: &str, is_valid: F) -> T
where
    T: DeserializeOwned + Default,
    F: Fn(&T) -> bool,
{
    match LocalStorage::get::<T>(key) {
        Ok(value) if is_valid(&value) => value,
        Ok(_) => {
            gloo::console::warn!(format!("保存された設定が不正なため既定値を使用: {}", key));
            T::default()
        }
        Err(_) => T::default(),
    }
}

fn save<T: Serialize>(key: &str, value: &T) -> Result<(), String> {
    LocalStorage::set(key, value).map_err(|e| e.to_string())
}

pub fn load_capture_settings() -> CaptureSettings {
    load_or_default(CAPTURE_SETTINGS_KEY, |s: &CaptureSettings| s.validate().is_ok())
}

pub fn save_capture_settings(settings: &CaptureSettings) -> Result<(), String> {
    settings.validate().map_err(|e| e.to_string())?;
    save(CAPTURE_SETTINGS_KEY, settings)
}

pub fn load_upload_settings() -> UploadSettings {
    load_or_default(UPLOAD_SETTINGS_KEY, |s: &UploadSettings| s.validate().is_ok())
}

pub fn save_upload_settings(settings: &UploadSettings) -> Result<(), String> {
    settings.validate().map_err(|e| e.to_string())?;
    save(UPLOAD_SETTINGS_KEY, settings)
}
