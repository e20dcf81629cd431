//! エラー型定義

use crate::flow::FlowState;
use thiserror::Error;

/// 撮影フローのエラー
///
/// どれも回復可能で、コントローラは直前の状態に留まる。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CaptureError {
    #[error("カメラへのアクセスが拒否されました: {0}")]
    PermissionDenied(String),

    #[error("カメラを利用できません: {0}")]
    DeviceUnavailable(String),

    #[error("撮影対象が見つかりません: {0}")]
    UnknownTarget(String),

    #[error("ページ番号が範囲外です: {index} (ページ数 {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("カメラが起動していません")]
    NotActive,

    #[error("撮影済みの写真がありません")]
    EmptyCaptureSet,

    #[error("別のカメラ操作を処理中です")]
    Busy,

    #[error("{state:?} の状態では {action} を実行できません")]
    InvalidTransition { state: FlowState, action: &'static str },

    #[error("撮影はキャンセルされました")]
    Cancelled,
}

impl CaptureError {
    /// 撮影中の画面に出す短い見出し
    pub fn title(&self) -> &'static str {
        match self {
            CaptureError::PermissionDenied(_) => "カメラへのアクセスが拒否されました",
            CaptureError::DeviceUnavailable(_) => "カメラを利用できません",
            CaptureError::UnknownTarget(_) | CaptureError::IndexOutOfRange { .. } => {
                "対象が見つかりません"
            }
            CaptureError::NotActive => "カメラが起動していません",
            CaptureError::EmptyCaptureSet => "写真がありません",
            CaptureError::Busy => "処理中です",
            CaptureError::InvalidTransition { .. } => "操作できません",
            CaptureError::Cancelled => "キャンセルしました",
        }
    }
}

/// 共通エラー型（設定・シリアライズ）
#[derive(Error, Debug)]
pub enum Error {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;

/// 撮影フロー用のResult型エイリアス
pub type CaptureResult<T> = std::result::Result<T, CaptureError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_json() {
        let json_error = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let error = Error::Json(json_error);
        assert!(format!("{}", error).contains("JSON error"));
    }

    #[test]
    fn test_error_display_config() {
        let error = Error::Config("品質は0.0〜1.0で指定してください".to_string());
        assert_eq!(
            format!("{}", error),
            "Config error: 品質は0.0〜1.0で指定してください"
        );
    }

    #[test]
    fn test_error_from_json() {
        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error: Error = json_error.into();
        assert!(matches!(error, Error::Json(_)));
    }

    #[test]
    fn test_capture_error_display() {
        let error = CaptureError::IndexOutOfRange { index: 3, len: 2 };
        assert_eq!(format!("{}", error), "ページ番号が範囲外です: 3 (ページ数 2)");

        let error = CaptureError::InvalidTransition {
            state: FlowState::Idle,
            action: "capture",
        };
        assert!(format!("{}", error).contains("Idle"));
        assert!(format!("{}", error).contains("capture"));
    }

    #[test]
    fn test_capture_error_title() {
        assert_eq!(
            CaptureError::PermissionDenied("NotAllowedError".into()).title(),
            "カメラへのアクセスが拒否されました"
        );
        assert_eq!(CaptureError::Busy.title(), "処理中です");
    }
}
