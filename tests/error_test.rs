//! エラーケーステスト
//!
//! 各種エラー条件でのエラーハンドリングを検証

use std::path::Path;
use tempfile::tempdir;
use truck_capture::error::TruckCaptureError;
use truck_capture::scanner;
use truck_capture_common::{CaptureError, FlowState};

/// 存在しないフォルダをスキャンした場合
#[test]
fn test_scan_nonexistent_folder() {
    let result = scanner::scan_frames(Path::new("/nonexistent/path/12345"));

    let err = result.unwrap_err();
    assert!(matches!(err, TruckCaptureError::FolderNotFound(_)));
}

/// 画像のないフォルダは空のVec
#[test]
fn test_scan_folder_no_images() {
    let dir = tempdir().expect("Failed to create temp dir");
    std::fs::write(dir.path().join("memo.txt"), "hello").unwrap();

    let frames = scanner::scan_frames(dir.path()).unwrap();
    assert!(frames.is_empty());
}

/// TruckCaptureErrorのDisplay実装確認
#[test]
fn test_error_display() {
    let errors = vec![
        TruckCaptureError::Config("テスト設定エラー".to_string()),
        TruckCaptureError::FolderNotFound("/path/to/folder".to_string()),
        TruckCaptureError::NoFramesFound("frames".to_string()),
        TruckCaptureError::ImageLoad("broken.jpg".to_string()),
        TruckCaptureError::Encode("JPEGエラー".to_string()),
        TruckCaptureError::CliExecution("入力エラー".to_string()),
    ];

    for err in errors {
        let display = format!("{}", err);
        assert!(!display.is_empty(), "エラーメッセージが空: {:?}", err);
    }
}

/// 撮影エラーからの変換
#[test]
fn test_capture_error_conversion() {
    let err: TruckCaptureError = CaptureError::PermissionDenied("NotAllowedError".into()).into();

    assert!(matches!(
        err,
        TruckCaptureError::Capture(CaptureError::PermissionDenied(_))
    ));
    let display = format!("{}", err);
    assert!(display.contains("撮影エラー"));
    assert!(display.contains("拒否"));
}

/// 状態遷移エラーのメッセージ
#[test]
fn test_invalid_transition_message() {
    let err = CaptureError::InvalidTransition {
        state: FlowState::Idle,
        action: "capture",
    };
    let display = format!("{}", err);

    assert!(display.contains("Idle"));
    assert!(display.contains("capture"));
    assert_eq!(err.title(), "操作できません");
}

/// IOエラーからの変換
#[test]
fn test_io_error_conversion() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let err: TruckCaptureError = io_err.into();

    assert!(matches!(err, TruckCaptureError::Io(_)));
    assert!(format!("{}", err).contains("IO"));
}

/// JSONエラーからの変換
#[test]
fn test_json_error_conversion() {
    let json_err = serde_json::from_str::<serde_json::Value>("{ invalid }").unwrap_err();
    let err: TruckCaptureError = json_err.into();

    assert!(matches!(err, TruckCaptureError::JsonParse(_)));
}

/// common::Errorからの変換
#[test]
fn test_common_error_conversion() {
    let err: TruckCaptureError = truck_capture_common::Error::Config("品質が範囲外".into()).into();

    assert!(matches!(err, TruckCaptureError::Config(_)));
    assert!(format!("{}", err).contains("品質が範囲外"));
}
