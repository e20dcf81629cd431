use thiserror::Error;
use truck_capture_common::CaptureError;

#[derive(Error, Debug)]
pub enum TruckCaptureError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("フォルダが見つかりません: {0}")]
    FolderNotFound(String),

    #[error("フレーム画像が見つかりません: {0}")]
    NoFramesFound(String),

    #[error("画像読み込みエラー: {0}")]
    ImageLoad(String),

    #[error("画像エンコードエラー: {0}")]
    Encode(String),

    #[error("撮影エラー: {0}")]
    Capture(#[from] CaptureError),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("CLI実行エラー: {0}")]
    CliExecution(String),
}

impl From<truck_capture_common::Error> for TruckCaptureError {
    fn from(err: truck_capture_common::Error) -> Self {
        match err {
            truck_capture_common::Error::Json(e) => TruckCaptureError::JsonParse(e),
            truck_capture_common::Error::Config(msg) => TruckCaptureError::Config(msg),
        }
    }
}

pub type Result<T> = std::result::Result<T, TruckCaptureError>;
