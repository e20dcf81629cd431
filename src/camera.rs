//! フォルダ再生カメラ
//!
//! 端末カメラの代わりに、フォルダ内の静止画を1枚ずつフレームとして返す。
//! 撮影時はフレーム本来の解像度のままJPEGに再エンコードする。

use crate::error::{Result, TruckCaptureError};
use crate::scanner::{scan_frames, FrameInfo};
use image::codecs::jpeg::JpegEncoder;
use image::ImageReader;
use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::time::Duration;
use truck_capture_common::{
    CameraDevice, CaptureError, CaptureResult, EncodedImage, StreamConstraints, Timer,
};

pub struct FolderCamera {
    folder: PathBuf,
}

impl FolderCamera {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }
}

/// 再生中のフレーム列
pub struct FolderStream {
    frames: Vec<FrameInfo>,
    cursor: Cell<usize>,
}

impl FolderStream {
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// 次のフレーム（末尾の次は先頭に戻る）
    fn next_frame(&self) -> &FrameInfo {
        let index = self.cursor.get();
        self.cursor.set((index + 1) % self.frames.len());
        &self.frames[index]
    }
}

impl CameraDevice for FolderCamera {
    type Stream = FolderStream;

    async fn request_stream(&self, constraints: &StreamConstraints) -> CaptureResult<FolderStream> {
        tracing::debug!(
            folder = %self.folder.display(),
            facing = constraints.facing.as_str(),
            "フレームフォルダを開く"
        );

        match scan_frames(&self.folder) {
            Ok(frames) if frames.is_empty() => Err(CaptureError::DeviceUnavailable(
                TruckCaptureError::NoFramesFound(self.folder.display().to_string()).to_string(),
            )),
            Ok(frames) => Ok(FolderStream {
                frames,
                cursor: Cell::new(0),
            }),
            Err(TruckCaptureError::Io(e)) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                Err(CaptureError::PermissionDenied(format!(
                    "{}: {}",
                    self.folder.display(),
                    e
                )))
            }
            Err(e) => Err(CaptureError::DeviceUnavailable(e.to_string())),
        }
    }

    async fn draw_frame(&self, stream: &FolderStream, quality: f32) -> CaptureResult<EncodedImage> {
        let frame = stream.next_frame();
        encode_frame(&frame.path, quality)
            .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))
    }

    fn stop_stream(&self, stream: FolderStream) -> CaptureResult<()> {
        tracing::debug!(frames = stream.frame_count(), "フレーム再生を停止");
        Ok(())
    }
}

/// 画像ファイルを読み込み、元の解像度のままJPEGにエンコードする
pub fn encode_frame(path: &Path, quality: f32) -> Result<EncodedImage> {
    let image = ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|e| TruckCaptureError::ImageLoad(format!("{}: {}", path.display(), e)))?;

    // JPEGはアルファを持てない
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();

    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, jpeg_quality(quality))
        .encode_image(&rgb)
        .map_err(|e| TruckCaptureError::Encode(e.to_string()))?;

    Ok(EncodedImage::jpeg(width, height, bytes))
}

/// 0.0〜1.0 の品質を JPEG の 1〜100 に変換
pub fn jpeg_quality(quality: f32) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

/// tokioのタイマー
pub struct TokioTimer;

impl Timer for TokioTimer {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jpeg_quality() {
        assert_eq!(jpeg_quality(0.8), 80);
        assert_eq!(jpeg_quality(0.0), 1);
        assert_eq!(jpeg_quality(1.0), 100);
        assert_eq!(jpeg_quality(0.755), 76);
    }
}
