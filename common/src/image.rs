//! エンコード済み画像
//!
//! カメラのフレームを非可逆形式（既定はJPEG）で保存したもの。
//! 幅と高さは表示サイズではなくフレーム本来のピクセル数。

use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::fmt;

pub const DEFAULT_MIME_TYPE: &str = "image/jpeg";

#[derive(Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

impl EncodedImage {
    pub fn jpeg(width: u32, height: u32, bytes: Vec<u8>) -> Self {
        Self {
            mime_type: DEFAULT_MIME_TYPE.to_string(),
            width,
            height,
            bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// "data:image/jpeg;base64,..." 形式に変換
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.bytes))
    }

    /// Data URLから復元
    ///
    /// canvasの`toDataURL`はサイズを持たないため、呼び出し側が渡す。
    pub fn from_data_url(data_url: &str, width: u32, height: u32) -> Option<Self> {
        let payload = extract_base64_from_data_url(data_url)?;
        let bytes = STANDARD.decode(payload).ok()?;
        Some(Self {
            mime_type: extract_mime_type_from_data_url(data_url).to_string(),
            width,
            height,
            bytes,
        })
    }
}

// バイト列をそのまま出すとログが埋まる
impl fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedImage")
            .field("mime_type", &self.mime_type)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// Data URLからBase64データ部分を抽出
pub fn extract_base64_from_data_url(data_url: &str) -> Option<&str> {
    data_url.split_once(',').map(|(_, payload)| payload)
}

/// Data URLからMIMEタイプを抽出（取れなければimage/jpeg）
pub fn extract_mime_type_from_data_url(data_url: &str) -> &str {
    data_url
        .strip_prefix("data:")
        .and_then(|rest| rest.split(|c: char| c == ';' || c == ',').next())
        .filter(|mime| !mime.is_empty())
        .unwrap_or(DEFAULT_MIME_TYPE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_url_roundtrip() {
        let image = EncodedImage::jpeg(1920, 1080, vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00]);
        let url = image.to_data_url();
        assert!(url.starts_with("data:image/jpeg;base64,"));

        let restored = EncodedImage::from_data_url(&url, 1920, 1080).expect("復元失敗");
        assert_eq!(restored, image);
    }

    #[test]
    fn test_from_data_url_png() {
        let restored = EncodedImage::from_data_url("data:image/png;base64,AAEC", 2, 1).unwrap();
        assert_eq!(restored.mime_type, "image/png");
        assert_eq!(restored.bytes, vec![0, 1, 2]);
    }

    #[test]
    fn test_from_data_url_invalid() {
        assert!(EncodedImage::from_data_url("no separator", 1, 1).is_none());
        assert!(EncodedImage::from_data_url("data:image/jpeg;base64,@@@", 1, 1).is_none());
    }

    #[test]
    fn test_extract_mime_type_default() {
        assert_eq!(extract_mime_type_from_data_url("garbage,AAAA"), "image/jpeg");
        assert_eq!(extract_mime_type_from_data_url("data:;base64,AAAA"), "image/jpeg");
    }

    #[test]
    fn test_debug_hides_bytes() {
        let image = EncodedImage::jpeg(4, 3, vec![1; 512]);
        let debug = format!("{:?}", image);
        assert!(debug.contains("bytes: 512"));
    }
}
