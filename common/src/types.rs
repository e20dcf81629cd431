//! 撮影データの型定義
//!
//! CLIとWeb(WASM)で共有される型:
//! - CaptureTarget: 撮影対象（点検箇所または書類のページ）
//! - CapturedDocument: 書類撮影の完成品
//! - InspectionReport: 点検撮影の完成品

use crate::image::EncodedImage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 撮影対象の定義（画像なし）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetSpec {
    pub id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TargetSpec {
    pub fn new(id: &str, display_name: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            description: (!description.is_empty()).then(|| description.to_string()),
        }
    }
}

/// 撮影対象
///
/// 完了フラグは画像の有無から導出するので、`completed == image.is_some()` が常に成り立つ。
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureTarget {
    pub id: String,
    pub display_name: String,
    pub description: Option<String>,
    image: Option<EncodedImage>,
}

impl CaptureTarget {
    pub fn from_spec(spec: TargetSpec) -> Self {
        Self {
            id: spec.id,
            display_name: spec.display_name,
            description: spec.description,
            image: None,
        }
    }

    pub fn image(&self) -> Option<&EncodedImage> {
        self.image.as_ref()
    }

    pub fn completed(&self) -> bool {
        self.image.is_some()
    }

    pub(crate) fn set_image(&mut self, image: EncodedImage) {
        self.image = Some(image);
    }

    pub(crate) fn take_image(&mut self) -> Option<EncodedImage> {
        self.image.take()
    }
}

/// 書類の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentType {
    BillOfLading,
    Manifest,
    InspectionReport,
    Other,
}

impl DocumentType {
    pub const ALL: [DocumentType; 4] = [
        DocumentType::BillOfLading,
        DocumentType::Manifest,
        DocumentType::InspectionReport,
        DocumentType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::BillOfLading => "bill-of-lading",
            DocumentType::Manifest => "manifest",
            DocumentType::InspectionReport => "inspection-report",
            DocumentType::Other => "other",
        }
    }

    /// 画面表示用の名称
    pub fn label(&self) -> &'static str {
        match self {
            DocumentType::BillOfLading => "船荷証券",
            DocumentType::Manifest => "配送マニフェスト",
            DocumentType::InspectionReport => "点検報告書",
            DocumentType::Other => "その他の書類",
        }
    }
}

impl std::str::FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bill-of-lading" | "bol" => Ok(DocumentType::BillOfLading),
            "manifest" => Ok(DocumentType::Manifest),
            "inspection-report" | "report" => Ok(DocumentType::InspectionReport),
            "other" => Ok(DocumentType::Other),
            _ => Err(format!(
                "Unknown document type: {}. Use bill-of-lading, manifest, inspection-report, or other",
                s
            )),
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 書類撮影の完成品
///
/// `converted` は後処理キューが成功したときにだけ true になる。
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedDocument {
    pub id: String,
    pub name: String,
    pub document_type: DocumentType,
    pub pages: Vec<EncodedImage>,
    pub converted: bool,
    pub created_at: DateTime<Utc>,
}

impl CapturedDocument {
    pub fn total_bytes(&self) -> u64 {
        self.pages.iter().map(|p| p.len() as u64).sum()
    }
}

/// 点検撮影の完成品
#[derive(Debug, Clone, PartialEq)]
pub struct InspectionReport {
    pub id: String,
    pub title: String,
    pub points: Vec<CaptureTarget>,
    /// 全箇所を撮影済みか
    pub complete: bool,
    pub created_at: DateTime<Utc>,
}

impl InspectionReport {
    pub fn photo_count(&self) -> usize {
        self.points.iter().filter(|p| p.completed()).count()
    }

    pub fn total_bytes(&self) -> u64 {
        self.points
            .iter()
            .filter_map(|p| p.image())
            .map(|img| img.len() as u64)
            .sum()
    }
}

/// トラック点検の標準チェックリスト（表示順）
pub fn truck_checklist() -> Vec<TargetSpec> {
    vec![
        TargetSpec::new("front", "前面", "バンパー、ライト、フロントガラス"),
        TargetSpec::new("driver-side", "運転席側", "側面パネル、ミラー、ドア"),
        TargetSpec::new("passenger-side", "助手席側", "側面パネル、ミラー、ドア"),
        TargetSpec::new("rear", "後面", "リアバンパー、ライト、ナンバープレート"),
        TargetSpec::new("engine", "エンジンルーム", "エンジン状態、油脂類、ベルト"),
        TargetSpec::new("cabin", "運転室", "ダッシュボード、座席、操作系"),
    ]
}
