//! アップロード待ち行列と送信先設定
//!
//! 実際の送信は行わない。送信結果は呼び出し側が `complete` / `fail` で記録する。

use crate::error::{Error, Result};
use crate::types::{CapturedDocument, InspectionReport};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 送信先
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "url", rename_all = "kebab-case")]
pub enum UploadDestination {
    #[default]
    GoogleDrive,
    CustomUrl(String),
    Local,
}

impl UploadDestination {
    pub fn label(&self) -> &'static str {
        match self {
            UploadDestination::GoogleDrive => "Google Drive",
            UploadDestination::CustomUrl(_) => "カスタムURL",
            UploadDestination::Local => "端末に保存",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UploadSettings {
    pub destination: UploadDestination,
    pub auto_upload: bool,
    pub compression: bool,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            destination: UploadDestination::GoogleDrive,
            auto_upload: false,
            compression: true,
        }
    }
}

impl UploadSettings {
    pub fn validate(&self) -> Result<()> {
        if let UploadDestination::CustomUrl(url) = &self.destination {
            let url = url.trim();
            if url.is_empty() {
                return Err(Error::Config("アップロード先URLが未入力です".into()));
            }
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(Error::Config(format!(
                    "アップロード先URLはhttp(s)で指定してください: {}",
                    url
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadStatus {
    Pending,
    Uploading,
    Completed,
    Failed { reason: String },
}

impl UploadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStatus::Pending => "pending",
            UploadStatus::Uploading => "uploading",
            UploadStatus::Completed => "completed",
            UploadStatus::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadItem {
    /// 元の書類・点検のID
    pub id: String,
    pub name: String,
    pub file_count: usize,
    pub size_bytes: u64,
    pub status: UploadStatus,
    pub queued_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct UploadQueue {
    items: Vec<UploadItem>,
}

impl UploadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue_document(&mut self, document: &CapturedDocument) {
        self.enqueue(
            &document.id,
            &document.name,
            document.pages.len(),
            document.total_bytes(),
        );
    }

    pub fn enqueue_inspection(&mut self, report: &InspectionReport) {
        self.enqueue(
            &report.id,
            &report.title,
            report.photo_count(),
            report.total_bytes(),
        );
    }

    fn enqueue(&mut self, id: &str, name: &str, file_count: usize, size_bytes: u64) {
        if self.items.iter().any(|item| item.id == id) {
            return;
        }
        self.items.push(UploadItem {
            id: id.to_string(),
            name: name.to_string(),
            file_count,
            size_bytes,
            status: UploadStatus::Pending,
            queued_at: Utc::now(),
        });
    }

    pub fn items(&self) -> &[UploadItem] {
        &self.items
    }

    /// 送信待ち・送信中
    pub fn pending(&self) -> Vec<&UploadItem> {
        self.items
            .iter()
            .filter(|i| matches!(i.status, UploadStatus::Pending | UploadStatus::Uploading))
            .collect()
    }

    /// 完了・失敗（新しい順）
    pub fn history(&self) -> Vec<&UploadItem> {
        self.items
            .iter()
            .rev()
            .filter(|i| matches!(i.status, UploadStatus::Completed | UploadStatus::Failed { .. }))
            .collect()
    }

    pub fn pending_bytes(&self) -> u64 {
        self.pending().iter().map(|i| i.size_bytes).sum()
    }

    /// 送信待ちをすべて送信中にしてIDを返す
    pub fn begin_all(&mut self) -> Vec<String> {
        self.items
            .iter_mut()
            .filter(|i| i.status == UploadStatus::Pending)
            .map(|i| {
                i.status = UploadStatus::Uploading;
                i.id.clone()
            })
            .collect()
    }

    pub fn complete(&mut self, id: &str) -> bool {
        self.transition(id, UploadStatus::Completed)
    }

    pub fn fail(&mut self, id: &str, reason: &str) -> bool {
        self.transition(
            id,
            UploadStatus::Failed {
                reason: reason.to_string(),
            },
        )
    }

    /// 失敗した項目を送信待ちに戻す
    pub fn retry(&mut self, id: &str) -> bool {
        match self.items.iter_mut().find(|i| i.id == id) {
            Some(item) if matches!(item.status, UploadStatus::Failed { .. }) => {
                item.status = UploadStatus::Pending;
                true
            }
            _ => false,
        }
    }

    fn transition(&mut self, id: &str, status: UploadStatus) -> bool {
        match self.items.iter_mut().find(|i| i.id == id) {
            Some(item) if item.status == UploadStatus::Uploading => {
                item.status = status;
                true
            }
            _ => false,
        }
    }
}

/// バイト数を読みやすい単位に変換
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}
