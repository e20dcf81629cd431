//! 撮影結果のディレクトリ出力
//!
//! 書類: `<doc-id>/page-NN.jpg` + `manifest.json`
//! 点検: `<insp-id>/<箇所ID>.jpg` + `manifest.json`

use crate::error::Result;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use truck_capture_common::{CapturedDocument, EncodedImage, InspectionReport, PostProcessor};

pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub id: String,
    /// "document" / "inspection"
    pub kind: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complete: Option<bool>,
    pub created_at: String,
    pub files: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub label: String,
    /// 未撮影の箇所はファイルなし
    pub file: Option<String>,
    pub width: u32,
    pub height: u32,
    pub bytes: u64,
    pub sha256: Option<String>,
}

pub struct DirectoryExporter {
    output_dir: PathBuf,
}

impl DirectoryExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// 書類を出力して出力先ディレクトリを返す
    pub fn write_document(&self, document: &CapturedDocument) -> Result<PathBuf> {
        let dir = self.output_dir.join(&document.id);
        std::fs::create_dir_all(&dir)?;

        let mut files = Vec::with_capacity(document.pages.len());
        for (i, page) in document.pages.iter().enumerate() {
            let file_name = format!("page-{:02}.{}", i + 1, extension(page));
            files.push(write_image(&dir, &file_name, &format!("ページ {}", i + 1), page)?);
        }

        let manifest = Manifest {
            id: document.id.clone(),
            kind: "document".to_string(),
            title: document.name.clone(),
            document_type: Some(document.document_type.as_str().to_string()),
            complete: None,
            created_at: document.created_at.to_rfc3339(),
            files,
        };
        write_manifest(&dir, &manifest)?;

        tracing::debug!(id = %document.id, pages = document.pages.len(), "書類を出力");
        Ok(dir)
    }

    /// 点検結果を出力して出力先ディレクトリを返す
    pub fn write_inspection(&self, report: &InspectionReport) -> Result<PathBuf> {
        let dir = self.output_dir.join(&report.id);
        std::fs::create_dir_all(&dir)?;

        let mut files = Vec::with_capacity(report.points.len());
        for point in &report.points {
            let entry = match point.image() {
                Some(image) => {
                    let file_name = format!("{}.{}", point.id, extension(image));
                    write_image(&dir, &file_name, &point.display_name, image)?
                }
                None => ManifestEntry {
                    label: point.display_name.clone(),
                    file: None,
                    width: 0,
                    height: 0,
                    bytes: 0,
                    sha256: None,
                },
            };
            files.push(entry);
        }

        let manifest = Manifest {
            id: report.id.clone(),
            kind: "inspection".to_string(),
            title: report.title.clone(),
            document_type: None,
            complete: Some(report.complete),
            created_at: report.created_at.to_rfc3339(),
            files,
        };
        write_manifest(&dir, &manifest)?;

        tracing::debug!(id = %report.id, photos = report.photo_count(), "点検結果を出力");
        Ok(dir)
    }
}

impl PostProcessor for DirectoryExporter {
    async fn process(&self, document: &CapturedDocument) -> std::result::Result<(), String> {
        self.write_document(document)
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

/// manifest.json を読み込む
pub fn read_manifest(dir: &Path) -> Result<Manifest> {
    let content = std::fs::read_to_string(dir.join(MANIFEST_FILE))?;
    Ok(serde_json::from_str(&content)?)
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn extension(image: &EncodedImage) -> &'static str {
    match image.mime_type.as_str() {
        "image/png" => "png",
        "image/webp" => "webp",
        _ => "jpg",
    }
}

fn write_image(dir: &Path, file_name: &str, label: &str, image: &EncodedImage) -> Result<ManifestEntry> {
    std::fs::write(dir.join(file_name), &image.bytes)?;
    Ok(ManifestEntry {
        label: label.to_string(),
        file: Some(file_name.to_string()),
        width: image.width,
        height: image.height,
        bytes: image.len() as u64,
        sha256: Some(sha256_hex(&image.bytes)),
    })
}

fn write_manifest(dir: &Path, manifest: &Manifest) -> Result<()> {
    let json = serde_json::to_string_pretty(manifest)?;
    std::fs::write(dir.join(MANIFEST_FILE), json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_extension() {
        assert_eq!(extension(&EncodedImage::jpeg(1, 1, vec![])), "jpg");
        let png = EncodedImage {
            mime_type: "image/png".into(),
            width: 1,
            height: 1,
            bytes: vec![],
        };
        assert_eq!(extension(&png), "png");
    }
}
