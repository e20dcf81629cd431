//! フレーム画像の走査

use crate::error::{Result, TruckCaptureError};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameInfo {
    pub path: PathBuf,
    pub file_name: String,
}

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "JPG", "JPEG", "PNG"];

/// フォルダ直下の画像をファイル名順に返す
pub fn scan_frames(folder: &Path) -> Result<Vec<FrameInfo>> {
    if !folder.is_dir() {
        return Err(TruckCaptureError::FolderNotFound(folder.display().to_string()));
    }

    // ルート自体が読めない場合はここで権限エラーになる
    std::fs::read_dir(folder)?;

    let mut frames: Vec<FrameInfo> = WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1) // 直下のみ（再帰しない）
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .map(|ext| is_image_extension(&ext.to_string_lossy()))
                .unwrap_or(false)
        })
        .map(|e| FrameInfo {
            file_name: e.file_name().to_string_lossy().to_string(),
            path: e.into_path(),
        })
        .collect();

    // ファイル名でソート
    frames.sort_by(|a, b| a.file_name.cmp(&b.file_name));

    Ok(frames)
}

fn is_image_extension(ext: &str) -> bool {
    IMAGE_EXTENSIONS.contains(&ext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    #[test]
    fn test_is_image_extension() {
        assert!(is_image_extension("jpg"));
        assert!(is_image_extension("JPG"));
        assert!(is_image_extension("jpeg"));
        assert!(is_image_extension("png"));
        assert!(!is_image_extension("txt"));
        assert!(!is_image_extension("gif"));
    }

    #[test]
    fn test_scan_frames_not_found() {
        let result = scan_frames(Path::new("/nonexistent/folder"));
        assert!(matches!(result, Err(TruckCaptureError::FolderNotFound(_))));
    }

    #[test]
    fn test_scan_frames_sorted_and_filtered() {
        let dir = tempdir().expect("Failed to create temp dir");
        File::create(dir.path().join("c.jpg")).unwrap();
        File::create(dir.path().join("a.PNG")).unwrap();
        File::create(dir.path().join("b.jpeg")).unwrap();
        File::create(dir.path().join("notes.txt")).unwrap();
        std::fs::create_dir(dir.path().join("sub.jpg")).unwrap();

        let frames = scan_frames(dir.path()).unwrap();
        let names: Vec<&str> = frames.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(names, vec!["a.PNG", "b.jpeg", "c.jpg"]);
    }
}
