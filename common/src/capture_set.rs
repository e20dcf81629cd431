//! 撮影対象の集合
//!
//! 点検チェックリスト（固定）と書類ページ（可変）の両方をこの型で扱う。
//! 並び順がそのまま表示順になる。

use crate::error::{CaptureError, CaptureResult};
use crate::image::EncodedImage;
use crate::types::{CaptureTarget, TargetSpec};
use std::collections::HashSet;

const PAGE_ID_PREFIX: &str = "page-";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapturePointSet {
    targets: Vec<CaptureTarget>,
    /// 次に払い出すページ番号（削除されても再利用しない）
    next_page: u32,
}

impl CapturePointSet {
    /// 定義リストから未撮影の集合を作る
    ///
    /// 重複したIDは最初のものだけ残す。
    pub fn initialize<I>(specs: I) -> Self
    where
        I: IntoIterator<Item = TargetSpec>,
    {
        let mut seen = HashSet::new();
        let targets = specs
            .into_iter()
            .filter(|spec| {
                let fresh = seen.insert(spec.id.clone());
                if !fresh {
                    tracing::warn!(id = %spec.id, "重複した撮影対象をスキップ");
                }
                fresh
            })
            .map(CaptureTarget::from_spec)
            .collect();

        Self {
            targets,
            next_page: 1,
        }
    }

    /// 書類撮影用の空の集合
    pub fn pages() -> Self {
        Self::initialize(Vec::new())
    }

    pub fn targets(&self) -> &[CaptureTarget] {
        &self.targets
    }

    pub fn get(&self, id: &str) -> Option<&CaptureTarget> {
        self.targets.iter().find(|t| t.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.targets.iter().position(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// 画像を設定（上書き、履歴は残さない）
    pub fn set_image(&mut self, id: &str, image: EncodedImage) -> CaptureResult<()> {
        let target = self.target_mut(id)?;
        target.set_image(image);
        Ok(())
    }

    /// 画像を外して未撮影に戻す（撮り直し用）
    pub fn clear_image(&mut self, id: &str) -> CaptureResult<()> {
        let target = self.target_mut(id)?;
        target.take_image();
        Ok(())
    }

    /// 全対象が撮影済みか（空集合はtrue）
    pub fn is_complete(&self) -> bool {
        self.targets.iter().all(|t| t.completed())
    }

    /// (撮影済み数, 全体数)
    pub fn progress(&self) -> (usize, usize) {
        (self.captured_count(), self.targets.len())
    }

    pub fn captured_count(&self) -> usize {
        self.targets.iter().filter(|t| t.completed()).count()
    }

    /// 末尾にページを追加し、その位置を返す
    pub fn append_page(&mut self, image: EncodedImage) -> usize {
        let id = format!("{}{}", PAGE_ID_PREFIX, self.next_page);
        self.next_page += 1;

        let index = self.targets.len();
        let mut target = CaptureTarget::from_spec(TargetSpec {
            id,
            display_name: page_name(index),
            description: None,
        });
        target.set_image(image);
        self.targets.push(target);
        index
    }

    /// 指定位置のページを削除（後続のページは繰り上がる）
    pub fn remove_page(&mut self, index: usize) -> CaptureResult<CaptureTarget> {
        if index >= self.targets.len() {
            return Err(CaptureError::IndexOutOfRange {
                index,
                len: self.targets.len(),
            });
        }

        let removed = self.targets.remove(index);
        for (i, target) in self.targets.iter_mut().enumerate().skip(index) {
            if target.id.starts_with(PAGE_ID_PREFIX) {
                target.display_name = page_name(i);
            }
        }
        Ok(removed)
    }

    /// 撮影済み画像（表示順）
    pub fn images(&self) -> impl Iterator<Item = &EncodedImage> {
        self.targets.iter().filter_map(|t| t.image())
    }

    pub(crate) fn into_targets(self) -> Vec<CaptureTarget> {
        self.targets
    }

    fn target_mut(&mut self, id: &str) -> CaptureResult<&mut CaptureTarget> {
        self.targets
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| CaptureError::UnknownTarget(id.to_string()))
    }
}

fn page_name(index: usize) -> String {
    format!("ページ {}", index + 1)
}
