//! 撮影結果の保管
//!
//! 画面（またはCLI）が所有し、撮影フローには `CaptureSink` として渡す。

use crate::flow::{CaptureOutcome, CaptureSink};
use crate::types::{CapturedDocument, InspectionReport};

#[derive(Debug, Clone, Default)]
pub struct CaptureRepository {
    /// 新しい順
    documents: Vec<CapturedDocument>,
    /// 新しい順
    inspections: Vec<InspectionReport>,
}

impl CaptureRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn documents(&self) -> &[CapturedDocument] {
        &self.documents
    }

    pub fn inspections(&self) -> &[InspectionReport] {
        &self.inspections
    }

    pub fn document(&self, id: &str) -> Option<&CapturedDocument> {
        self.documents.iter().find(|d| d.id == id)
    }

    pub fn inspection(&self, id: &str) -> Option<&InspectionReport> {
        self.inspections.iter().find(|r| r.id == id)
    }

    /// 変換済みにする（見つからなければfalse）
    pub fn mark_converted(&mut self, id: &str) -> bool {
        match self.documents.iter_mut().find(|d| d.id == id) {
            Some(doc) => {
                doc.converted = true;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.documents.len() + self.inspections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CaptureSink for CaptureRepository {
    fn on_capture_finished(&mut self, outcome: CaptureOutcome) {
        match outcome {
            CaptureOutcome::Document(doc) => self.documents.insert(0, doc),
            CaptureOutcome::Inspection(report) => self.inspections.insert(0, report),
        }
    }
}
