//! 書類の後処理キュー
//!
//! 書類IDごとにタスクを管理し、成功・失敗を記録する。
//! 失敗したタスクは自動では再実行せず、`retry` で明示的に戻す。

use crate::repository::CaptureRepository;
use crate::types::CapturedDocument;

/// 後処理（PDF化、保存など）
#[allow(async_fn_in_trait)]
pub trait PostProcessor {
    async fn process(&self, document: &CapturedDocument) -> Result<(), String>;
}

/// タスクの状態
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Queued,
    Running,
    Succeeded,
    Failed { reason: String },
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Queued => "queued",
            TaskStatus::Running => "running",
            TaskStatus::Succeeded => "succeeded",
            TaskStatus::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingTask {
    pub document_id: String,
    pub status: TaskStatus,
}

#[derive(Debug, Clone, Default)]
pub struct ProcessingQueue {
    tasks: Vec<ProcessingTask>,
}

impl ProcessingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// タスクを登録（同じIDが未完了で残っていれば何もしない）
    pub fn submit(&mut self, document_id: &str) {
        if let Some(task) = self.tasks.iter_mut().find(|t| t.document_id == document_id) {
            if matches!(task.status, TaskStatus::Failed { .. }) {
                task.status = TaskStatus::Queued;
            }
            return;
        }
        self.tasks.push(ProcessingTask {
            document_id: document_id.to_string(),
            status: TaskStatus::Queued,
        });
    }

    pub fn status(&self, document_id: &str) -> Option<&TaskStatus> {
        self.tasks
            .iter()
            .find(|t| t.document_id == document_id)
            .map(|t| &t.status)
    }

    pub fn tasks(&self) -> &[ProcessingTask] {
        &self.tasks
    }

    pub fn has_queued(&self) -> bool {
        self.tasks.iter().any(|t| t.status == TaskStatus::Queued)
    }

    /// 失敗したタスクを再登録（失敗状態でなければfalse）
    pub fn retry(&mut self, document_id: &str) -> bool {
        match self.tasks.iter_mut().find(|t| t.document_id == document_id) {
            Some(task) if matches!(task.status, TaskStatus::Failed { .. }) => {
                task.status = TaskStatus::Queued;
                true
            }
            _ => false,
        }
    }

    /// 次の待機中タスクを実行中にしてIDを返す
    pub fn start_next(&mut self) -> Option<String> {
        let task = self.tasks.iter_mut().find(|t| t.status == TaskStatus::Queued)?;
        task.status = TaskStatus::Running;
        Some(task.document_id.clone())
    }

    /// 実行結果を記録
    pub fn complete(&mut self, document_id: &str, result: Result<(), String>) {
        let Some(task) = self.tasks.iter_mut().find(|t| t.document_id == document_id) else {
            return;
        };
        task.status = match result {
            Ok(()) => TaskStatus::Succeeded,
            Err(reason) => {
                tracing::warn!(id = %document_id, reason = %reason, "後処理に失敗");
                TaskStatus::Failed { reason }
            }
        };
    }

    /// 待機中のタスクを順に実行し、実行した件数を返す
    pub async fn run_pending<P>(&mut self, processor: &P, repository: &mut CaptureRepository) -> usize
    where
        P: PostProcessor,
    {
        let mut ran = 0;
        while let Some(id) = self.start_next() {
            ran += 1;
            let result = match repository.document(&id) {
                Some(document) => processor.process(document).await,
                None => Err(format!("書類が見つかりません: {}", id)),
            };
            if result.is_ok() {
                repository.mark_converted(&id);
            }
            self.complete(&id, result);
        }
        ran
    }
}
