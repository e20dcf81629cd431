//! 端末での撮影セッション
//!
//! フォルダ再生カメラで撮影フローを動かし、完了した結果をディレクトリに出力する。

use crate::camera::{FolderCamera, TokioTimer};
use crate::error::{Result, TruckCaptureError};
use crate::export::DirectoryExporter;
use chrono::{DateTime, Local, Utc};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Select};
use std::path::{Path, PathBuf};
use truck_capture_common::{
    CaptureError, CaptureFlowController, CaptureProvider, CaptureRepository, CaptureSettings,
    DocumentType, FlowSnapshot, FlowState, ProcessingQueue, ShotTarget, TaskStatus,
};

pub type FolderFlow = CaptureFlowController<FolderCamera, TokioTimer>;

pub fn new_flow(frames: &Path, settings: CaptureSettings) -> FolderFlow {
    CaptureFlowController::new(FolderCamera::new(frames), TokioTimer, settings)
}

/// メニューの操作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// カメラを起動して1枚撮る
    Shoot(ShotTarget),
    /// 起動中のカメラで撮る
    Capture,
    /// 撮り直し
    Retake(String),
    /// ページを削除
    RemovePage(usize),
    CloseCamera,
    Finish,
    Cancel,
}

impl SessionAction {
    pub fn label(&self, snapshot: &FlowSnapshot) -> String {
        let name_of = |id: &str| {
            snapshot
                .targets
                .iter()
                .find(|t| t.id == id)
                .map(|t| t.display_name.clone())
                .unwrap_or_else(|| id.to_string())
        };

        match self {
            SessionAction::Shoot(ShotTarget::Point(id)) => format!("📷 {} を撮影", name_of(id)),
            SessionAction::Shoot(ShotTarget::NewPage) => "📷 ページを追加".to_string(),
            SessionAction::Capture => "📷 次のページを撮影".to_string(),
            SessionAction::Retake(id) => format!("🔁 {} を撮り直す", name_of(id)),
            SessionAction::RemovePage(index) => match snapshot.targets.get(*index) {
                Some(t) => format!("🗑 {} を削除", t.display_name),
                None => format!("🗑 ページ {} を削除", index + 1),
            },
            SessionAction::CloseCamera => "カメラを閉じる".to_string(),
            SessionAction::Finish => "✅ 完了して保存".to_string(),
            SessionAction::Cancel => "✖ 破棄して終了".to_string(),
        }
    }
}

/// 現在の状態で選べる操作
pub fn available_actions(snapshot: &FlowSnapshot) -> Vec<SessionAction> {
    let mut actions = Vec::new();
    let captured = snapshot.progress.0;

    match snapshot.state {
        FlowState::Idle => return actions,
        FlowState::CameraActive => {
            actions.push(SessionAction::Capture);
            actions.push(SessionAction::CloseCamera);
        }
        FlowState::SelectingTarget | FlowState::ReviewingPhotos => {
            if snapshot.is_page_list {
                actions.push(SessionAction::Shoot(ShotTarget::NewPage));
                for (index, page) in snapshot.targets.iter().enumerate() {
                    actions.push(SessionAction::Retake(page.id.clone()));
                    actions.push(SessionAction::RemovePage(index));
                }
            } else {
                // 未撮影の箇所を先に並べる
                for target in snapshot.targets.iter().filter(|t| !t.completed) {
                    actions.push(SessionAction::Shoot(ShotTarget::Point(target.id.clone())));
                }
                for target in snapshot.targets.iter().filter(|t| t.completed) {
                    actions.push(SessionAction::Retake(target.id.clone()));
                }
            }
        }
    }

    if captured > 0 {
        actions.push(SessionAction::Finish);
    }
    actions.push(SessionAction::Cancel);
    actions
}

/// 操作を実行する。完了した場合は成果物のIDを返す
pub async fn perform(
    flow: &mut FolderFlow,
    action: &SessionAction,
    repository: &mut CaptureRepository,
) -> Result<Option<String>> {
    match action {
        SessionAction::Shoot(shot) => {
            flow.open_camera(shot.clone()).await?;
            let id = flow.capture().await?;
            println!("✔ 撮影: {}", id);
        }
        SessionAction::Capture => {
            let id = flow.capture().await?;
            println!("✔ 撮影: {}", id);
        }
        SessionAction::Retake(id) => {
            flow.retake(id).await?;
            flow.capture().await?;
            println!("✔ 撮り直し: {}", id);
        }
        SessionAction::RemovePage(index) => flow.remove_page(*index)?,
        SessionAction::CloseCamera => flow.close_camera(),
        SessionAction::Finish => return Ok(Some(flow.finish(repository)?)),
        SessionAction::Cancel => flow.cancel(),
    }
    Ok(None)
}

fn print_progress(snapshot: &FlowSnapshot) {
    let (done, total) = snapshot.progress;
    println!();
    if let Some(title) = &snapshot.title {
        println!("📋 {} ({}/{})", title, done, total);
    }
    for target in &snapshot.targets {
        let mark = if target.completed { "✔" } else { "・" };
        println!("  {} {}", mark, target.display_name);
    }
    if snapshot.camera_active {
        println!("  (カメラ起動中)");
    }
}

fn prompt_error(e: dialoguer::Error) -> TruckCaptureError {
    TruckCaptureError::CliExecution(e.to_string())
}

/// 対話式で撮影する。破棄した場合は None
pub async fn run_interactive(
    flow: &mut FolderFlow,
    provider: CaptureProvider,
    repository: &mut CaptureRepository,
) -> Result<Option<String>> {
    flow.start(provider)?;
    let theme = ColorfulTheme::default();

    loop {
        let snapshot = flow.snapshot();
        print_progress(&snapshot);

        let actions = available_actions(&snapshot);
        let labels: Vec<String> = actions.iter().map(|a| a.label(&snapshot)).collect();
        let choice = Select::with_theme(&theme)
            .with_prompt("操作を選択")
            .items(&labels)
            .default(0)
            .interact()
            .map_err(prompt_error)?;

        let action = &actions[choice];
        if *action == SessionAction::Cancel && snapshot.progress.0 > 0 {
            let confirmed = Confirm::with_theme(&theme)
                .with_prompt("撮影済みの写真を破棄しますか？")
                .default(false)
                .interact()
                .map_err(prompt_error)?;
            if !confirmed {
                continue;
            }
        }

        match perform(flow, action, repository).await {
            Ok(Some(id)) => return Ok(Some(id)),
            Ok(None) => {}
            Err(TruckCaptureError::Capture(e)) => {
                println!("⚠ {}: {}", e.title(), e);
            }
            Err(e) => {
                flow.cancel();
                return Err(e);
            }
        }

        if flow.state() == FlowState::Idle {
            return Ok(None);
        }
    }
}

/// 指定枚数を連続撮影して書類を確定する
pub async fn capture_pages(
    flow: &mut FolderFlow,
    provider: CaptureProvider,
    pages: usize,
    repository: &mut CaptureRepository,
) -> Result<String> {
    if pages == 0 {
        return Err(CaptureError::EmptyCaptureSet.into());
    }

    flow.start(provider)?;
    let result = shoot_pages(flow, pages).await;
    if let Err(e) = result {
        flow.cancel();
        return Err(e);
    }

    flow.close_camera();
    Ok(flow.finish(repository)?)
}

async fn shoot_pages(flow: &mut FolderFlow, pages: usize) -> Result<()> {
    for i in 0..pages {
        flow.open_camera(ShotTarget::NewPage).await?;
        let id = flow.capture().await?;
        println!("✔ [{}/{}] {}", i + 1, pages, id);
    }
    Ok(())
}

/// 書類を後処理キューに通して出力する
///
/// 失敗は自動で再実行しない。対話モードでは再試行を確認する。
pub async fn export_document(
    id: &str,
    repository: &mut CaptureRepository,
    processing: &mut ProcessingQueue,
    exporter: &DirectoryExporter,
    interactive: bool,
) -> Result<PathBuf> {
    processing.submit(id);

    loop {
        processing.run_pending(exporter, repository).await;

        match processing.status(id) {
            Some(TaskStatus::Succeeded) => return Ok(exporter.output_dir().join(id)),
            Some(TaskStatus::Failed { reason }) => {
                println!("⚠ 出力に失敗: {}", reason);
                let retry = interactive
                    && Confirm::new()
                        .with_prompt("再試行しますか？")
                        .default(true)
                        .interact()
                        .map_err(prompt_error)?;
                if !retry {
                    return Err(TruckCaptureError::CliExecution(reason.clone()));
                }
                processing.retry(id);
            }
            _ => {
                return Err(TruckCaptureError::CliExecution(format!(
                    "後処理が完了していません: {}",
                    id
                )))
            }
        }
    }
}

fn local_time(time: &DateTime<Utc>) -> String {
    time.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

/// トラック点検を撮影して出力
pub async fn run_inspection(frames: &Path, output: &Path, settings: CaptureSettings) -> Result<()> {
    let mut flow = new_flow(frames, settings);
    let mut repository = CaptureRepository::new();

    let Some(id) =
        run_interactive(&mut flow, CaptureProvider::truck_inspection(), &mut repository).await?
    else {
        println!("撮影を破棄しました");
        return Ok(());
    };

    let report = repository
        .inspection(&id)
        .ok_or_else(|| TruckCaptureError::CliExecution(format!("点検結果が見つかりません: {}", id)))?;
    if !report.complete {
        println!("⚠ 未撮影の箇所があります ({}/{})", report.photo_count(), report.points.len());
    }

    let dir = DirectoryExporter::new(output).write_inspection(report)?;
    println!("✔ 出力: {} ({})", dir.display(), local_time(&report.created_at));
    println!("\n✅ 点検完了");
    Ok(())
}

/// 書類を撮影して出力
pub async fn run_document(
    frames: &Path,
    output: &Path,
    settings: CaptureSettings,
    document_type: DocumentType,
    name: Option<String>,
    pages: Option<usize>,
) -> Result<()> {
    let mut flow = new_flow(frames, settings);
    let mut repository = CaptureRepository::new();
    let mut processing = ProcessingQueue::new();
    let interactive = pages.is_none();

    let name = match name {
        Some(name) => name,
        None if interactive => Input::<String>::new()
            .with_prompt("書類名")
            .default(document_type.label().to_string())
            .interact_text()
            .map_err(prompt_error)?,
        None => document_type.label().to_string(),
    };
    let provider = CaptureProvider::OpenEndedPageList {
        document_type,
        name,
    };

    let id = match pages {
        Some(pages) => capture_pages(&mut flow, provider, pages, &mut repository).await?,
        None => match run_interactive(&mut flow, provider, &mut repository).await? {
            Some(id) => id,
            None => {
                println!("撮影を破棄しました");
                return Ok(());
            }
        },
    };

    let exporter = DirectoryExporter::new(output);
    let dir = export_document(&id, &mut repository, &mut processing, &exporter, interactive).await?;
    let created_at = repository
        .document(&id)
        .map(|d| local_time(&d.created_at))
        .unwrap_or_default();
    println!("✔ 出力: {} ({})", dir.display(), created_at);
    println!("\n✅ 書類の撮影完了");
    Ok(())
}
