//! メインアプリケーションコンポーネント
//!
//! 撮影データ・変換キュー・アップロードキューはここで持ち、各画面に渡す。

use crate::camera::SimulatedConverter;
use crate::components::{
    bottom_nav::BottomNav, documents::DocumentCapture, inspection::TruckInspection,
    settings_panel::SettingsPanel, upload_manager::UploadManager,
};
use crate::notice::{NoticeArea, Notices};
use crate::storage::{load_capture_settings, load_upload_settings};
use chrono::{DateTime, Local, Utc};
use gloo::timers::future::TimeoutFuture;
use leptos::prelude::*;
use leptos::task::spawn_local;
use truck_capture_common::{
    CaptureOutcome, CaptureRepository, CaptureSink, PostProcessor, ProcessingQueue, UploadQueue,
};

/// アップロードの模擬待ち時間
const UPLOAD_DELAY_MS: u32 = 3000;

/// 画面タブ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Inspection,
    Documents,
    Upload,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::Inspection, Tab::Documents, Tab::Upload];

    pub fn label(&self) -> &'static str {
        match self {
            Tab::Inspection => "点検",
            Tab::Documents => "書類",
            Tab::Upload => "アップロード",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Tab::Inspection => "🚚",
            Tab::Documents => "📄",
            Tab::Upload => "☁",
        }
    }
}

/// 撮影結果をリポジトリのシグナルに書き込む
#[derive(Clone, Copy)]
pub struct RepositorySink(RwSignal<CaptureRepository>);

impl RepositorySink {
    pub fn new(repository: RwSignal<CaptureRepository>) -> Self {
        Self(repository)
    }
}

impl CaptureSink for RepositorySink {
    fn on_capture_finished(&mut self, outcome: CaptureOutcome) {
        self.0.update(|r| r.on_capture_finished(outcome));
    }
}

/// 一覧表示用の日時（端末のローカル時刻）
pub fn format_time(time: &DateTime<Utc>) -> String {
    time.with_timezone(&Local).format("%m/%d %H:%M").to_string()
}

#[component]
pub fn App() -> impl IntoView {
    let notices = Notices::new();
    provide_context(notices);

    let (active_tab, set_active_tab) = signal(Tab::Inspection);
    let repository = RwSignal::new(CaptureRepository::new());
    let processing = RwSignal::new(ProcessingQueue::new());
    let uploads = RwSignal::new(UploadQueue::new());
    let capture_settings = RwSignal::new(load_capture_settings());
    let upload_settings = RwSignal::new(load_upload_settings());
    let converting = RwSignal::new(false);

    // 変換キューを1件ずつ処理する（同時に走るのは1本だけ）
    let run_processing = move || {
        if converting.get_untracked() {
            return;
        }
        converting.set(true);
        spawn_local(async move {
            while let Some(id) = processing.try_update(|q| q.start_next()).flatten() {
                let document = repository.with_untracked(|r| r.document(&id).cloned());
                let result = match &document {
                    Some(document) => SimulatedConverter.process(document).await,
                    None => Err(format!("書類が見つかりません: {}", id)),
                };
                match &result {
                    Ok(()) => {
                        repository.update(|r| {
                            r.mark_converted(&id);
                        });
                        let name = document.map(|d| d.name).unwrap_or_default();
                        notices.success("PDF変換が完了しました", &name);
                    }
                    Err(reason) => notices.error("PDF変換に失敗しました", reason),
                }
                processing.update(|q| q.complete(&id, result));
            }
            converting.set(false);
        });
    };

    let upload_all = move |_: ()| {
        let settings = upload_settings.get_untracked();
        if let Err(e) = settings.validate() {
            notices.error("アップロードできません", &e.to_string());
            return;
        }
        let ids = uploads.try_update(|q| q.begin_all()).unwrap_or_default();
        if ids.is_empty() {
            return;
        }
        notices.info(
            "アップロードを開始しました",
            &format!("{} 件 → {}", ids.len(), settings.destination.label()),
        );
        spawn_local(async move {
            TimeoutFuture::new(UPLOAD_DELAY_MS).await;
            uploads.update(|q| {
                for id in &ids {
                    q.complete(id);
                }
            });
            notices.success("アップロードが完了しました", &format!("{} 件", ids.len()));
        });
    };

    let on_upload_retry = move |id: String| {
        uploads.update(|q| {
            q.retry(&id);
        });
        upload_all(());
    };

    let on_processing_retry = move |id: String| {
        if processing.try_update(|q| q.retry(&id)).unwrap_or(false) {
            run_processing();
        }
    };

    let on_inspection_finished = move |_: String| {
        if upload_settings.get_untracked().auto_upload {
            upload_all(());
        }
    };

    let on_document_finished = move |_: String| {
        run_processing();
        if upload_settings.get_untracked().auto_upload {
            upload_all(());
        }
    };

    view! {
        <div class="app">
            <NoticeArea />
            <main class="main-content">
                {move || match active_tab.get() {
                    Tab::Inspection => view! {
                        <TruckInspection
                            repository=repository
                            uploads=uploads
                            settings=capture_settings.read_only()
                            on_finished=on_inspection_finished
                        />
                    }
                    .into_any(),
                    Tab::Documents => view! {
                        <DocumentCapture
                            repository=repository
                            processing=processing
                            uploads=uploads
                            settings=capture_settings.read_only()
                            on_finished=on_document_finished
                            on_retry=on_processing_retry
                        />
                    }
                    .into_any(),
                    Tab::Upload => view! {
                        <UploadManager
                            uploads=uploads
                            settings=upload_settings
                            on_upload_all=upload_all
                            on_retry=on_upload_retry
                        />
                        <SettingsPanel settings=capture_settings />
                    }
                    .into_any(),
                }}
            </main>
            <BottomNav active=active_tab set_active=set_active_tab />
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tab_labels() {
        assert_eq!(Tab::ALL.len(), 3);
        assert_eq!(Tab::Documents.label(), "書類");
        assert_eq!(Tab::Upload.icon(), "☁");
    }

    #[test]
    fn test_format_time() {
        let time = Utc::now();
        let text = format_time(&time);
        // "MM/DD HH:MM"
        assert_eq!(text.len(), 11);
        assert_eq!(&text[2..3], "/");
    }
}
