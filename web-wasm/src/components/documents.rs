//! 書類撮影画面
//!
//! 種類を選んでページを連続撮影し、完了後にPDF変換のキューに入れる。

use crate::app::{format_time, RepositorySink};
use crate::camera::BrowserCamera;
use crate::components::camera_view::CameraView;
use crate::flow_handle::FlowHandle;
use crate::notice::use_notices;
use leptos::prelude::*;
use truck_capture_common::{
    format_size, CaptureProvider, CaptureRepository, CaptureSettings, CapturedDocument,
    DocumentType, FlowState, ProcessingQueue, ShotTarget, TaskStatus, TargetView, UploadQueue,
};

const CAMERA: (&str, &str) = ("documents-video", "documents-canvas");

#[component]
pub fn DocumentCapture(
    repository: RwSignal<CaptureRepository>,
    processing: RwSignal<ProcessingQueue>,
    uploads: RwSignal<UploadQueue>,
    settings: ReadSignal<CaptureSettings>,
    #[prop(into)] on_finished: Callback<String>,
    #[prop(into)] on_retry: Callback<String>,
) -> impl IntoView {
    let notices = use_notices();
    let camera = BrowserCamera::new(CAMERA.0, CAMERA.1);
    let handle = FlowHandle::new(camera, settings.get_untracked());

    Effect::new(move |_| handle.update_settings(settings.get()));
    on_cleanup(move || handle.cancel());

    let snapshot = handle.snapshot();
    let busy = handle.busy();
    let (name, set_name) = signal(String::new());
    let capturing = move || snapshot.get().state != FlowState::Idle;

    let start_capture = move |document_type: DocumentType| {
        let name = name.get_untracked();
        let name = if name.trim().is_empty() {
            document_type.label().to_string()
        } else {
            name.trim().to_string()
        };
        handle.start(CaptureProvider::OpenEndedPageList { document_type, name });
        handle.open(ShotTarget::NewPage);
    };

    let caption = Signal::derive(move || {
        let snap = snapshot.get();
        match &snap.current_shot {
            Some(ShotTarget::Point(id)) => snap
                .targets
                .iter()
                .find(|t| &t.id == id)
                .map(|t| format!("{} を撮り直し", t.display_name))
                .unwrap_or_default(),
            _ => format!("ページ {} を撮影", snap.targets.len() + 1),
        }
    });

    let on_cancel = move || {
        if busy.get_untracked() {
            handle.cancel();
        } else {
            handle.close_camera();
        }
    };

    let on_finish = move |_| {
        let mut sink = RepositorySink::new(repository);
        if let Some(id) = handle.finish(&mut sink) {
            if let Some(document) = repository.with_untracked(|r| r.document(&id).cloned()) {
                uploads.update(|q| q.enqueue_document(&document));
                notices.success(
                    "書類を保存しました",
                    &format!("{} ({}ページ)", document.name, document.pages.len()),
                );
            }
            processing.update(|q| q.submit(&id));
            set_name.set(String::new());
            on_finished.run(id);
        }
    };

    view! {
        <div class="screen documents">
            <div class="card header-card">
                <h1>"📄 書類スキャン"</h1>
                <p>"撮影してPDFに変換"</p>
            </div>

            <Show when=capturing>
                <div class="card capture-card">
                    <h2>{move || snapshot.get().title.unwrap_or_default()}</h2>
                    <p class="text-muted">
                        {move || format!("{} ページ撮影済み", snapshot.get().targets.len())}
                    </p>
                </div>
            </Show>

            <CameraView
                camera=camera
                active=Signal::derive(move || snapshot.get().state == FlowState::CameraActive)
                busy=busy
                caption=caption
                on_capture=move || handle.capture()
                on_cancel=on_cancel
            />

            <Show when=capturing>
                <div class="page-strip">
                    <For
                        each=move || snapshot.get().targets.into_iter().enumerate().collect::<Vec<_>>()
                        key=|(index, page)| (*index, page.id.clone(), page.preview_url.as_ref().map(|u| u.len()))
                        children=move |(index, page)| {
                            view! { <PageThumb index=index page=page handle=handle /> }
                        }
                    />
                </div>
                <div class="actions">
                    <button class="btn btn-secondary" on:click=move |_| handle.cancel()>
                        "破棄"
                    </button>
                    <Show when=move || snapshot.get().state != FlowState::CameraActive>
                        <button
                            class="btn btn-primary"
                            disabled=move || busy.get()
                            on:click=move |_| handle.open(ShotTarget::NewPage)
                        >
                            "📷 ページを追加"
                        </button>
                    </Show>
                    <button
                        class="btn btn-primary"
                        disabled=move || snapshot.get().progress.0 == 0 || busy.get()
                        on:click=on_finish
                    >
                        "完了"
                    </button>
                </div>
            </Show>

            <Show when=move || !capturing()>
                <h2>"書類の種類を選択"</h2>
                <div class="form-group">
                    <label for="document-name">"書類名（任意）"</label>
                    <input
                        type="text"
                        id="document-name"
                        placeholder="例: 注文 #456"
                        prop:value=move || name.get()
                        on:input=move |ev| set_name.set(event_target_value(&ev))
                    />
                </div>
                <div class="type-grid">
                    {DocumentType::ALL
                        .into_iter()
                        .map(|document_type| {
                            view! {
                                <button
                                    class="card type-card"
                                    on:click=move |_| start_capture(document_type)
                                >
                                    {document_type.label()}
                                </button>
                            }
                        })
                        .collect_view()}
                </div>
                <RecentDocuments repository=repository processing=processing on_retry=on_retry />
            </Show>
        </div>
    }
}

#[component]
fn PageThumb(index: usize, page: TargetView, handle: FlowHandle) -> impl IntoView {
    let retake_id = page.id.clone();

    view! {
        <div class="page-thumb">
            {page.preview_url.clone().map(|url| view! { <img src=url alt=page.display_name.clone() /> })}
            <span class="page-number">{index + 1}</span>
            <button class="btn btn-small" on:click=move |_| handle.retake(&retake_id)>
                "撮り直し"
            </button>
            <button class="btn btn-small btn-tertiary" on:click=move |_| handle.remove_page(index)>
                "削除"
            </button>
        </div>
    }
}

/// 変換状態の表示
fn status_badge(document: &CapturedDocument, status: Option<&TaskStatus>) -> (&'static str, String) {
    if document.converted {
        return ("badge badge-success", "PDF準備完了".to_string());
    }
    match status {
        Some(TaskStatus::Failed { reason }) => ("badge badge-error", format!("変換失敗: {}", reason)),
        _ => ("badge", "処理中...".to_string()),
    }
}

#[component]
fn RecentDocuments(
    repository: RwSignal<CaptureRepository>,
    processing: RwSignal<ProcessingQueue>,
    on_retry: Callback<String>,
) -> impl IntoView {
    let documents = move || repository.with(|r| r.documents().to_vec());

    view! {
        <Show when=move || !documents().is_empty()>
            <h2>"最近の書類"</h2>
            <div class="recent-list">
                <For
                    each=documents
                    key=|d| (d.id.clone(), d.converted)
                    children=move |document| {
                        let id = document.id.clone();
                        let status = move || {
                            processing.with(|q| q.status(&id).cloned())
                        };
                        let badge_status = status.clone();
                        let document_for_badge = document.clone();
                        let retry_id = document.id.clone();
                        view! {
                            <div class="card recent-card">
                                <h3>{document.name.clone()}</h3>
                                <p class="text-muted">
                                    {format!(
                                        "{} ページ • {} • {}",
                                        document.pages.len(),
                                        format_size(document.total_bytes()),
                                        format_time(&document.created_at),
                                    )}
                                </p>
                                {move || {
                                    let (class, label) = status_badge(&document_for_badge, badge_status().as_ref());
                                    view! { <span class=class>{label}</span> }
                                }}
                                <Show when=move || matches!(status(), Some(TaskStatus::Failed { .. }))>
                                    <button
                                        class="btn btn-small"
                                        on:click={
                                            let retry_id = retry_id.clone();
                                            move |_| on_retry.run(retry_id.clone())
                                        }
                                    >
                                        "再試行"
                                    </button>
                                </Show>
                            </div>
                        }
                    }
                />
            </div>
        </Show>
    }
}
