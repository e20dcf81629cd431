//! トラック点検画面
//!
//! 6箇所を1枚ずつ撮影する。1枚撮るごとにカメラは閉じる。

use crate::app::{format_time, RepositorySink};
use crate::camera::BrowserCamera;
use crate::components::camera_view::CameraView;
use crate::components::progress_bar::ProgressBar;
use crate::flow_handle::FlowHandle;
use crate::notice::use_notices;
use leptos::prelude::*;
use truck_capture_common::{
    CaptureProvider, CaptureRepository, CaptureSettings, FlowState, ShotTarget, TargetView,
    UploadQueue,
};

const CAMERA: (&str, &str) = ("inspection-video", "inspection-canvas");

#[component]
pub fn TruckInspection(
    repository: RwSignal<CaptureRepository>,
    uploads: RwSignal<UploadQueue>,
    settings: ReadSignal<CaptureSettings>,
    #[prop(into)] on_finished: Callback<String>,
) -> impl IntoView {
    let notices = use_notices();
    let camera = BrowserCamera::new(CAMERA.0, CAMERA.1);
    let handle = FlowHandle::new(camera, settings.get_untracked());
    handle.start(CaptureProvider::truck_inspection());

    Effect::new(move |_| handle.update_settings(settings.get()));
    on_cleanup(move || handle.cancel());

    let snapshot = handle.snapshot();
    let busy = handle.busy();

    let caption = Signal::derive(move || {
        let snap = snapshot.get();
        match &snap.current_shot {
            Some(ShotTarget::Point(id)) => snap
                .targets
                .iter()
                .find(|t| &t.id == id)
                .map(|t| format!("{} を撮影", t.display_name))
                .unwrap_or_default(),
            _ => String::new(),
        }
    });

    let on_cancel = move || {
        if busy.get_untracked() {
            // 起動中の中断は点検ごと破棄されるので最初から
            handle.restart(CaptureProvider::truck_inspection());
        } else {
            handle.close_camera();
        }
    };

    let on_finish = move |_| {
        let mut sink = RepositorySink::new(repository);
        if let Some(id) = handle.finish(&mut sink) {
            if let Some(report) = repository.with_untracked(|r| r.inspection(&id).cloned()) {
                uploads.update(|q| q.enqueue_inspection(&report));
                if report.complete {
                    notices.success("点検を保存しました", &report.title);
                } else {
                    notices.info(
                        "点検を保存しました",
                        &format!("未撮影 {} 箇所", report.points.len() - report.photo_count()),
                    );
                }
            }
            on_finished.run(id);
            handle.start(CaptureProvider::truck_inspection());
        }
    };

    view! {
        <div class="screen inspection">
            <div class="card header-card">
                <h1>"🚚 トラック点検"</h1>
                <p>"各箇所の写真を撮影してください"</p>
                <ProgressBar progress=Signal::derive(move || snapshot.get().progress) />
            </div>

            <CameraView
                camera=camera
                active=Signal::derive(move || snapshot.get().state == FlowState::CameraActive)
                busy=busy
                caption=caption
                on_capture=move || handle.capture()
                on_cancel=on_cancel
            />

            <div class="point-list">
                <For
                    each=move || snapshot.get().targets
                    key=|t| (t.id.clone(), t.completed, t.preview_url.as_ref().map(|u| u.len()))
                    children=move |target| view! { <PointCard target=target handle=handle /> }
                />
            </div>

            <div class="actions">
                <button
                    class="btn btn-primary"
                    disabled=move || snapshot.get().progress.0 == 0 || busy.get()
                    on:click=on_finish
                >
                    {move || if snapshot.get().complete { "点検を完了" } else { "途中で保存" }}
                </button>
                <button
                    class="btn btn-tertiary"
                    on:click=move |_| handle.restart(CaptureProvider::truck_inspection())
                >
                    "リセット"
                </button>
            </div>

            <RecentInspections repository=repository />
        </div>
    }
}

#[component]
fn PointCard(target: TargetView, handle: FlowHandle) -> impl IntoView {
    let id = target.id.clone();
    let retake_id = target.id.clone();
    let completed = target.completed;
    let file_name = format!("{}.jpg", target.id);

    view! {
        <div class="card point-card" class:completed=completed>
            <div class="point-info">
                <h3>{target.display_name.clone()}</h3>
                <p class="text-muted">{target.description.clone().unwrap_or_default()}</p>
            </div>
            {target.preview_url.clone().map(|url| {
                view! {
                    <a href=url.clone() download=file_name.clone()>
                        <img class="point-preview" src=url alt=target.display_name.clone() />
                    </a>
                }
            })}
            <Show
                when=move || completed
                fallback=move || {
                    let id = id.clone();
                    view! {
                        <button
                            class="btn btn-primary btn-small"
                            on:click=move |_| handle.open(ShotTarget::Point(id.clone()))
                        >
                            "📷 撮影"
                        </button>
                    }
                }
            >
                <span class="badge badge-success">"✔"</span>
                <button
                    class="btn btn-secondary btn-small"
                    on:click={
                        let retake_id = retake_id.clone();
                        move |_| handle.retake(&retake_id)
                    }
                >
                    "撮り直し"
                </button>
            </Show>
        </div>
    }
}

#[component]
fn RecentInspections(repository: RwSignal<CaptureRepository>) -> impl IntoView {
    let reports = move || repository.with(|r| r.inspections().to_vec());

    view! {
        <Show when=move || !reports().is_empty()>
            <h2>"最近の点検"</h2>
            <div class="recent-list">
                <For
                    each=reports
                    key=|r| r.id.clone()
                    children=move |report| {
                        view! {
                            <div class="card recent-card">
                                <h3>{report.title.clone()}</h3>
                                <p class="text-muted">
                                    {format!(
                                        "{} / {} 箇所 • {}",
                                        report.photo_count(),
                                        report.points.len(),
                                        format_time(&report.created_at),
                                    )}
                                </p>
                                <span class={if report.complete { "badge badge-success" } else { "badge" }}>
                                    {if report.complete { "完了" } else { "未完了" }}
                                </span>
                            </div>
                        }
                    }
                />
            </div>
        </Show>
    }
}
