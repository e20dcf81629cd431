//! カメラプレビューと撮影ボタン
//!
//! video と canvas は常に置いておく（カメラ起動時にプレビューを接続するため）。

use crate::camera::BrowserCamera;
use leptos::prelude::*;

#[component]
pub fn CameraView<FC, FX>(
    camera: BrowserCamera,
    /// カメラ起動中
    active: Signal<bool>,
    /// 起動・撮影の処理中
    busy: ReadSignal<bool>,
    caption: Signal<String>,
    on_capture: FC,
    on_cancel: FX,
) -> impl IntoView
where
    FC: Fn() + 'static + Clone + Send + Sync,
    FX: Fn() + 'static + Clone + Send + Sync,
{
    let visible = move || active.get() || busy.get();

    view! {
        <div class="camera-view" class:hidden=move || !visible()>
            <p class="camera-caption">{move || caption.get()}</p>
            <video id=camera.video_id() class="camera-preview" autoplay=true playsinline=true />
            <canvas id=camera.canvas_id() class="hidden" />
            <Show when=move || busy.get() && !active.get()>
                <p class="text-muted">"カメラを起動しています..."</p>
            </Show>
            <div class="camera-actions">
                <button class="btn btn-secondary" on:click=move |_| on_cancel()>
                    "キャンセル"
                </button>
                <button
                    class="btn btn-capture"
                    disabled=move || !active.get() || busy.get()
                    on:click=move |_| on_capture()
                >
                    "📷"
                </button>
            </div>
        </div>
    }
}
