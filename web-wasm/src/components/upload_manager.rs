//! アップロード管理画面
//!
//! 送信先の設定と送信待ちの一覧。実際の送信は行わず、タイマーで完了扱いにする。

use crate::notice::use_notices;
use crate::storage::save_upload_settings;
use leptos::prelude::*;
use truck_capture_common::{
    format_size, UploadDestination, UploadItem, UploadQueue, UploadSettings, UploadStatus,
};

#[component]
pub fn UploadManager(
    uploads: RwSignal<UploadQueue>,
    settings: RwSignal<UploadSettings>,
    #[prop(into)] on_upload_all: Callback<()>,
    #[prop(into)] on_retry: Callback<String>,
) -> impl IntoView {
    let notices = use_notices();

    let update_settings = move |change: Box<dyn FnOnce(&mut UploadSettings)>| {
        let mut next = settings.get_untracked();
        change(&mut next);
        // 入力途中のURLも画面には反映し、保存は正しい値のときだけ
        settings.set(next.clone());
        if next.validate().is_ok() {
            if let Err(e) = save_upload_settings(&next) {
                notices.error("設定を保存できません", &e);
            }
        }
    };

    let is_custom = move || matches!(settings.get().destination, UploadDestination::CustomUrl(_));
    let custom_url = move || match settings.get().destination {
        UploadDestination::CustomUrl(url) => url,
        _ => String::new(),
    };
    let destination_button = move |destination: UploadDestination| {
        let label = destination.label();
        let selected = destination.clone();
        view! {
            <button
                class="btn btn-small"
                class:btn-primary=move || {
                    std::mem::discriminant(&settings.get().destination) == std::mem::discriminant(&selected)
                }
                on:click={
                    let destination = destination.clone();
                    move |_| {
                        let destination = destination.clone();
                        update_settings(Box::new(move |s| {
                            // カスタムURLは入力済みの値を残す
                            if !(matches!(destination, UploadDestination::CustomUrl(_))
                                && matches!(s.destination, UploadDestination::CustomUrl(_)))
                            {
                                s.destination = destination;
                            }
                        }));
                    }
                }
            >
                {label}
            </button>
        }
    };

    let pending = move || uploads.with(|q| q.pending().into_iter().cloned().collect::<Vec<_>>());
    let history = move || uploads.with(|q| q.history().into_iter().cloned().collect::<Vec<_>>());
    let uploading = move || uploads.with(|q| q.items().iter().any(|i| i.status == UploadStatus::Uploading));

    view! {
        <div class="screen upload">
            <div class="card header-card">
                <h1>"☁ アップロード管理"</h1>
                <p>"撮影データをクラウドに同期"</p>
            </div>

            <div class="card">
                <h2>"⚙ アップロード設定"</h2>
                <label>"送信先"</label>
                <div class="destination-grid">
                    {destination_button(UploadDestination::GoogleDrive)}
                    {destination_button(UploadDestination::CustomUrl(String::new()))}
                    {destination_button(UploadDestination::Local)}
                </div>

                <Show when=is_custom>
                    <div class="form-group">
                        <label for="custom-url">"アップロード先URL"</label>
                        <input
                            type="url"
                            id="custom-url"
                            placeholder="https://example.com/upload"
                            prop:value=custom_url
                            on:input=move |ev| {
                                let url = event_target_value(&ev);
                                update_settings(Box::new(move |s| {
                                    s.destination = UploadDestination::CustomUrl(url);
                                }));
                            }
                        />
                    </div>
                </Show>

                <label class="toggle">
                    <input
                        type="checkbox"
                        prop:checked=move || settings.get().auto_upload
                        on:change=move |ev| {
                            let checked = event_target_checked(&ev);
                            update_settings(Box::new(move |s| s.auto_upload = checked));
                        }
                    />
                    "撮影後に自動アップロード"
                </label>
                <label class="toggle">
                    <input
                        type="checkbox"
                        prop:checked=move || settings.get().compression
                        on:change=move |ev| {
                            let checked = event_target_checked(&ev);
                            update_settings(Box::new(move |s| s.compression = checked));
                        }
                    />
                    "画像を圧縮して送信"
                </label>

                <Show when=move || settings.get().destination == UploadDestination::GoogleDrive>
                    <button
                        class="btn btn-secondary"
                        on:click=move |_| notices.error(
                            "連携が必要です",
                            "Google Drive 連携は未設定です",
                        )
                    >
                        "Google Drive に接続"
                    </button>
                </Show>
            </div>

            <div class="card">
                <h2>{move || format!("送信待ち ({})", pending().len())}</h2>
                <For
                    each=pending
                    key=|item| (item.id.clone(), item.status.as_str())
                    children=move |item| view! { <UploadRow item=item on_retry=on_retry /> }
                />
                <p class="text-muted">
                    {move || format!("合計 {}", format_size(uploads.with(|q| q.pending_bytes())))}
                </p>
                <button
                    class="btn btn-primary"
                    disabled=move || pending().is_empty() || uploading()
                    on:click=move |_| on_upload_all.run(())
                >
                    {move || if uploading() { "アップロード中..." } else { "すべてアップロード" }}
                </button>
            </div>

            <Show when=move || !history().is_empty()>
                <div class="card">
                    <h2>"最近のアップロード"</h2>
                    <For
                        each=history
                        key=|item| (item.id.clone(), item.status.as_str())
                        children=move |item| view! { <UploadRow item=item on_retry=on_retry /> }
                    />
                </div>
            </Show>
        </div>
    }
}

#[component]
fn UploadRow(item: UploadItem, on_retry: Callback<String>) -> impl IntoView {
    let (class, label) = match &item.status {
        UploadStatus::Pending => ("badge", "待機中".to_string()),
        UploadStatus::Uploading => ("badge", "送信中".to_string()),
        UploadStatus::Completed => ("badge badge-success", "完了".to_string()),
        UploadStatus::Failed { reason } => ("badge badge-error", format!("失敗: {}", reason)),
    };
    let failed = matches!(item.status, UploadStatus::Failed { .. });
    let id = item.id.clone();

    view! {
        <div class="upload-row">
            <div>
                <h3>{item.name.clone()}</h3>
                <p class="text-muted">
                    {format!("{} ファイル • {}", item.file_count, format_size(item.size_bytes))}
                </p>
            </div>
            <span class=class>{label}</span>
            <Show when=move || failed>
                <button
                    class="btn btn-small"
                    on:click={
                        let id = id.clone();
                        move |_| on_retry.run(id.clone())
                    }
                >
                    "再試行"
                </button>
            </Show>
        </div>
    }
}
