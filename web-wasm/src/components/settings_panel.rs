//! 撮影設定パネルコンポーネント

use crate::notice::use_notices;
use crate::storage::save_capture_settings;
use leptos::prelude::*;
use truck_capture_common::{CaptureSettings, Facing};

#[component]
pub fn SettingsPanel(settings: RwSignal<CaptureSettings>) -> impl IntoView {
    let notices = use_notices();

    let apply = move |change: Box<dyn FnOnce(&mut CaptureSettings)>| {
        let mut next = settings.get_untracked();
        change(&mut next);
        match save_capture_settings(&next) {
            Ok(()) => settings.set(next),
            Err(e) => notices.error("設定を保存できません", &e),
        }
    };

    view! {
        <div class="card settings-panel">
            <h2>"📷 撮影設定"</h2>
            <div class="settings-grid">
                <div class="form-group">
                    <label for="facing">"カメラ"</label>
                    <select
                        id="facing"
                        on:change=move |ev| {
                            let facing = if event_target_value(&ev) == "user" {
                                Facing::User
                            } else {
                                Facing::Environment
                            };
                            apply(Box::new(move |s| s.facing = facing));
                        }
                    >
                        <option value="environment" selected=move || settings.get().facing == Facing::Environment>
                            "背面"
                        </option>
                        <option value="user" selected=move || settings.get().facing == Facing::User>
                            "前面"
                        </option>
                    </select>
                </div>

                <div class="form-group">
                    <label for="jpeg-quality">"画質"</label>
                    <select
                        id="jpeg-quality"
                        on:change=move |ev| {
                            let quality: f32 = event_target_value(&ev).parse().unwrap_or(0.8);
                            apply(Box::new(move |s| s.jpeg_quality = quality));
                        }
                    >
                        <option value="0.6" selected=move || settings.get().jpeg_quality == 0.6>"低（0.6）"</option>
                        <option value="0.8" selected=move || settings.get().jpeg_quality == 0.8>"標準（0.8）"</option>
                        <option value="0.95" selected=move || settings.get().jpeg_quality == 0.95>"高（0.95）"</option>
                    </select>
                </div>

                <div class="form-group">
                    <label for="acquisition-timeout">"カメラ起動の待ち時間（秒）"</label>
                    <input
                        type="number"
                        id="acquisition-timeout"
                        min="1"
                        prop:value=move || (settings.get().acquisition_timeout_ms / 1000).to_string()
                        on:change=move |ev| {
                            match event_target_value(&ev).parse::<u64>() {
                                Ok(secs) if secs > 0 => {
                                    apply(Box::new(move |s| s.acquisition_timeout_ms = secs * 1000));
                                }
                                _ => notices.error("設定できません", "1秒以上を指定してください"),
                            }
                        }
                    />
                </div>

                <label class="toggle">
                    <input
                        type="checkbox"
                        prop:checked=move || settings.get().keep_camera_open_for_pages
                        on:change=move |ev| {
                            let checked = event_target_checked(&ev);
                            apply(Box::new(move |s| s.keep_camera_open_for_pages = checked));
                        }
                    />
                    "書類は連続撮影（ページごとにカメラを閉じない）"
                </label>
            </div>
        </div>
    }
}
