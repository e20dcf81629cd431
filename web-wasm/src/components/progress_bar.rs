//! プログレスバーコンポーネント

use leptos::prelude::*;

/// 撮影済み枚数の進み具合
#[component]
pub fn ProgressBar(progress: Signal<(usize, usize)>) -> impl IntoView {
    let ratio = move || {
        let (done, total) = progress.get();
        if total == 0 {
            0.0
        } else {
            done as f32 / total as f32
        }
    };

    view! {
        <div class="progress-container">
            <div class="progress-bar">
                <div
                    class="progress-fill"
                    style=move || format!("width: {}%", ratio() * 100.0)
                />
            </div>
            <p class="progress-text">
                {move || {
                    let (done, total) = progress.get();
                    format!("{} / {} 完了", done, total)
                }}
            </p>
        </div>
    }
}
