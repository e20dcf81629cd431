//! 下部タブナビゲーション

use crate::app::Tab;
use leptos::prelude::*;

#[component]
pub fn BottomNav(active: ReadSignal<Tab>, set_active: WriteSignal<Tab>) -> impl IntoView {
    view! {
        <nav class="bottom-nav">
            {Tab::ALL
                .into_iter()
                .map(|tab| {
                    view! {
                        <button
                            class="nav-tab"
                            class:active=move || active.get() == tab
                            on:click=move |_| set_active.set(tab)
                        >
                            <span class="nav-icon">{tab.icon()}</span>
                            <span class="nav-label">{tab.label()}</span>
                        </button>
                    }
                })
                .collect_view()}
        </nav>
    }
}
