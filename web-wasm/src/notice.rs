//! 通知（トースト）
//!
//! エラーはパニックにせず、ここに積んで画面に出す。

use gloo::timers::callback::Timeout;
use leptos::prelude::*;
use truck_capture_common::CaptureError;

const DISMISS_MS: u32 = 4000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Success,
    Error,
}

impl NoticeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoticeKind::Info => "info",
            NoticeKind::Success => "success",
            NoticeKind::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: u64,
    pub kind: NoticeKind,
    pub title: String,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct NoticeList {
    next_id: u64,
    items: Vec<Notice>,
}

impl NoticeList {
    pub fn push(&mut self, kind: NoticeKind, title: &str, message: &str) -> u64 {
        self.next_id += 1;
        self.items.push(Notice {
            id: self.next_id,
            kind,
            title: title.to_string(),
            message: message.to_string(),
        });
        self.next_id
    }

    pub fn dismiss(&mut self, id: u64) {
        self.items.retain(|n| n.id != id);
    }

    pub fn items(&self) -> &[Notice] {
        &self.items
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Notices(RwSignal<NoticeList>);

impl Notices {
    pub fn new() -> Self {
        Self(RwSignal::new(NoticeList::default()))
    }

    pub fn info(&self, title: &str, message: &str) {
        self.push(NoticeKind::Info, title, message);
    }

    pub fn success(&self, title: &str, message: &str) {
        self.push(NoticeKind::Success, title, message);
    }

    pub fn error(&self, title: &str, message: &str) {
        gloo::console::warn!(format!("{}: {}", title, message));
        self.push(NoticeKind::Error, title, message);
    }

    pub fn capture_error(&self, error: &CaptureError) {
        match error {
            CaptureError::Cancelled => self.info(error.title(), &error.to_string()),
            _ => self.error(error.title(), &error.to_string()),
        }
    }

    pub fn dismiss(&self, id: u64) {
        self.0.try_update(|list| list.dismiss(id));
    }

    pub fn list(&self) -> RwSignal<NoticeList> {
        self.0
    }

    fn push(&self, kind: NoticeKind, title: &str, message: &str) {
        let Some(id) = self.0.try_update(|list| list.push(kind, title, message)) else {
            return;
        };
        let this = *self;
        Timeout::new(DISMISS_MS, move || this.dismiss(id)).forget();
    }
}

impl Default for Notices {
    fn default() -> Self {
        Self::new()
    }
}

pub fn use_notices() -> Notices {
    use_context::<Notices>().unwrap_or_default()
}

#[component]
pub fn NoticeArea() -> impl IntoView {
    let notices = use_notices();

    view! {
        <div class="notice-area">
            <For
                each=move || notices.list().with(|l| l.items().to_vec())
                key=|notice| notice.id
                children=move |notice| {
                    let id = notice.id;
                    view! {
                        <div
                            class=format!("notice notice-{}", notice.kind.as_str())
                            on:click=move |_| notices.dismiss(id)
                        >
                            <strong>{notice.title}</strong>
                            <p>{notice.message}</p>
                        </div>
                    }
                }
            />
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_list_push_and_dismiss() {
        let mut list = NoticeList::default();
        let first = list.push(NoticeKind::Info, "撮影", "正面を撮影しました");
        let second = list.push(NoticeKind::Error, "カメラ", "拒否されました");
        assert_ne!(first, second);
        assert_eq!(list.items().len(), 2);

        list.dismiss(first);
        assert_eq!(list.items().len(), 1);
        assert_eq!(list.items()[0].kind, NoticeKind::Error);

        // 存在しないIDは無視
        list.dismiss(999);
        assert_eq!(list.items().len(), 1);
    }
}
