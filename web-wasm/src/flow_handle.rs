//! 画面から撮影フローを操作するハンドル
//!
//! フローはシングルスレッドで共有し、カメラ操作中の呼び出しは `Busy` として通知する。
//! 画面に出す内容は操作のたびに取り直すスナップショットだけ。

use crate::camera::{BrowserCamera, BrowserTimer};
use crate::notice::{use_notices, Notices};
use leptos::prelude::*;
use leptos::task::spawn_local;
use truck_capture_common::{
    CaptureError, CaptureFlowController, CaptureProvider, CaptureResult, CaptureSettings,
    CaptureSink, FlowSnapshot, SharedFlow, ShotTarget,
};

pub type BrowserController = CaptureFlowController<BrowserCamera, BrowserTimer>;

enum DeviceOp {
    Open(ShotTarget),
    Capture,
    Retake(String),
}

#[derive(Clone, Copy)]
pub struct FlowHandle {
    flow: StoredValue<SharedFlow<BrowserCamera, BrowserTimer>, LocalStorage>,
    snapshot: RwSignal<FlowSnapshot>,
    busy: RwSignal<bool>,
    notices: Notices,
}

impl FlowHandle {
    pub fn new(camera: BrowserCamera, settings: CaptureSettings) -> Self {
        let controller = CaptureFlowController::new(camera, BrowserTimer, settings);
        Self {
            flow: StoredValue::new_local(SharedFlow::new(controller)),
            snapshot: RwSignal::new(FlowSnapshot::default()),
            busy: RwSignal::new(false),
            notices: use_notices(),
        }
    }

    pub fn snapshot(&self) -> ReadSignal<FlowSnapshot> {
        self.snapshot.read_only()
    }

    /// カメラ操作の処理中
    pub fn busy(&self) -> ReadSignal<bool> {
        self.busy.read_only()
    }

    pub fn start(&self, provider: CaptureProvider) {
        self.with_flow(|flow| flow.start(provider));
    }

    pub fn update_settings(&self, settings: CaptureSettings) {
        self.with_flow(|flow| {
            flow.update_settings(settings);
            Ok(())
        });
    }

    pub fn open(&self, shot: ShotTarget) {
        self.run(DeviceOp::Open(shot));
    }

    pub fn capture(&self) {
        self.run(DeviceOp::Capture);
    }

    pub fn retake(&self, id: &str) {
        self.run(DeviceOp::Retake(id.to_string()));
    }

    pub fn close_camera(&self) {
        self.with_flow(|flow| {
            flow.close_camera();
            Ok(())
        });
    }

    pub fn remove_page(&self, index: usize) {
        self.with_flow(|flow| flow.remove_page(index));
    }

    /// 撮影を破棄（カメラ操作中なら再開時に破棄される）
    pub fn cancel(&self) {
        let Some(flow) = self.flow.try_get_value() else {
            return;
        };
        flow.cancel();
        if let Ok(guard) = flow.try_lock() {
            self.snapshot.try_set(guard.snapshot());
        }
    }

    /// 破棄してから新しい撮影を始める
    ///
    /// カメラ操作中なら、その操作が中断で終わったところで始め直す。
    pub fn restart(&self, provider: CaptureProvider) {
        let Some(flow) = self.flow.try_get_value() else {
            return;
        };
        let result = flow.restart(provider);
        if let Ok(guard) = flow.try_lock() {
            self.snapshot.try_set(guard.snapshot());
        }
        if let Err(e) = result {
            self.notices.capture_error(&e);
        }
    }

    /// 撮影結果を確定して受け取り先へ渡す
    pub fn finish<S: CaptureSink>(&self, sink: &mut S) -> Option<String> {
        self.with_flow(|flow| flow.finish(sink))
    }

    fn with_flow<T>(&self, action: impl FnOnce(&mut BrowserController) -> CaptureResult<T>) -> Option<T> {
        let flow = self.flow.try_get_value()?;
        let result = match flow.try_lock() {
            Ok(mut guard) => {
                let result = action(&mut guard);
                self.snapshot.try_set(guard.snapshot());
                result
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.notices.capture_error(&e);
                None
            }
        }
    }

    fn run(&self, op: DeviceOp) {
        let Some(flow) = self.flow.try_get_value() else {
            return;
        };
        let this = *self;

        spawn_local(async move {
            let mut guard = match flow.try_lock() {
                Ok(guard) => guard,
                Err(e) => {
                    this.notices.capture_error(&e);
                    return;
                }
            };
            this.busy.try_set(true);

            let result = match op {
                DeviceOp::Open(shot) => guard.open_camera(shot).await.map(|_| None),
                DeviceOp::Capture => guard.capture().await.map(Some),
                DeviceOp::Retake(id) => guard.retake(&id).await.map(|_| None),
            };
            let snapshot = guard.snapshot();
            drop(guard);

            this.busy.try_set(false);
            match result {
                Ok(Some(id)) => {
                    let name = snapshot
                        .targets
                        .iter()
                        .find(|t| t.id == id)
                        .map(|t| t.display_name.clone())
                        .unwrap_or(id);
                    this.notices.success("撮影しました", &name);
                }
                // 中断はユーザー操作なので通知しない
                Ok(None) | Err(CaptureError::Cancelled) => {}
                Err(e) => this.notices.capture_error(&e),
            }
            this.snapshot.try_set(snapshot);
        });
    }
}
