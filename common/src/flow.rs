//! 撮影フロー制御
//!
//! 点検チェックリストと書類ページを一つのステートマシンで扱う。
//!
//! ```text
//! Idle ──start──▶ SelectingTarget ──open_camera──▶ CameraActive
//!  ▲                    ▲                           │  ▲
//!  │                    └──────close_camera─────────┤  │ open_camera / retake
//!  │                                                ▼  │
//!  └──── finish / cancel ◀──────────────────── ReviewingPhotos
//! ```
//!
//! カメラはどの経路で Idle に戻る場合も必ず閉じる。

use crate::camera::{CameraDevice, CameraSession, Timer};
use crate::capture_set::CapturePointSet;
use crate::error::{CaptureError, CaptureResult};
use crate::image::EncodedImage;
use crate::settings::CaptureSettings;
use crate::types::{CapturedDocument, DocumentType, InspectionReport, TargetSpec};
use chrono::Utc;
use futures::lock::{Mutex, MutexGuard};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// フローの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    SelectingTarget,
    CameraActive,
    ReviewingPhotos,
}

impl FlowState {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowState::Idle => "idle",
            FlowState::SelectingTarget => "selecting",
            FlowState::CameraActive => "camera",
            FlowState::ReviewingPhotos => "reviewing",
        }
    }
}

/// 撮影対象の供給元
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureProvider {
    /// 固定の点検チェックリスト
    FixedChecklist { title: String, targets: Vec<TargetSpec> },
    /// 枚数自由の書類ページ
    OpenEndedPageList { document_type: DocumentType, name: String },
}

impl CaptureProvider {
    pub fn truck_inspection() -> Self {
        CaptureProvider::FixedChecklist {
            title: "トラック点検".to_string(),
            targets: crate::types::truck_checklist(),
        }
    }

    pub fn document(document_type: DocumentType) -> Self {
        CaptureProvider::OpenEndedPageList {
            document_type,
            name: document_type.label().to_string(),
        }
    }

    pub fn title(&self) -> &str {
        match self {
            CaptureProvider::FixedChecklist { title, .. } => title,
            CaptureProvider::OpenEndedPageList { name, .. } => name,
        }
    }

    pub fn is_page_list(&self) -> bool {
        matches!(self, CaptureProvider::OpenEndedPageList { .. })
    }
}

/// 次のフレームで埋める対象
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShotTarget {
    /// 既存の対象（点検箇所、または撮り直すページ）
    Point(String),
    /// 書類の新しいページ
    NewPage,
}

/// 撮影後のカメラの扱い
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraPolicy {
    CloseAfterShot,
    KeepOpen,
}

/// 撮影完了時の成果物
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureOutcome {
    Document(CapturedDocument),
    Inspection(InspectionReport),
}

impl CaptureOutcome {
    pub fn id(&self) -> &str {
        match self {
            CaptureOutcome::Document(doc) => &doc.id,
            CaptureOutcome::Inspection(report) => &report.id,
        }
    }
}

/// 成果物の受け取り先
pub trait CaptureSink {
    fn on_capture_finished(&mut self, outcome: CaptureOutcome);
}

impl CaptureSink for Vec<CaptureOutcome> {
    fn on_capture_finished(&mut self, outcome: CaptureOutcome) {
        self.push(outcome);
    }
}

/// 中断要求（処理中の操作が再開時に確認する）
///
/// 中断後に始め直す撮影を一緒に預けられる。
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    requested: Rc<Cell<bool>>,
    restart: Rc<RefCell<Option<CaptureProvider>>>,
}

impl AbortSignal {
    pub fn request(&self) {
        self.requested.set(true);
    }

    /// 中断して、破棄の直後に `provider` で撮影を始め直す
    pub fn request_restart(&self, provider: CaptureProvider) {
        *self.restart.borrow_mut() = Some(provider);
        self.request();
    }

    pub fn is_requested(&self) -> bool {
        self.requested.get()
    }

    fn take(&self) -> bool {
        self.requested.replace(false)
    }

    fn take_restart(&self) -> Option<CaptureProvider> {
        self.restart.borrow_mut().take()
    }

    fn reset(&self) {
        self.take();
        self.take_restart();
    }
}

struct ActiveSession {
    provider: CaptureProvider,
    set: CapturePointSet,
    shot: Option<ShotTarget>,
    policy: CameraPolicy,
}

pub struct CaptureFlowController<D: CameraDevice, T: Timer> {
    camera: CameraSession<D, T>,
    settings: CaptureSettings,
    state: FlowState,
    session: Option<ActiveSession>,
    abort: AbortSignal,
    sequence: u64,
}

impl<D: CameraDevice, T: Timer> CaptureFlowController<D, T> {
    pub fn new(device: D, timer: T, settings: CaptureSettings) -> Self {
        let camera = CameraSession::new(device, timer, settings.acquisition_timeout());
        Self {
            camera,
            settings,
            state: FlowState::Idle,
            session: None,
            abort: AbortSignal::default(),
            sequence: 0,
        }
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    pub fn settings(&self) -> &CaptureSettings {
        &self.settings
    }

    pub fn update_settings(&mut self, settings: CaptureSettings) {
        self.camera.set_timeout(settings.acquisition_timeout());
        self.settings = settings;
    }

    pub fn is_camera_active(&self) -> bool {
        self.camera.is_active()
    }

    pub fn capture_set(&self) -> Option<&CapturePointSet> {
        self.session.as_ref().map(|s| &s.set)
    }

    pub fn provider(&self) -> Option<&CaptureProvider> {
        self.session.as_ref().map(|s| &s.provider)
    }

    pub fn current_shot(&self) -> Option<&ShotTarget> {
        self.session.as_ref().and_then(|s| s.shot.as_ref())
    }

    pub fn abort_signal(&self) -> AbortSignal {
        self.abort.clone()
    }

    pub fn device(&self) -> &D {
        self.camera.device()
    }

    /// 撮影セッションを開始（Idle → SelectingTarget）
    pub fn start(&mut self, provider: CaptureProvider) -> CaptureResult<()> {
        self.expect_state(&[FlowState::Idle], "start")?;

        let (set, policy) = match &provider {
            CaptureProvider::FixedChecklist { targets, .. } => (
                CapturePointSet::initialize(targets.iter().cloned()),
                CameraPolicy::CloseAfterShot,
            ),
            CaptureProvider::OpenEndedPageList { .. } => (
                CapturePointSet::pages(),
                if self.settings.keep_camera_open_for_pages {
                    CameraPolicy::KeepOpen
                } else {
                    CameraPolicy::CloseAfterShot
                },
            ),
        };

        tracing::debug!(title = provider.title(), "撮影セッション開始");
        self.abort.reset();
        self.session = Some(ActiveSession {
            provider,
            set,
            shot: None,
            policy,
        });
        self.state = FlowState::SelectingTarget;
        Ok(())
    }

    /// カメラを起動して撮影対象を決める
    ///
    /// 起動に失敗した場合は元の状態に戻り、エラーを返す（再試行可能）。
    pub async fn open_camera(&mut self, shot: ShotTarget) -> CaptureResult<()> {
        if self.state == FlowState::CameraActive {
            // 撮影中に対象だけ切り替える
            self.validate_shot(&shot)?;
            if let Some(session) = self.session.as_mut() {
                session.shot = Some(shot);
            }
            return Ok(());
        }

        self.expect_state(
            &[FlowState::SelectingTarget, FlowState::ReviewingPhotos],
            "open_camera",
        )?;
        self.validate_shot(&shot)?;

        let constraints = self.settings.constraints();
        let opened = self.camera.open(&constraints).await;

        if self.abort_if_requested() {
            return Err(CaptureError::Cancelled);
        }
        opened?;

        if let Some(session) = self.session.as_mut() {
            session.shot = Some(shot);
        }
        self.state = FlowState::CameraActive;
        Ok(())
    }

    /// 現在のフレームを撮影して対象に反映する
    ///
    /// 反映した対象のIDを返す。
    pub async fn capture(&mut self) -> CaptureResult<String> {
        if self.state != FlowState::CameraActive || !self.camera.is_active() {
            return Err(CaptureError::NotActive);
        }

        let quality = self.settings.jpeg_quality;
        let frame = self.camera.capture_frame(quality).await;

        // 中断されたフレームは反映しない
        if self.abort_if_requested() {
            return Err(CaptureError::Cancelled);
        }
        let image = frame?;

        let session = self.session.as_mut().ok_or(CaptureError::NotActive)?;
        let shot = session.shot.clone().ok_or(CaptureError::NotActive)?;
        let id = apply_shot(&mut session.set, &shot, image)?;
        let policy = session.policy;

        tracing::debug!(id = %id, "撮影");

        if policy == CameraPolicy::CloseAfterShot {
            session.shot = None;
            self.camera.close();
            self.state = FlowState::ReviewingPhotos;
        } else if shot != ShotTarget::NewPage {
            // 撮り直しは1枚で終わる。連続撮影は新規ページに戻す
            session.shot = Some(ShotTarget::NewPage);
        }
        Ok(id)
    }

    /// 撮り直し: 画像を外してからカメラを起動する
    ///
    /// 起動に失敗しても画像は外れたまま（未撮影として一覧に戻る）。
    pub async fn retake(&mut self, id: &str) -> CaptureResult<()> {
        self.expect_state(
            &[
                FlowState::SelectingTarget,
                FlowState::ReviewingPhotos,
                FlowState::CameraActive,
            ],
            "retake",
        )?;

        let session = self.session.as_mut().ok_or(CaptureError::EmptyCaptureSet)?;
        session.set.clear_image(id)?;

        if self.state != FlowState::CameraActive && self.captured_count() == 0 {
            self.state = FlowState::SelectingTarget;
        }
        self.open_camera(ShotTarget::Point(id.to_string())).await
    }

    /// 撮影画面だけを閉じる（撮影済みの写真は残す）
    pub fn close_camera(&mut self) {
        self.camera.close();
        if self.state != FlowState::CameraActive {
            return;
        }
        if let Some(session) = self.session.as_mut() {
            session.shot = None;
        }
        self.state = if self.captured_count() > 0 {
            FlowState::ReviewingPhotos
        } else {
            FlowState::SelectingTarget
        };
    }

    /// 書類ページを削除
    pub fn remove_page(&mut self, index: usize) -> CaptureResult<()> {
        let state = self.state;
        let session = self
            .session
            .as_mut()
            .ok_or(CaptureError::InvalidTransition { state, action: "remove_page" })?;
        if !session.provider.is_page_list() {
            return Err(CaptureError::InvalidTransition { state, action: "remove_page" });
        }

        let removed = session.set.remove_page(index)?;
        if session.shot == Some(ShotTarget::Point(removed.id.clone())) {
            session.shot = Some(ShotTarget::NewPage);
        }

        if self.state == FlowState::ReviewingPhotos && self.captured_count() == 0 {
            self.state = FlowState::SelectingTarget;
        }
        Ok(())
    }

    /// 撮影セッションを破棄して Idle に戻る
    pub fn cancel(&mut self) {
        if self.state != FlowState::Idle {
            tracing::debug!(state = self.state.as_str(), "撮影キャンセル");
        }
        self.abort.reset();
        self.discard();
    }

    /// 撮影結果を確定して受け取り先へ渡す
    ///
    /// 成果物のIDを返す。写真が1枚もなければ `EmptyCaptureSet`。
    pub fn finish<S>(&mut self, sink: &mut S) -> CaptureResult<String>
    where
        S: CaptureSink + ?Sized,
    {
        if self.captured_count() == 0 {
            return Err(CaptureError::EmptyCaptureSet);
        }

        self.camera.close();
        let session = self.session.take().ok_or(CaptureError::EmptyCaptureSet)?;
        self.state = FlowState::Idle;

        let created_at = Utc::now();
        self.sequence += 1;
        let outcome = match session.provider {
            CaptureProvider::OpenEndedPageList { document_type, name } => {
                let pages: Vec<EncodedImage> = session.set.images().cloned().collect();
                CaptureOutcome::Document(CapturedDocument {
                    id: format!("doc-{}-{}", created_at.timestamp_millis(), self.sequence),
                    name,
                    document_type,
                    pages,
                    converted: false,
                    created_at,
                })
            }
            CaptureProvider::FixedChecklist { title, .. } => {
                let complete = session.set.is_complete();
                CaptureOutcome::Inspection(InspectionReport {
                    id: format!("insp-{}-{}", created_at.timestamp_millis(), self.sequence),
                    title,
                    points: session.set.into_targets(),
                    complete,
                    created_at,
                })
            }
        };

        let id = outcome.id().to_string();
        tracing::debug!(id = %id, "撮影完了");
        sink.on_capture_finished(outcome);
        Ok(id)
    }

    fn captured_count(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.set.captured_count())
    }

    /// 中断要求があれば破棄し、預かった撮影があれば始め直す
    fn abort_if_requested(&mut self) -> bool {
        if !self.abort.take() {
            return false;
        }
        let restart = self.abort.take_restart();
        self.discard();
        if let Some(provider) = restart {
            if let Err(e) = self.start(provider) {
                tracing::warn!(error = %e, "中断後の再開始に失敗");
            }
        }
        true
    }

    fn discard(&mut self) {
        self.camera.close();
        self.session = None;
        self.state = FlowState::Idle;
    }

    fn expect_state(&self, allowed: &[FlowState], action: &'static str) -> CaptureResult<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(CaptureError::InvalidTransition {
                state: self.state,
                action,
            })
        }
    }

    fn validate_shot(&self, shot: &ShotTarget) -> CaptureResult<()> {
        let session = self.session.as_ref().ok_or(CaptureError::InvalidTransition {
            state: self.state,
            action: "open_camera",
        })?;
        match shot {
            ShotTarget::Point(id) => session
                .set
                .get(id)
                .map(|_| ())
                .ok_or_else(|| CaptureError::UnknownTarget(id.clone())),
            ShotTarget::NewPage if session.provider.is_page_list() => Ok(()),
            ShotTarget::NewPage => Err(CaptureError::InvalidTransition {
                state: self.state,
                action: "open_camera(NewPage)",
            }),
        }
    }
}

fn apply_shot(set: &mut CapturePointSet, shot: &ShotTarget, image: EncodedImage) -> CaptureResult<String> {
    match shot {
        ShotTarget::Point(id) => {
            set.set_image(id, image)?;
            Ok(id.clone())
        }
        ShotTarget::NewPage => {
            let index = set.append_page(image);
            Ok(set.targets()[index].id.clone())
        }
    }
}

/// 画面表示用のスナップショット
#[derive(Debug, Clone, PartialEq)]
pub struct FlowSnapshot {
    pub state: FlowState,
    pub title: Option<String>,
    pub is_page_list: bool,
    pub camera_active: bool,
    pub current_shot: Option<ShotTarget>,
    pub targets: Vec<TargetView>,
    pub progress: (usize, usize),
    pub complete: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TargetView {
    pub id: String,
    pub display_name: String,
    pub description: Option<String>,
    pub completed: bool,
    pub preview_url: Option<String>,
}

impl Default for FlowSnapshot {
    fn default() -> Self {
        Self {
            state: FlowState::Idle,
            title: None,
            is_page_list: false,
            camera_active: false,
            current_shot: None,
            targets: Vec::new(),
            progress: (0, 0),
            complete: false,
        }
    }
}

impl<D: CameraDevice, T: Timer> CaptureFlowController<D, T> {
    pub fn snapshot(&self) -> FlowSnapshot {
        let Some(session) = self.session.as_ref() else {
            return FlowSnapshot {
                camera_active: self.camera.is_active(),
                ..FlowSnapshot::default()
            };
        };

        FlowSnapshot {
            state: self.state,
            title: Some(session.provider.title().to_string()),
            is_page_list: session.provider.is_page_list(),
            camera_active: self.camera.is_active(),
            current_shot: session.shot.clone(),
            targets: session
                .set
                .targets()
                .iter()
                .map(|t| TargetView {
                    id: t.id.clone(),
                    display_name: t.display_name.clone(),
                    description: t.description.clone(),
                    completed: t.completed(),
                    preview_url: t.image().map(|img| img.to_data_url()),
                })
                .collect(),
            progress: session.set.progress(),
            complete: !session.set.is_empty() && session.set.is_complete(),
        }
    }
}

/// シングルスレッドで共有するフローのハンドル
///
/// デバイス操作が終わるまでロックを保持するので、その間の呼び出しは `Busy` になる。
pub struct SharedFlow<D: CameraDevice, T: Timer> {
    inner: Rc<Mutex<CaptureFlowController<D, T>>>,
    abort: AbortSignal,
}

impl<D: CameraDevice, T: Timer> Clone for SharedFlow<D, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
            abort: self.abort.clone(),
        }
    }
}

impl<D: CameraDevice, T: Timer> SharedFlow<D, T> {
    pub fn new(controller: CaptureFlowController<D, T>) -> Self {
        let abort = controller.abort_signal();
        Self {
            inner: Rc::new(Mutex::new(controller)),
            abort,
        }
    }

    /// ロックを取得（処理中なら `Busy`）
    pub fn try_lock(&self) -> CaptureResult<MutexGuard<'_, CaptureFlowController<D, T>>> {
        self.inner.try_lock().ok_or(CaptureError::Busy)
    }

    /// 即座にキャンセルする
    ///
    /// 処理中の操作がある場合は中断を要求し、その操作の再開時に破棄される。
    pub fn cancel(&self) {
        match self.inner.try_lock() {
            Some(mut flow) => flow.cancel(),
            None => {
                // 先に預けた再開始は取り消す
                self.abort.take_restart();
                self.abort.request();
            }
        }
    }

    /// 破棄して新しい撮影を始める
    ///
    /// 処理中の操作がある場合は、その操作が中断で終わったときに始め直す。
    pub fn restart(&self, provider: CaptureProvider) -> CaptureResult<()> {
        match self.inner.try_lock() {
            Some(mut flow) => {
                flow.cancel();
                flow.start(provider)
            }
            None => {
                self.abort.request_restart(provider);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::mock::*;
    use futures::executor::block_on;

    type TestFlow = CaptureFlowController<MockCamera, NeverTimer>;

    fn flow(behavior: OpenBehavior) -> (TestFlow, MockCamera) {
        let camera = MockCamera::new(behavior);
        let flow = CaptureFlowController::new(camera.clone(), NeverTimer, CaptureSettings::default());
        (flow, camera)
    }

    fn shoot_point(flow: &mut TestFlow, id: &str) {
        block_on(flow.open_camera(ShotTarget::Point(id.into()))).unwrap();
        block_on(flow.capture()).unwrap();
    }

    #[test]
    fn test_checklist_closes_camera_after_each_shot() {
        let (mut flow, camera) = flow(OpenBehavior::Grant);
        flow.start(CaptureProvider::truck_inspection()).unwrap();
        assert_eq!(flow.state(), FlowState::SelectingTarget);

        block_on(flow.open_camera(ShotTarget::Point("front".into()))).unwrap();
        assert_eq!(flow.state(), FlowState::CameraActive);
        assert!(flow.is_camera_active());

        let id = block_on(flow.capture()).unwrap();
        assert_eq!(id, "front");
        assert_eq!(flow.state(), FlowState::ReviewingPhotos);
        assert!(!flow.is_camera_active());
        assert_eq!(camera.live_streams(), 0);
        assert_eq!(flow.capture_set().unwrap().progress(), (1, 6));
    }

    #[test]
    fn test_complete_checklist_finishes_as_complete_report() {
        let (mut flow, camera) = flow(OpenBehavior::Grant);
        flow.start(CaptureProvider::truck_inspection()).unwrap();
        for spec in crate::types::truck_checklist() {
            shoot_point(&mut flow, &spec.id);
        }
        assert!(flow.snapshot().complete);

        let mut sink = Vec::new();
        let id = flow.finish(&mut sink).unwrap();
        assert!(id.starts_with("insp-"));
        assert_eq!(flow.state(), FlowState::Idle);
        assert_eq!(camera.live_streams(), 0);

        match &sink[0] {
            CaptureOutcome::Inspection(report) => {
                assert!(report.complete);
                assert_eq!(report.photo_count(), 6);
            }
            other => panic!("想定外の成果物: {:?}", other),
        }
    }

    #[test]
    fn test_partial_checklist_can_finish() {
        let (mut flow, _camera) = flow(OpenBehavior::Grant);
        flow.start(CaptureProvider::truck_inspection()).unwrap();
        shoot_point(&mut flow, "rear");

        let mut sink = Vec::new();
        flow.finish(&mut sink).unwrap();
        assert!(matches!(&sink[0], CaptureOutcome::Inspection(r) if !r.complete));
    }

    #[test]
    fn test_permission_denied_returns_to_origin() {
        let (mut flow, camera) = flow(OpenBehavior::Deny);
        flow.start(CaptureProvider::truck_inspection()).unwrap();

        let result = block_on(flow.open_camera(ShotTarget::Point("front".into())));
        assert!(matches!(result, Err(CaptureError::PermissionDenied(_))));
        assert_eq!(flow.state(), FlowState::SelectingTarget);

        // 許可後に再試行できる
        camera.behavior.set(OpenBehavior::Grant);
        block_on(flow.open_camera(ShotTarget::Point("front".into()))).unwrap();
        assert_eq!(flow.state(), FlowState::CameraActive);
    }

    #[test]
    fn test_device_unavailable_from_reviewing() {
        let (mut flow, camera) = flow(OpenBehavior::Grant);
        flow.start(CaptureProvider::truck_inspection()).unwrap();
        shoot_point(&mut flow, "front");

        camera.behavior.set(OpenBehavior::NoDevice);
        let result = block_on(flow.open_camera(ShotTarget::Point("rear".into())));
        assert!(matches!(result, Err(CaptureError::DeviceUnavailable(_))));
        assert_eq!(flow.state(), FlowState::ReviewingPhotos);
        assert_eq!(flow.current_shot(), None);
    }

    #[test]
    fn test_unknown_target_rejected_before_opening() {
        let (mut flow, camera) = flow(OpenBehavior::Grant);
        flow.start(CaptureProvider::truck_inspection()).unwrap();
        let result = block_on(flow.open_camera(ShotTarget::Point("roof".into())));
        assert_eq!(result, Err(CaptureError::UnknownTarget("roof".into())));
        assert_eq!(camera.opened.get(), 0);
    }

    #[test]
    fn test_new_page_invalid_for_checklist() {
        let (mut flow, _camera) = flow(OpenBehavior::Grant);
        flow.start(CaptureProvider::truck_inspection()).unwrap();
        let result = block_on(flow.open_camera(ShotTarget::NewPage));
        assert!(matches!(result, Err(CaptureError::InvalidTransition { .. })));
    }

    #[test]
    fn test_capture_without_camera_is_not_active() {
        let (mut flow, _camera) = flow(OpenBehavior::Grant);
        assert_eq!(block_on(flow.capture()), Err(CaptureError::NotActive));

        flow.start(CaptureProvider::document(DocumentType::Manifest)).unwrap();
        assert_eq!(block_on(flow.capture()), Err(CaptureError::NotActive));
    }

    #[test]
    fn test_cancel_from_camera_active() {
        let (mut flow, camera) = flow(OpenBehavior::Grant);
        flow.start(CaptureProvider::truck_inspection()).unwrap();
        shoot_point(&mut flow, "front");
        block_on(flow.open_camera(ShotTarget::Point("rear".into()))).unwrap();

        flow.cancel();

        assert_eq!(flow.state(), FlowState::Idle);
        assert!(!flow.is_camera_active());
        assert_eq!(camera.live_streams(), 0);
        assert!(flow.capture_set().is_none());
        assert_eq!(flow.finish(&mut Vec::<CaptureOutcome>::new()), Err(CaptureError::EmptyCaptureSet));
    }

    #[test]
    fn test_document_flow_keeps_camera_open() {
        let (mut flow, camera) = flow(OpenBehavior::Grant);
        flow.start(CaptureProvider::document(DocumentType::BillOfLading)).unwrap();
        block_on(flow.open_camera(ShotTarget::NewPage)).unwrap();

        block_on(flow.capture()).unwrap();
        block_on(flow.capture()).unwrap();
        assert_eq!(flow.state(), FlowState::CameraActive);
        assert_eq!(camera.opened.get(), 1);
        assert_eq!(flow.capture_set().unwrap().len(), 2);

        let mut sink = Vec::new();
        let id = flow.finish(&mut sink).unwrap();
        assert!(id.starts_with("doc-"));
        assert_eq!(camera.live_streams(), 0);

        match &sink[0] {
            CaptureOutcome::Document(doc) => {
                assert_eq!(doc.document_type, DocumentType::BillOfLading);
                assert_eq!(doc.pages.len(), 2);
                assert!(!doc.converted);
            }
            other => panic!("想定外の成果物: {:?}", other),
        }
    }

    #[test]
    fn test_document_flow_close_after_shot_policy() {
        let camera = MockCamera::new(OpenBehavior::Grant);
        let settings = CaptureSettings {
            keep_camera_open_for_pages: false,
            ..Default::default()
        };
        let mut flow = CaptureFlowController::new(camera.clone(), NeverTimer, settings);
        flow.start(CaptureProvider::document(DocumentType::Other)).unwrap();
        block_on(flow.open_camera(ShotTarget::NewPage)).unwrap();
        block_on(flow.capture()).unwrap();
        assert_eq!(flow.state(), FlowState::ReviewingPhotos);
        assert_eq!(camera.live_streams(), 0);
    }

    #[test]
    fn test_document_remove_page_then_finish() {
        let (mut flow, _camera) = flow(OpenBehavior::Grant);
        flow.start(CaptureProvider::document(DocumentType::Manifest)).unwrap();
        block_on(flow.open_camera(ShotTarget::NewPage)).unwrap();
        block_on(flow.capture()).unwrap();
        block_on(flow.capture()).unwrap();
        flow.close_camera();
        assert_eq!(flow.state(), FlowState::ReviewingPhotos);

        flow.remove_page(0).unwrap();
        assert_eq!(
            flow.remove_page(5),
            Err(CaptureError::IndexOutOfRange { index: 5, len: 1 })
        );

        let mut sink = Vec::new();
        flow.finish(&mut sink).unwrap();
        match &sink[0] {
            CaptureOutcome::Document(doc) => assert_eq!(doc.pages[0].bytes, vec![2; 8]),
            other => panic!("想定外の成果物: {:?}", other),
        }
    }

    #[test]
    fn test_removing_last_page_returns_to_selecting() {
        let (mut flow, _camera) = flow(OpenBehavior::Grant);
        flow.start(CaptureProvider::document(DocumentType::Manifest)).unwrap();
        block_on(flow.open_camera(ShotTarget::NewPage)).unwrap();
        block_on(flow.capture()).unwrap();
        flow.close_camera();

        flow.remove_page(0).unwrap();
        assert_eq!(flow.state(), FlowState::SelectingTarget);
        assert_eq!(flow.finish(&mut Vec::<CaptureOutcome>::new()), Err(CaptureError::EmptyCaptureSet));
        assert_eq!(flow.state(), FlowState::SelectingTarget);
    }

    #[test]
    fn test_remove_page_rejected_for_checklist() {
        let (mut flow, _camera) = flow(OpenBehavior::Grant);
        flow.start(CaptureProvider::truck_inspection()).unwrap();
        assert!(matches!(
            flow.remove_page(0),
            Err(CaptureError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_finish_with_zero_pages() {
        let (mut flow, _camera) = flow(OpenBehavior::Grant);
        flow.start(CaptureProvider::document(DocumentType::Other)).unwrap();
        let mut sink = Vec::new();
        assert_eq!(flow.finish(&mut sink), Err(CaptureError::EmptyCaptureSet));
        assert!(sink.is_empty());
        assert_eq!(flow.state(), FlowState::SelectingTarget);
    }

    #[test]
    fn test_retake_clears_and_reopens() {
        let (mut flow, _camera) = flow(OpenBehavior::Grant);
        flow.start(CaptureProvider::truck_inspection()).unwrap();
        shoot_point(&mut flow, "engine");

        block_on(flow.retake("engine")).unwrap();
        assert_eq!(flow.state(), FlowState::CameraActive);
        assert!(!flow.capture_set().unwrap().get("engine").unwrap().completed());

        block_on(flow.capture()).unwrap();
        let image = flow.capture_set().unwrap().get("engine").unwrap().image().unwrap();
        assert_eq!(image.bytes, vec![2; 8]);
    }

    #[test]
    fn test_retake_denied_leaves_point_cleared() {
        let (mut flow, camera) = flow(OpenBehavior::Grant);
        flow.start(CaptureProvider::truck_inspection()).unwrap();
        shoot_point(&mut flow, "cabin");

        camera.behavior.set(OpenBehavior::Deny);
        let result = block_on(flow.retake("cabin"));
        assert!(matches!(result, Err(CaptureError::PermissionDenied(_))));
        assert_eq!(flow.state(), FlowState::SelectingTarget);
        assert_eq!(flow.capture_set().unwrap().progress(), (0, 6));
    }

    #[test]
    fn test_retake_page_while_camera_open() {
        let (mut flow, _camera) = flow(OpenBehavior::Grant);
        flow.start(CaptureProvider::document(DocumentType::Manifest)).unwrap();
        block_on(flow.open_camera(ShotTarget::NewPage)).unwrap();
        block_on(flow.capture()).unwrap();

        block_on(flow.retake("page-1")).unwrap();
        assert_eq!(flow.current_shot(), Some(&ShotTarget::Point("page-1".into())));
        block_on(flow.capture()).unwrap();

        // 撮り直し後は新規ページに戻る
        assert_eq!(flow.current_shot(), Some(&ShotTarget::NewPage));
        assert_eq!(flow.capture_set().unwrap().len(), 1);
    }

    #[test]
    fn test_close_camera_without_photos() {
        let (mut flow, camera) = flow(OpenBehavior::Grant);
        flow.start(CaptureProvider::truck_inspection()).unwrap();
        block_on(flow.open_camera(ShotTarget::Point("front".into()))).unwrap();
        flow.close_camera();
        assert_eq!(flow.state(), FlowState::SelectingTarget);
        assert_eq!(camera.live_streams(), 0);
    }

    #[test]
    fn test_start_while_active_is_invalid() {
        let (mut flow, _camera) = flow(OpenBehavior::Grant);
        flow.start(CaptureProvider::truck_inspection()).unwrap();
        let result = flow.start(CaptureProvider::document(DocumentType::Other));
        assert!(matches!(
            result,
            Err(CaptureError::InvalidTransition { state: FlowState::SelectingTarget, .. })
        ));
    }

    #[test]
    fn test_snapshot_reports_progress_and_previews() {
        let (mut flow, _camera) = flow(OpenBehavior::Grant);
        assert_eq!(flow.snapshot(), FlowSnapshot::default());

        flow.start(CaptureProvider::truck_inspection()).unwrap();
        shoot_point(&mut flow, "front");

        let snapshot = flow.snapshot();
        assert_eq!(snapshot.state, FlowState::ReviewingPhotos);
        assert_eq!(snapshot.progress, (1, 6));
        assert!(!snapshot.complete);
        assert!(snapshot.targets[0].preview_url.is_some());
        assert!(snapshot.targets[1].preview_url.is_none());
    }

    #[test]
    fn test_shared_flow_busy_while_locked() {
        let (flow, _camera) = flow(OpenBehavior::Grant);
        let shared = SharedFlow::new(flow);

        let guard = shared.try_lock().unwrap();
        assert!(matches!(shared.try_lock(), Err(CaptureError::Busy)));
        drop(guard);
        assert!(shared.try_lock().is_ok());
    }

    #[test]
    fn test_shared_cancel_during_open_discards_stream() {
        let (flow, camera) = flow(OpenBehavior::Grant);
        let shared = SharedFlow::new(flow);
        shared.try_lock().unwrap().start(CaptureProvider::truck_inspection()).unwrap();

        // デバイス応答待ちの間にキャンセルされた状況を再現する
        let canceller = shared.clone();
        *camera.on_request.borrow_mut() = Some(Box::new(move || canceller.cancel()));

        let result = block_on(async {
            let mut guard = shared.try_lock()?;
            guard.open_camera(ShotTarget::Point("front".into())).await
        });

        assert_eq!(result, Err(CaptureError::Cancelled));
        let guard = shared.try_lock().unwrap();
        assert_eq!(guard.state(), FlowState::Idle);
        assert!(guard.capture_set().is_none());
        assert_eq!(camera.live_streams(), 0);
    }

    #[test]
    fn test_shared_cancel_during_capture_commits_nothing() {
        let (flow, camera) = flow(OpenBehavior::Grant);
        let shared = SharedFlow::new(flow);
        {
            let mut guard = shared.try_lock().unwrap();
            guard.start(CaptureProvider::truck_inspection()).unwrap();
            block_on(guard.open_camera(ShotTarget::Point("front".into()))).unwrap();
        }

        // フレーム描画中にキャンセルされた状況を再現する
        let canceller = shared.clone();
        *camera.on_draw.borrow_mut() = Some(Box::new(move || canceller.cancel()));

        let result = block_on(async {
            let mut guard = shared.try_lock()?;
            guard.capture().await
        });

        assert_eq!(result, Err(CaptureError::Cancelled));
        assert_eq!(camera.frames.get(), 1);
        let guard = shared.try_lock().unwrap();
        assert_eq!(guard.state(), FlowState::Idle);
        assert!(guard.capture_set().is_none());
        assert_eq!(camera.live_streams(), 0);
    }

    #[test]
    fn test_shared_restart_during_open_starts_new_checklist() {
        let (flow, camera) = flow(OpenBehavior::Grant);
        let shared = SharedFlow::new(flow);
        shared.try_lock().unwrap().start(CaptureProvider::truck_inspection()).unwrap();

        // 起動待ちの間に「最初から」が押された
        let restarter = shared.clone();
        let restarted = Rc::new(RefCell::new(None));
        let restarted_in_hook = Rc::clone(&restarted);
        *camera.on_request.borrow_mut() = Some(Box::new(move || {
            let result = restarter.restart(CaptureProvider::truck_inspection());
            *restarted_in_hook.borrow_mut() = Some(result);
        }));

        let result = block_on(async {
            let mut guard = shared.try_lock()?;
            guard.open_camera(ShotTarget::Point("front".into())).await
        });

        assert_eq!(*restarted.borrow(), Some(Ok(())));
        assert_eq!(result, Err(CaptureError::Cancelled));
        let guard = shared.try_lock().unwrap();
        assert_eq!(guard.state(), FlowState::SelectingTarget);
        assert_eq!(guard.capture_set().unwrap().progress(), (0, 6));
        assert!(!guard.is_camera_active());
        assert_eq!(camera.live_streams(), 0);
    }

    #[test]
    fn test_shared_restart_when_free_is_immediate() {
        let (flow, camera) = flow(OpenBehavior::Grant);
        let shared = SharedFlow::new(flow);
        {
            let mut guard = shared.try_lock().unwrap();
            guard.start(CaptureProvider::truck_inspection()).unwrap();
            block_on(guard.open_camera(ShotTarget::Point("front".into()))).unwrap();
            block_on(guard.capture()).unwrap();
        }

        shared.restart(CaptureProvider::truck_inspection()).unwrap();

        let guard = shared.try_lock().unwrap();
        assert_eq!(guard.state(), FlowState::SelectingTarget);
        assert_eq!(guard.capture_set().unwrap().progress(), (0, 6));
        assert_eq!(camera.live_streams(), 0);
    }

    #[test]
    fn test_cancel_clears_pending_restart() {
        let (mut flow, _camera) = flow(OpenBehavior::Grant);
        flow.abort_signal().request_restart(CaptureProvider::truck_inspection());
        flow.cancel();

        flow.start(CaptureProvider::document(DocumentType::Other)).unwrap();
        block_on(flow.open_camera(ShotTarget::NewPage)).unwrap();
        assert_eq!(flow.state(), FlowState::CameraActive);
    }

    #[test]
    fn test_shared_cancel_when_idle_is_immediate() {
        let (flow, camera) = flow(OpenBehavior::Grant);
        let shared = SharedFlow::new(flow);
        {
            let mut guard = shared.try_lock().unwrap();
            guard.start(CaptureProvider::document(DocumentType::Manifest)).unwrap();
            block_on(guard.open_camera(ShotTarget::NewPage)).unwrap();
        }

        shared.cancel();

        let guard = shared.try_lock().unwrap();
        assert_eq!(guard.state(), FlowState::Idle);
        assert_eq!(camera.live_streams(), 0);
    }
}
