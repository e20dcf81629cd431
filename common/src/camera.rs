//! カメラセッション
//!
//! デバイスのストリームを取得・解放し、現在のフレームを画像にエンコードする。
//!
//! ```text
//! CaptureFlowController
//!        │ open / capture_frame / close
//!        ▼
//!   CameraSession  ← タイムアウト・解放の保証
//!        │
//!        ▼
//!   CameraDevice   ← ブラウザ(getUserMedia) / フォルダ再生
//! ```

use crate::error::{CaptureError, CaptureResult};
use crate::image::EncodedImage;
use crate::settings::{clamp_quality, StreamConstraints};
use futures::future::{self, Either};
use std::future::Future;
use std::time::Duration;

/// カメラデバイス
///
/// シングルスレッド前提のため `Send` は要求しない。
#[allow(async_fn_in_trait)]
pub trait CameraDevice {
    /// 取得したストリームのハンドル
    type Stream;

    /// ストリームを要求する
    ///
    /// 拒否されたら `PermissionDenied`、該当カメラがなければ `DeviceUnavailable`。
    async fn request_stream(&self, constraints: &StreamConstraints) -> CaptureResult<Self::Stream>;

    /// プレビュー面にストリームを接続する
    fn attach_preview(&self, _stream: &Self::Stream) -> CaptureResult<()> {
        Ok(())
    }

    /// 現在のフレームをネイティブ解像度で描画してエンコードする
    async fn draw_frame(&self, stream: &Self::Stream, quality: f32) -> CaptureResult<EncodedImage>;

    /// 全トラックを停止する（失敗してもセッションは閉じた扱い）
    fn stop_stream(&self, stream: Self::Stream) -> CaptureResult<()>;
}

/// 取得タイムアウト用のタイマー
pub trait Timer {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()>;
}

pub struct CameraSession<D: CameraDevice, T: Timer> {
    device: D,
    timer: T,
    stream: Option<D::Stream>,
    timeout: Duration,
}

impl<D: CameraDevice, T: Timer> CameraSession<D, T> {
    pub fn new(device: D, timer: T, timeout: Duration) -> Self {
        Self {
            device,
            timer,
            stream: None,
            timeout,
        }
    }

    pub fn is_active(&self) -> bool {
        self.stream.is_some()
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// カメラを起動（起動済みなら何もしない）
    pub async fn open(&mut self, constraints: &StreamConstraints) -> CaptureResult<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let request = self.device.request_stream(constraints);
        let deadline = self.timer.sleep(self.timeout);
        futures::pin_mut!(request, deadline);

        let stream = match future::select(request, deadline).await {
            Either::Left((result, _)) => result?,
            Either::Right(((), _)) => {
                tracing::warn!(timeout_ms = self.timeout.as_millis() as u64, "カメラ取得がタイムアウト");
                return Err(CaptureError::DeviceUnavailable(format!(
                    "{}ms以内にカメラを取得できませんでした",
                    self.timeout.as_millis()
                )));
            }
        };

        if let Err(e) = self.device.attach_preview(&stream) {
            if let Err(stop_err) = self.device.stop_stream(stream) {
                tracing::warn!(error = %stop_err, "プレビュー接続失敗後のストリーム停止に失敗");
            }
            return Err(e);
        }

        tracing::debug!(facing = constraints.facing.as_str(), "カメラ起動");
        self.stream = Some(stream);
        Ok(())
    }

    /// 現在のフレームを撮影
    pub async fn capture_frame(&self, quality: f32) -> CaptureResult<EncodedImage> {
        let stream = self.stream.as_ref().ok_or(CaptureError::NotActive)?;
        self.device.draw_frame(stream, clamp_quality(quality)).await
    }

    /// カメラを停止（何度呼んでもよい）
    pub fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = self.device.stop_stream(stream) {
                tracing::warn!(error = %e, "カメラ停止に失敗（停止済みとして扱う）");
            }
            tracing::debug!("カメラ停止");
        }
    }
}

impl<D: CameraDevice, T: Timer> Drop for CameraSession<D, T> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! テスト用のスクリプト化デバイス

    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[derive(Debug, Clone, Copy, PartialEq)]
    pub enum OpenBehavior {
        Grant,
        Deny,
        NoDevice,
        /// 応答しない（タイムアウト確認用）
        Hang,
    }

    /// 呼び出し回数を外から確認できるモック
    #[derive(Clone)]
    pub struct MockCamera {
        pub behavior: Rc<Cell<OpenBehavior>>,
        pub opened: Rc<Cell<usize>>,
        pub stopped: Rc<Cell<usize>>,
        pub frames: Rc<Cell<u8>>,
        pub last_quality: Rc<Cell<f32>>,
        pub fail_stop: Rc<Cell<bool>>,
        /// request_stream中に呼ばれるフック（中断の再現用）
        pub on_request: Rc<RefCell<Option<Box<dyn Fn()>>>>,
        /// draw_frame中に呼ばれるフック
        pub on_draw: Rc<RefCell<Option<Box<dyn Fn()>>>>,
    }

    impl MockCamera {
        pub fn new(behavior: OpenBehavior) -> Self {
            Self {
                behavior: Rc::new(Cell::new(behavior)),
                opened: Rc::new(Cell::new(0)),
                stopped: Rc::new(Cell::new(0)),
                frames: Rc::new(Cell::new(0)),
                last_quality: Rc::new(Cell::new(-1.0)),
                fail_stop: Rc::new(Cell::new(false)),
                on_request: Rc::new(RefCell::new(None)),
                on_draw: Rc::new(RefCell::new(None)),
            }
        }

        pub fn live_streams(&self) -> usize {
            self.opened.get() - self.stopped.get()
        }
    }

    pub struct MockStream;

    impl CameraDevice for MockCamera {
        type Stream = MockStream;

        async fn request_stream(&self, _constraints: &StreamConstraints) -> CaptureResult<MockStream> {
            if let Some(hook) = self.on_request.borrow().as_ref() {
                hook();
            }
            match self.behavior.get() {
                OpenBehavior::Grant => {
                    self.opened.set(self.opened.get() + 1);
                    Ok(MockStream)
                }
                OpenBehavior::Deny => Err(CaptureError::PermissionDenied("NotAllowedError".into())),
                OpenBehavior::NoDevice => Err(CaptureError::DeviceUnavailable("NotFoundError".into())),
                OpenBehavior::Hang => future::pending().await,
            }
        }

        async fn draw_frame(&self, _stream: &MockStream, quality: f32) -> CaptureResult<EncodedImage> {
            if let Some(hook) = self.on_draw.borrow().as_ref() {
                hook();
            }
            let n = self.frames.get() + 1;
            self.frames.set(n);
            self.last_quality.set(quality);
            Ok(EncodedImage::jpeg(1920, 1080, vec![n; 8]))
        }

        fn stop_stream(&self, _stream: MockStream) -> CaptureResult<()> {
            self.stopped.set(self.stopped.get() + 1);
            if self.fail_stop.get() {
                Err(CaptureError::DeviceUnavailable("track already ended".into()))
            } else {
                Ok(())
            }
        }
    }

    /// 即座に完了するタイマー（Hang時はタイムアウト扱いになる）
    pub struct ImmediateTimer;

    impl Timer for ImmediateTimer {
        async fn sleep(&self, _duration: Duration) {}
    }

    /// 決して完了しないタイマー
    pub struct NeverTimer;

    impl Timer for NeverTimer {
        fn sleep(&self, _duration: Duration) -> impl Future<Output = ()> {
            future::pending()
        }
    }
}
