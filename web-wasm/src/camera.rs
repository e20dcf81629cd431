//! ブラウザのカメラ（getUserMedia + video + canvas）

use js_sys::Promise;
use serde::Serialize;
use truck_capture_common::{
    CameraDevice, CaptureError, CaptureResult, CapturedDocument, EncodedImage, PostProcessor,
    StreamConstraints, Timer,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    CanvasRenderingContext2d, DomException, HtmlCanvasElement, HtmlVideoElement, MediaStream,
    MediaStreamConstraints, MediaStreamTrack,
};

/// 後処理（PDF変換）の擬似処理時間
const CONVERT_DELAY_MS: u32 = 2000;

/// getUserMedia に渡す video 制約
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoConstraints {
    facing_mode: &'static str,
    width: Ideal,
    height: Ideal,
}

#[derive(Debug, Serialize)]
struct Ideal {
    ideal: u32,
}

impl From<&StreamConstraints> for VideoConstraints {
    fn from(c: &StreamConstraints) -> Self {
        Self {
            facing_mode: c.facing.as_str(),
            width: Ideal { ideal: c.ideal.width },
            height: Ideal { ideal: c.ideal.height },
        }
    }
}

/// DOMException の名前を撮影エラーに変換
pub fn classify_media_error(name: &str, message: &str) -> CaptureError {
    let detail = format!("{}: {}", name, message);
    match name {
        "NotAllowedError" | "SecurityError" | "PermissionDeniedError" => {
            CaptureError::PermissionDenied(detail)
        }
        _ => CaptureError::DeviceUnavailable(detail),
    }
}

fn media_error(value: JsValue) -> CaptureError {
    match value.dyn_ref::<DomException>() {
        Some(e) => classify_media_error(&e.name(), &e.message()),
        None => CaptureError::DeviceUnavailable(format!("{:?}", value)),
    }
}

fn element<T: JsCast>(id: &str) -> CaptureResult<T> {
    web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.get_element_by_id(id))
        .and_then(|e| e.dyn_into::<T>().ok())
        .ok_or_else(|| CaptureError::DeviceUnavailable(format!("要素が見つかりません: #{}", id)))
}

fn stop_tracks(stream: &MediaStream) {
    let tracks: js_sys::Array = stream.get_tracks();
    for track in tracks.iter() {
        if let Ok(track) = track.dyn_into::<MediaStreamTrack>() {
            track.stop();
        }
    }
}

/// 応答待ちの getUserMedia
///
/// 結果を受け取る前に捨てられた場合（タイムアウトや画面の破棄）は、
/// 後から届いたストリームをその場で停止する。
struct PendingRequest {
    promise: Option<Promise>,
}

impl PendingRequest {
    fn new(promise: Promise) -> Self {
        Self {
            promise: Some(promise),
        }
    }

    fn settled(mut self) {
        self.promise = None;
    }
}

impl Drop for PendingRequest {
    fn drop(&mut self) {
        let Some(promise) = self.promise.take() else {
            return;
        };
        gloo::console::debug!("応答前に破棄されたカメラ要求を停止予約");
        let stop = Closure::once(|value: JsValue| {
            if let Ok(stream) = value.dyn_into::<MediaStream>() {
                stop_tracks(&stream);
            }
        });
        // 拒否された場合はストリームがないので何もしない
        let _ = promise.then(&stop);
        stop.forget();
    }
}

/// プレビューと撮影用 canvas の要素IDを持つカメラ
#[derive(Debug, Clone, Copy)]
pub struct BrowserCamera {
    video_id: &'static str,
    canvas_id: &'static str,
}

impl BrowserCamera {
    pub fn new(video_id: &'static str, canvas_id: &'static str) -> Self {
        Self { video_id, canvas_id }
    }

    pub fn video_id(&self) -> &'static str {
        self.video_id
    }

    pub fn canvas_id(&self) -> &'static str {
        self.canvas_id
    }
}

impl CameraDevice for BrowserCamera {
    type Stream = MediaStream;

    async fn request_stream(&self, constraints: &StreamConstraints) -> CaptureResult<MediaStream> {
        let window = web_sys::window()
            .ok_or_else(|| CaptureError::DeviceUnavailable("window がありません".into()))?;
        // 非セキュアな環境では mediaDevices 自体がない
        let media_devices = window.navigator().media_devices().map_err(media_error)?;

        let video = serde_wasm_bindgen::to_value(&VideoConstraints::from(constraints))
            .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?;
        let request = MediaStreamConstraints::new();
        request.set_video(&video);
        request.set_audio(&JsValue::FALSE);

        let promise = media_devices
            .get_user_media_with_constraints(&request)
            .map_err(media_error)?;
        let pending = PendingRequest::new(promise.clone());
        let stream = JsFuture::from(promise).await;
        pending.settled();
        let stream = stream.map_err(media_error)?;

        stream
            .dyn_into::<MediaStream>()
            .map_err(|_| CaptureError::DeviceUnavailable("MediaStream を取得できません".into()))
    }

    fn attach_preview(&self, stream: &MediaStream) -> CaptureResult<()> {
        let video = element::<HtmlVideoElement>(self.video_id)?;
        video.set_muted(true);
        video.set_src_object(Some(stream));
        // 再生開始の完了は待たない
        let _ = video.play();
        Ok(())
    }

    async fn draw_frame(&self, _stream: &MediaStream, quality: f32) -> CaptureResult<EncodedImage> {
        let video = element::<HtmlVideoElement>(self.video_id)?;
        let canvas = element::<HtmlCanvasElement>(self.canvas_id)?;

        let (width, height) = (video.video_width(), video.video_height());
        if width == 0 || height == 0 {
            return Err(CaptureError::DeviceUnavailable("映像の準備ができていません".into()));
        }
        canvas.set_width(width);
        canvas.set_height(height);

        let context = canvas
            .get_context("2d")
            .map_err(media_error)?
            .and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok())
            .ok_or_else(|| CaptureError::DeviceUnavailable("canvas を利用できません".into()))?;
        context
            .draw_image_with_html_video_element(&video, 0.0, 0.0)
            .map_err(media_error)?;

        let data_url = canvas
            .to_data_url_with_type_and_encoder_options("image/jpeg", &JsValue::from_f64(quality as f64))
            .map_err(media_error)?;

        EncodedImage::from_data_url(&data_url, width, height)
            .ok_or_else(|| CaptureError::DeviceUnavailable("画像の変換に失敗しました".into()))
    }

    fn stop_stream(&self, stream: MediaStream) -> CaptureResult<()> {
        stop_tracks(&stream);
        // タブ切り替え後は要素がないこともある
        if let Ok(video) = element::<HtmlVideoElement>(self.video_id) {
            video.set_src_object(None);
        }
        Ok(())
    }
}

/// gloo のタイマー
#[derive(Debug, Clone, Copy)]
pub struct BrowserTimer;

impl Timer for BrowserTimer {
    async fn sleep(&self, duration: std::time::Duration) {
        let ms = u32::try_from(duration.as_millis()).unwrap_or(u32::MAX);
        gloo::timers::future::TimeoutFuture::new(ms).await;
    }
}

/// PDF変換の代わりに一定時間待って成功する
#[derive(Debug, Clone, Copy)]
pub struct SimulatedConverter;

impl PostProcessor for SimulatedConverter {
    async fn process(&self, document: &CapturedDocument) -> Result<(), String> {
        if document.pages.is_empty() {
            return Err("ページがありません".to_string());
        }
        gloo::timers::future::TimeoutFuture::new(CONVERT_DELAY_MS).await;
        Ok(())
    }
}
