//! Truck Capture Common Library
//!
//! CLIとWeb(WASM)で共有される撮影コア

pub mod camera;
pub mod capture_set;
pub mod error;
pub mod flow;
pub mod image;
pub mod processing;
pub mod repository;
pub mod settings;
pub mod types;
pub mod upload;

pub use camera::{CameraDevice, CameraSession, Timer};
pub use capture_set::CapturePointSet;
pub use error::{CaptureError, CaptureResult, Error, Result};
pub use flow::{
    CaptureFlowController, CaptureOutcome, CaptureProvider, CaptureSink, FlowSnapshot, FlowState,
    SharedFlow, ShotTarget, TargetView,
};
pub use image::EncodedImage;
pub use processing::{PostProcessor, ProcessingQueue, TaskStatus};
pub use repository::CaptureRepository;
pub use settings::{CaptureSettings, Facing, Resolution, StreamConstraints};
pub use types::{
    truck_checklist, CaptureTarget, CapturedDocument, DocumentType, InspectionReport, TargetSpec,
};
pub use upload::{
    format_size, UploadDestination, UploadItem, UploadQueue, UploadSettings, UploadStatus,
};
