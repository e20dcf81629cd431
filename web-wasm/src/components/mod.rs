//! UIコンポーネント

pub mod bottom_nav;
pub mod camera_view;
pub mod documents;
pub mod inspection;
pub mod progress_bar;
pub mod settings_panel;
pub mod upload_manager;
