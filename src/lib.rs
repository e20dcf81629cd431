//! トラック点検・書類撮影ツール（端末版）

pub mod camera;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod scanner;
pub mod session;
