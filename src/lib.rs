#![allow(clippy::uninlined_format_args)]

pub mod actions;
pub mod app;
pub mod config;
pub mod controller;
pub mod data;
pub mod favorites;
pub mod feed;
pub mod giphy;
pub mod layout;
pub mod logging;
pub mod scroll;
pub mod storage;
pub mod ui;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::{run, run_with, RunOptions};
