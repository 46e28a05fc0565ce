// src/lib.rs

pub mod app;
pub mod assets;
pub mod config;
pub mod engine_lib;
pub mod rendering_lib;
pub mod scenes;
pub mod ui;
