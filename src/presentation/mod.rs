//! Server-rendered view layer.

pub mod views;
