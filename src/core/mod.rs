//! Core engine module - binds configuration to the inference pipeline

mod engine;

pub use engine::Engine;
