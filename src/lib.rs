//! Continuously-streaming audio player core for a community-radio device.
//!
//! The real-time playback engine (`playback`, `clip`, `decoder`, `dsp`,
//! `chunk`) and the program-generation logic that feeds it (`scheduler`,
//! `library`) are kept independent of any particular host audio API,
//! front-end, or transport — `main` is the only place those are wired
//! together.

pub mod chunk;
pub mod clip;
pub mod commands;
pub mod config;
pub mod control;
pub mod decoder;
pub mod dsp;
pub mod error;
pub mod events;
pub mod history;
pub mod library;
pub mod playback;
pub mod scheduler;
pub mod throttle;
