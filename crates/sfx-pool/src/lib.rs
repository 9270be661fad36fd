//! Pooled sound-effect playback.
//!
//! [`manager::PlaybackManager`] hands out voices from a fixed pool (or creates
//! ad hoc ones), drives an abstract [`sink::PlaybackSink`], and reclaims voices
//! when their clip ends, when a [`manager::StopHandle`] fires, or on stop-all.
//! Time only advances through [`manager::PlaybackManager::tick`].

pub mod clip;
pub mod config;
pub mod error;
pub mod manager;
pub mod mixer;
pub mod pool;
pub mod prefs;
pub mod request;
pub mod sink;
pub mod timer;
pub mod voice;

pub use sfx_types::{PoolStatus, ReclaimReason, Route, Vec3};
