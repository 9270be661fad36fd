//! Output side of the manager.
//!
//! The manager never renders audio itself. It tells a [`PlaybackSink`] which
//! voice plays what, where, and through which route, and when to stop.

use sfx_types::{Route, Vec3};

use crate::clip::ClipId;
use crate::request::AnchorId;
use crate::voice::{VoiceKey, VoiceOrigin};

/// Everything a sink needs to start one voice.
#[derive(Clone, Debug, PartialEq)]
pub struct VoiceSettings {
    pub clip: ClipId,
    pub origin: VoiceOrigin,
    /// Linear volume in `[0, 1]`.
    pub volume: f32,
    pub route: Route,
    pub looping: bool,
    pub anchor: AnchorId,
    /// Position relative to `anchor`; the origin for 2D voices.
    pub position: Vec3,
    /// 0 for 2D voices.
    pub spatial_blend: f32,
}

/// Receives voice lifecycle calls from the manager.
///
/// Calls arrive while the manager's state lock is held: implementations must
/// not call back into the manager or into a stop handle.
pub trait PlaybackSink: Send {
    /// Begin playing `settings.clip` on `voice`.
    fn start(&mut self, voice: VoiceKey, settings: &VoiceSettings);

    /// Silence `voice` immediately.
    fn stop(&mut self, voice: VoiceKey);

    /// Release every resource held for `voice`; it will not be used again.
    fn dispose(&mut self, voice: VoiceKey) {
        let _ = voice;
    }
}

/// Sink that discards every call.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl PlaybackSink for NullSink {
    fn start(&mut self, _voice: VoiceKey, _settings: &VoiceSettings) {}

    fn stop(&mut self, _voice: VoiceKey) {}
}

impl<S: PlaybackSink + ?Sized> PlaybackSink for Box<S> {
    fn start(&mut self, voice: VoiceKey, settings: &VoiceSettings) {
        (**self).start(voice, settings)
    }

    fn stop(&mut self, voice: VoiceKey) {
        (**self).stop(voice)
    }

    fn dispose(&mut self, voice: VoiceKey) {
        (**self).dispose(voice)
    }
}
