//! Playback voices and their lifecycle state.

use std::time::Duration;

use sfx_types::{Route, Vec3};

use crate::clip::ClipId;
use crate::request::{AnchorId, PlaybackRequest};
use crate::sink::VoiceSettings;
use crate::timer::TimerId;

/// Stable identity of a voice slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceId(pub u32);

impl std::fmt::Display for VoiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// One playback of a voice.
///
/// The generation changes every time the voice is reclaimed, so a key taken for
/// an earlier playback never matches a later reuse of the same pooled voice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VoiceKey {
    pub id: VoiceId,
    pub generation: u32,
}

impl std::fmt::Display for VoiceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.id, self.generation)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoiceOrigin {
    /// Allocated once at startup and recycled.
    Pooled,
    /// Created for a single request and disposed afterwards.
    Unpooled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoiceState {
    Idle,
    Active,
    Disposed,
}

/// A playback handle owned by the manager.
#[derive(Debug)]
pub struct Voice {
    id: VoiceId,
    generation: u32,
    origin: VoiceOrigin,
    state: VoiceState,
    clip: Option<ClipId>,
    volume: f32,
    route: Route,
    anchor: AnchorId,
    looping: bool,
    position: Vec3,
    spatial_blend: f32,
    started_at: Duration,
    start_seq: u64,
    pub(crate) timer: Option<TimerId>,
}

impl Voice {
    pub(crate) fn new(id: VoiceId, origin: VoiceOrigin) -> Self {
        Self {
            id,
            generation: 0,
            origin,
            state: VoiceState::Idle,
            clip: None,
            volume: 1.0,
            route: Route::Direct,
            anchor: AnchorId::ROOT,
            looping: false,
            position: Vec3::ZERO,
            spatial_blend: 0.0,
            started_at: Duration::ZERO,
            start_seq: 0,
            timer: None,
        }
    }

    pub fn id(&self) -> VoiceId {
        self.id
    }

    pub fn key(&self) -> VoiceKey {
        VoiceKey {
            id: self.id,
            generation: self.generation,
        }
    }

    pub fn origin(&self) -> VoiceOrigin {
        self.origin
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == VoiceState::Active
    }

    pub fn clip(&self) -> Option<&ClipId> {
        self.clip.as_ref()
    }

    pub fn anchor(&self) -> AnchorId {
        self.anchor
    }

    pub fn route(&self) -> Route {
        self.route
    }

    pub fn looping(&self) -> bool {
        self.looping
    }

    /// Manager clock value when the current playback started.
    pub fn started_at(&self) -> Duration {
        self.started_at
    }

    /// Monotonic start order, used to find the oldest playing voice.
    pub(crate) fn start_seq(&self) -> u64 {
        self.start_seq
    }

    /// Bind a request to this voice and mark it active.
    pub(crate) fn configure(
        &mut self,
        request: &PlaybackRequest,
        clip: ClipId,
        now: Duration,
        start_seq: u64,
    ) {
        self.clip = Some(clip);
        self.volume = request.effective_volume();
        self.route = request.route;
        self.anchor = request.anchor.unwrap_or(AnchorId::ROOT);
        self.looping = request.looping;
        match request.spatial.map(|s| s.sanitized()) {
            Some(spatial) => {
                self.position = spatial.position;
                self.spatial_blend = spatial.spatial_blend;
            }
            None => {
                self.position = Vec3::ZERO;
                self.spatial_blend = 0.0;
            }
        }
        self.started_at = now;
        self.start_seq = start_seq;
        self.timer = None;
        self.state = VoiceState::Active;
    }

    /// Return to idle under the root anchor and retire the current key.
    pub(crate) fn deactivate(&mut self) {
        self.state = VoiceState::Idle;
        self.clip = None;
        self.anchor = AnchorId::ROOT;
        self.looping = false;
        self.position = Vec3::ZERO;
        self.spatial_blend = 0.0;
        self.timer = None;
        self.generation = self.generation.wrapping_add(1);
    }

    pub(crate) fn dispose(&mut self) {
        self.deactivate();
        self.state = VoiceState::Disposed;
    }

    /// Snapshot handed to the sink when playback starts.
    pub fn settings(&self) -> Option<VoiceSettings> {
        let clip = self.clip.clone()?;
        Some(VoiceSettings {
            clip,
            origin: self.origin,
            volume: self.volume,
            route: self.route,
            looping: self.looping,
            anchor: self.anchor,
            position: self.position,
            spatial_blend: self.spatial_blend,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::SpatialParams;

    #[test]
    fn configure_applies_request_and_defaults_to_2d() {
        let mut voice = Voice::new(VoiceId(3), VoiceOrigin::Pooled);
        let req = PlaybackRequest::new("door").volume(0.5).route(Route::Sfx);
        voice.configure(&req, "door".into(), Duration::from_millis(40), 9);

        assert!(voice.is_active());
        assert_eq!(voice.anchor(), AnchorId::ROOT);
        let settings = voice.settings().unwrap();
        assert_eq!(&*settings.clip, "door");
        assert_eq!(settings.volume, 0.5);
        assert_eq!(settings.route, Route::Sfx);
        assert_eq!(settings.spatial_blend, 0.0);
        assert_eq!(settings.position, Vec3::ZERO);
        assert_eq!(voice.started_at(), Duration::from_millis(40));
        assert_eq!(voice.start_seq(), 9);
    }

    #[test]
    fn configure_applies_spatial_and_anchor() {
        let mut voice = Voice::new(VoiceId(0), VoiceOrigin::Unpooled);
        let req = PlaybackRequest::new("hum")
            .anchor(AnchorId(42))
            .spatial(SpatialParams::at(Vec3::new(1.0, 0.0, 2.0)).with_blend(0.75));
        voice.configure(&req, "hum".into(), Duration::ZERO, 1);

        let settings = voice.settings().unwrap();
        assert_eq!(settings.anchor, AnchorId(42));
        assert_eq!(settings.position, Vec3::new(1.0, 0.0, 2.0));
        assert_eq!(settings.spatial_blend, 0.75);
    }

    #[test]
    fn deactivate_reanchors_and_bumps_generation() {
        let mut voice = Voice::new(VoiceId(1), VoiceOrigin::Pooled);
        let before = voice.key();
        voice.configure(
            &PlaybackRequest::new("a").anchor(AnchorId(5)),
            "a".into(),
            Duration::ZERO,
            1,
        );
        voice.deactivate();

        assert_eq!(voice.state(), VoiceState::Idle);
        assert_eq!(voice.anchor(), AnchorId::ROOT);
        assert!(voice.clip().is_none());
        assert!(voice.settings().is_none());
        assert_ne!(voice.key(), before);
        assert_eq!(voice.key().id, before.id);
    }

    #[test]
    fn dispose_is_terminal_state() {
        let mut voice = Voice::new(VoiceId(8), VoiceOrigin::Unpooled);
        voice.configure(&PlaybackRequest::new("a"), "a".into(), Duration::ZERO, 1);
        voice.dispose();
        assert_eq!(voice.state(), VoiceState::Disposed);
        assert!(!voice.is_active());
    }
}
