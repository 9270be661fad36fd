//! Per-call playback options.

use sfx_types::{Route, Vec3};

use crate::clip::ClipId;

/// Node a voice is attached to. Positions are relative to the anchor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnchorId(pub u64);

impl AnchorId {
    /// The manager's own anchor; idle pooled voices always sit here.
    pub const ROOT: AnchorId = AnchorId(0);
}

impl Default for AnchorId {
    fn default() -> Self {
        Self::ROOT
    }
}

/// 3D placement for a voice.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpatialParams {
    /// Position relative to the anchor.
    pub position: Vec3,
    /// 0 = fully 2D, 1 = fully 3D.
    pub spatial_blend: f32,
}

impl Default for SpatialParams {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            spatial_blend: 1.0,
        }
    }
}

impl SpatialParams {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn with_blend(mut self, spatial_blend: f32) -> Self {
        self.spatial_blend = spatial_blend;
        self
    }

    /// Clamp the blend into `[0, 1]`; non-finite blend becomes 1 and a
    /// non-finite position becomes the origin.
    pub fn sanitized(self) -> Self {
        let spatial_blend = if self.spatial_blend.is_finite() {
            self.spatial_blend.clamp(0.0, 1.0)
        } else {
            1.0
        };
        let position = if self.position.is_finite() {
            self.position
        } else {
            Vec3::ZERO
        };
        Self {
            position,
            spatial_blend,
        }
    }
}

/// Everything the manager needs to start one playback.
///
/// Build with [`PlaybackRequest::new`] and the chained setters, or with struct
/// update syntax over `Default`. A request without a clip is rejected by
/// `play` as invalid.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaybackRequest {
    pub clip: Option<ClipId>,
    pub route: Route,
    /// Attach point; `None` means the manager's root anchor.
    pub anchor: Option<AnchorId>,
    pub looping: bool,
    /// Linear volume in `[0, 1]`.
    pub volume: f32,
    /// Prefer a pooled voice (only honoured when pooling is enabled).
    pub pooled: bool,
    /// `None` plays the clip in 2D.
    pub spatial: Option<SpatialParams>,
}

impl Default for PlaybackRequest {
    fn default() -> Self {
        Self {
            clip: None,
            route: Route::Direct,
            anchor: None,
            looping: false,
            volume: 1.0,
            pooled: true,
            spatial: None,
        }
    }
}

impl PlaybackRequest {
    pub fn new(clip: impl Into<ClipId>) -> Self {
        Self {
            clip: Some(clip.into()),
            ..Self::default()
        }
    }

    pub fn route(mut self, route: Route) -> Self {
        self.route = route;
        self
    }

    pub fn anchor(mut self, anchor: AnchorId) -> Self {
        self.anchor = Some(anchor);
        self
    }

    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    pub fn pooled(mut self, pooled: bool) -> Self {
        self.pooled = pooled;
        self
    }

    pub fn spatial(mut self, spatial: SpatialParams) -> Self {
        self.spatial = Some(spatial);
        self
    }

    /// Volume clamped into `[0, 1]`, with non-finite input treated as full volume.
    pub fn effective_volume(&self) -> f32 {
        if self.volume.is_finite() {
            self.volume.clamp(0.0, 1.0)
        } else {
            1.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_one_shot_pooled_2d() {
        let req = PlaybackRequest::default();
        assert!(req.clip.is_none());
        assert_eq!(req.route, Route::Direct);
        assert!(req.anchor.is_none());
        assert!(!req.looping);
        assert_eq!(req.volume, 1.0);
        assert!(req.pooled);
        assert!(req.spatial.is_none());
    }

    #[test]
    fn builder_sets_fields() {
        let req = PlaybackRequest::new("step")
            .route(Route::Sfx)
            .anchor(AnchorId(7))
            .looping(true)
            .volume(0.25)
            .pooled(false)
            .spatial(SpatialParams::at(Vec3::new(1.0, 2.0, 3.0)).with_blend(0.5));
        assert_eq!(req.clip, Some(ClipId::from("step")));
        assert_eq!(req.route, Route::Sfx);
        assert_eq!(req.anchor, Some(AnchorId(7)));
        assert!(req.looping);
        assert!(!req.pooled);
        assert_eq!(req.spatial.unwrap().spatial_blend, 0.5);
    }

    #[test]
    fn effective_volume_clamps_and_defaults() {
        assert_eq!(PlaybackRequest::new("a").volume(1.5).effective_volume(), 1.0);
        assert_eq!(PlaybackRequest::new("a").volume(-0.5).effective_volume(), 0.0);
        assert_eq!(PlaybackRequest::new("a").volume(f32::NAN).effective_volume(), 1.0);
        assert_eq!(PlaybackRequest::new("a").volume(0.3).effective_volume(), 0.3);
    }

    #[test]
    fn spatial_sanitized_is_best_effort() {
        let s = SpatialParams::at(Vec3::new(f32::INFINITY, 0.0, 0.0))
            .with_blend(2.0)
            .sanitized();
        assert_eq!(s.position, Vec3::ZERO);
        assert_eq!(s.spatial_blend, 1.0);

        let s = SpatialParams::at(Vec3::new(1.0, 1.0, 1.0))
            .with_blend(f32::NAN)
            .sanitized();
        assert_eq!(s.position, Vec3::new(1.0, 1.0, 1.0));
        assert_eq!(s.spatial_blend, 1.0);

        assert_eq!(SpatialParams::default().with_blend(-1.0).sanitized().spatial_blend, 0.0);
    }
}
