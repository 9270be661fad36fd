use serde::{Deserialize, Serialize};

/// Output route a voice is mixed into.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// Straight to the master bus, no channel group.
    #[default]
    Direct,
    /// Background music group.
    Music,
    /// Sound-effects group.
    Sfx,
    /// Interface sounds group.
    Ui,
}

impl Route {
    /// Stable lowercase label used in logs and config files.
    pub fn as_str(self) -> &'static str {
        match self {
            Route::Direct => "direct",
            Route::Music => "music",
            Route::Sfx => "sfx",
            Route::Ui => "ui",
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// World-space position.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// `true` when every component is a finite number.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<[f32; 3]> for Vec3 {
    fn from(v: [f32; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

/// Why a voice was taken back by the manager.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReclaimReason {
    /// The clip ran for its full duration.
    Completed,
    /// The caller stopped it through its stop handle.
    Cancelled,
    /// A stop-all swept it.
    StoppedAll,
    /// Taken over by a newer request while the pool was exhausted.
    Stolen,
    /// The manager shut down.
    Shutdown,
}

/// Running counters kept by the playback manager.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlaybackCounters {
    /// Requests that started playing.
    pub started: u64,
    /// Requests refused because the clip was missing.
    pub invalid: u64,
    /// Pooled requests refused because no voice was free.
    pub exhausted: u64,
    /// Voices reclaimed after playing to the end.
    pub completed: u64,
    /// Voices reclaimed through a stop handle.
    pub cancelled: u64,
    /// Voices reclaimed by stop-all or shutdown.
    pub stopped: u64,
    /// Pooled voices taken over by a newer request.
    pub stolen: u64,
}

impl PlaybackCounters {
    /// Bump the counter matching a reclaim reason.
    pub fn record_reclaim(&mut self, reason: ReclaimReason) {
        match reason {
            ReclaimReason::Completed => self.completed += 1,
            ReclaimReason::Cancelled => self.cancelled += 1,
            ReclaimReason::StoppedAll | ReclaimReason::Shutdown => self.stopped += 1,
            ReclaimReason::Stolen => self.stolen += 1,
        }
    }
}

/// Snapshot of pool occupancy returned to hosts.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PoolStatus {
    /// Whether requests may use the pool at all.
    pub pooling_enabled: bool,
    /// Number of pooled voices allocated at startup.
    pub capacity: usize,
    /// Idle pooled voices ready for reuse.
    pub available: usize,
    /// Pooled voices currently playing.
    pub active_pooled: usize,
    /// Ad hoc voices currently playing.
    pub active_unpooled: usize,
    /// Manager clock in milliseconds.
    pub clock_ms: u64,
    /// Lifetime counters.
    pub counters: PlaybackCounters,
}

impl PoolStatus {
    /// Total voices currently playing.
    pub fn active(&self) -> usize {
        self.active_pooled + self.active_unpooled
    }
}
