//! Channel volume settings for the output routes.
//!
//! Levels are linear in `[0, 1]`; the sink side works in decibels, with a
//! disabled channel pinned to [`MUTED_DB`].

use std::str::FromStr;

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use sfx_types::Route;

use crate::prefs::{PrefKey, PrefsStore};

/// Attenuation used for a disabled channel.
pub const MUTED_DB: f32 = -80.0;

const MIN_LINEAR: f32 = 0.0001;

/// Convert a linear level to decibels. Levels at or below 0.0001 map to -80 dB.
pub fn linear_to_db(level: f32) -> f32 {
    20.0 * level.max(MIN_LINEAR).log10()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Master,
    Music,
    Sfx,
    Ui,
}

impl Channel {
    pub const ALL: [Channel; 4] = [Channel::Master, Channel::Music, Channel::Sfx, Channel::Ui];

    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Master => "master",
            Channel::Music => "music",
            Channel::Sfx => "sfx",
            Channel::Ui => "ui",
        }
    }

    /// Channel group a route feeds, if any. `Direct` goes straight to master.
    pub fn for_route(route: Route) -> Option<Channel> {
        match route {
            Route::Direct => None,
            Route::Music => Some(Channel::Music),
            Route::Sfx => Some(Channel::Sfx),
            Route::Ui => Some(Channel::Ui),
        }
    }

    fn volume_key(self) -> PrefKey<f32> {
        let name = match self {
            Channel::Master => "mixer.master.volume",
            Channel::Music => "mixer.music.volume",
            Channel::Sfx => "mixer.sfx.volume",
            Channel::Ui => "mixer.ui.volume",
        };
        PrefKey::new(name, 1.0)
    }

    fn enabled_key(self) -> PrefKey<bool> {
        let name = match self {
            Channel::Master => "mixer.master.enabled",
            Channel::Music => "mixer.music.enabled",
            Channel::Sfx => "mixer.sfx.enabled",
            Channel::Ui => "mixer.ui.enabled",
        };
        PrefKey::new(name, true)
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Channel::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| anyhow!("unknown channel {s:?} (expected master, music, sfx or ui)"))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChannelLevel {
    pub volume: f32,
    pub enabled: bool,
}

impl Default for ChannelLevel {
    fn default() -> Self {
        Self {
            volume: 1.0,
            enabled: true,
        }
    }
}

impl ChannelLevel {
    /// Linear gain: zero when disabled.
    pub fn gain(&self) -> f32 {
        if self.enabled {
            self.volume
        } else {
            0.0
        }
    }

    pub fn attenuation_db(&self) -> f32 {
        if self.enabled {
            linear_to_db(self.volume)
        } else {
            MUTED_DB
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MixerSettings {
    pub master: ChannelLevel,
    pub music: ChannelLevel,
    pub sfx: ChannelLevel,
    pub ui: ChannelLevel,
}

impl MixerSettings {
    pub fn level(&self, channel: Channel) -> &ChannelLevel {
        match channel {
            Channel::Master => &self.master,
            Channel::Music => &self.music,
            Channel::Sfx => &self.sfx,
            Channel::Ui => &self.ui,
        }
    }

    fn level_mut(&mut self, channel: Channel) -> &mut ChannelLevel {
        match channel {
            Channel::Master => &mut self.master,
            Channel::Music => &mut self.music,
            Channel::Sfx => &mut self.sfx,
            Channel::Ui => &mut self.ui,
        }
    }

    /// Set a channel's linear volume, clamped into `[0, 1]`.
    pub fn set_volume(&mut self, channel: Channel, volume: f32) {
        let volume = if volume.is_finite() {
            volume.clamp(0.0, 1.0)
        } else {
            1.0
        };
        self.level_mut(channel).volume = volume;
    }

    pub fn set_enabled(&mut self, channel: Channel, enabled: bool) {
        self.level_mut(channel).enabled = enabled;
    }

    pub fn attenuation_db(&self, channel: Channel) -> f32 {
        self.level(channel).attenuation_db()
    }

    /// Linear gain applied to a voice on `route`: master times its channel.
    pub fn effective_gain(&self, route: Route) -> f32 {
        let master = self.master.gain();
        match Channel::for_route(route) {
            Some(channel) => master * self.level(channel).gain(),
            None => master,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Read every channel from `prefs`, defaulting missing entries.
    pub fn load(prefs: &PrefsStore) -> Self {
        let mut settings = Self::default();
        for channel in Channel::ALL {
            let volume = prefs.get(&channel.volume_key());
            settings.set_volume(channel, volume);
            settings.set_enabled(channel, prefs.get(&channel.enabled_key()));
        }
        settings
    }

    /// Write every channel into `prefs`. The caller saves the store.
    pub fn store(&self, prefs: &mut PrefsStore) {
        for channel in Channel::ALL {
            let level = self.level(channel);
            prefs.set(&channel.volume_key(), level.volume);
            prefs.set(&channel.enabled_key(), level.enabled);
        }
    }

    /// Drop every mixer entry from `prefs`.
    pub fn forget(prefs: &mut PrefsStore) {
        for channel in Channel::ALL {
            prefs.delete(&channel.volume_key());
            prefs.delete(&channel.enabled_key());
        }
    }
}
