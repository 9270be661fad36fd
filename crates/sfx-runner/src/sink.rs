//! Sink that reports voice lifecycle through `tracing` instead of playing audio.

use std::collections::HashMap;

use sfx_pool::clip::ClipId;
use sfx_pool::mixer::{MUTED_DB, MixerSettings, linear_to_db};
use sfx_pool::sink::{PlaybackSink, VoiceSettings};
use sfx_pool::voice::VoiceKey;

#[derive(Debug, Default)]
pub struct TracingSink {
    mixer: MixerSettings,
    playing: HashMap<VoiceKey, ClipId>,
}

impl TracingSink {
    pub fn new(mixer: MixerSettings) -> Self {
        Self {
            mixer,
            playing: HashMap::new(),
        }
    }

    /// Gain a voice ends up with after its own volume and the mixer.
    pub fn output_gain(&self, settings: &VoiceSettings) -> f32 {
        settings.volume * self.mixer.effective_gain(settings.route)
    }
}

fn gain_db(gain: f32) -> f32 {
    if gain <= 0.0 { MUTED_DB } else { linear_to_db(gain) }
}

impl PlaybackSink for TracingSink {
    fn start(&mut self, voice: VoiceKey, settings: &VoiceSettings) {
        let gain = self.output_gain(settings);
        tracing::info!(
            voice = %voice,
            clip = %settings.clip,
            route = %settings.route,
            origin = ?settings.origin,
            looping = settings.looping,
            anchor = settings.anchor.0,
            blend = settings.spatial_blend,
            gain_db = gain_db(gain),
            "start"
        );
        self.playing.insert(voice, settings.clip.clone());
    }

    fn stop(&mut self, voice: VoiceKey) {
        match self.playing.remove(&voice) {
            Some(clip) => tracing::info!(voice = %voice, clip = %clip, "stop"),
            None => tracing::debug!(voice = %voice, "stop for unknown voice"),
        }
    }

    fn dispose(&mut self, voice: VoiceKey) {
        tracing::debug!(voice = %voice, "dispose");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sfx_pool::mixer::Channel;
    use sfx_pool::request::AnchorId;
    use sfx_pool::voice::{VoiceId, VoiceOrigin};
    use sfx_pool::{Route, Vec3};

    fn settings(route: Route, volume: f32) -> VoiceSettings {
        VoiceSettings {
            clip: "hit".into(),
            origin: VoiceOrigin::Pooled,
            volume,
            route,
            looping: false,
            anchor: AnchorId::ROOT,
            position: Vec3::ZERO,
            spatial_blend: 0.0,
        }
    }

    #[test]
    fn output_gain_applies_mixer() {
        let mut mixer = MixerSettings::default();
        mixer.set_volume(Channel::Sfx, 0.5);
        mixer.set_enabled(Channel::Ui, false);
        let sink = TracingSink::new(mixer);
        assert_eq!(sink.output_gain(&settings(Route::Sfx, 0.5)), 0.25);
        assert_eq!(sink.output_gain(&settings(Route::Ui, 1.0)), 0.0);
        assert_eq!(sink.output_gain(&settings(Route::Direct, 0.8)), 0.8);
    }

    #[test]
    fn tracks_playing_voices() {
        let mut sink = TracingSink::default();
        let key = VoiceKey {
            id: VoiceId(0),
            generation: 0,
        };
        sink.start(key, &settings(Route::Sfx, 1.0));
        assert_eq!(sink.playing.len(), 1);
        sink.stop(key);
        sink.stop(key);
        assert_eq!(sink.playing.len(), 0);
    }

    #[test]
    fn muted_gain_reports_floor() {
        assert_eq!(gain_db(0.0), MUTED_DB);
        assert!(gain_db(1.0).abs() < 1e-6);
    }
}
