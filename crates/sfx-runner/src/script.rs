//! Cue scripts: a clip table plus timed play / stop commands.
//!
//! ```toml
//! [clips.step]
//! duration_ms = 300
//!
//! [clips.theme]
//! path = "theme.flac"
//!
//! [[cue]]
//! at_ms = 0
//! action = "play"
//! clip = "theme"
//! route = "music"
//! looping = true
//! tag = "bgm"
//!
//! [[cue]]
//! at_ms = 2000
//! action = "stop"
//! tag = "bgm"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use sfx_pool::clip::{ClipLibrary, DurationSource};
use sfx_pool::request::{AnchorId, PlaybackRequest, SpatialParams};
use sfx_pool::{Route, Vec3};

#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub clips: BTreeMap<String, ClipSpec>,
    #[serde(default, rename = "cue")]
    pub cues: Vec<Cue>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClipSpec {
    pub duration_ms: Option<u64>,
    /// Audio file to probe, relative to the script.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CueAction {
    Play,
    Stop,
    StopAll,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Cue {
    pub at_ms: u64,
    pub action: CueAction,
    pub clip: Option<String>,
    #[serde(default)]
    pub route: Route,
    #[serde(default)]
    pub looping: bool,
    pub volume: Option<f32>,
    pub pooled: Option<bool>,
    pub anchor: Option<u64>,
    pub position: Option<[f32; 3]>,
    pub spatial_blend: Option<f32>,
    /// Stop this playback after the given time, if it is still running.
    pub stop_after_ms: Option<u64>,
    /// Name for later `stop` cues. A `stop` cue stops every playback with its tag.
    pub tag: Option<String>,
}

impl Script {
    pub fn load(path: &Path) -> Result<Self> {
        let raw =
            std::fs::read_to_string(path).with_context(|| format!("read script {:?}", path))?;
        Self::parse(&raw).with_context(|| format!("load script {:?}", path))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let mut script: Script = toml::from_str(raw).context("parse script")?;
        script.validate()?;
        script.cues.sort_by_key(|cue| cue.at_ms);
        Ok(script)
    }

    fn validate(&self) -> Result<()> {
        for (name, entry) in &self.clips {
            if entry.duration_ms.is_none() && entry.path.is_none() {
                bail!("clip {name:?} needs duration_ms or path");
            }
        }
        for (idx, cue) in self.cues.iter().enumerate() {
            match cue.action {
                CueAction::Stop if cue.tag.is_none() => {
                    bail!("cue #{idx} at {} ms: stop needs a tag", cue.at_ms);
                }
                CueAction::Play => match cue.clip.as_deref() {
                    None => bail!("cue #{idx} at {} ms: play needs a clip", cue.at_ms),
                    Some(clip) if !self.clips.contains_key(clip) => {
                        bail!("cue #{idx} at {} ms: unknown clip {clip:?}", cue.at_ms);
                    }
                    Some(_) => {}
                },
                _ => {}
            }
        }
        Ok(())
    }

    /// Build the clip table. Relative paths resolve against `base_dir`.
    pub fn library(&self, base_dir: &Path) -> Result<ClipLibrary> {
        let mut library = ClipLibrary::new();
        for (name, entry) in &self.clips {
            match (entry.duration_ms, entry.path.as_ref()) {
                (Some(ms), _) => {
                    library.insert(name.as_str(), Duration::from_millis(ms));
                }
                (None, Some(path)) => {
                    let path = base_dir.join(path);
                    library
                        .load_file(name.as_str(), &path)
                        .with_context(|| format!("load clip {name:?}"))?;
                }
                (None, None) => bail!("clip {name:?} needs duration_ms or path"),
            }
        }
        Ok(library)
    }

    /// Time by which every cue has fired and every scheduled stop has run.
    pub fn last_event(&self, durations: &impl DurationSource) -> Duration {
        self.cues
            .iter()
            .map(|cue| {
                let at = Duration::from_millis(cue.at_ms);
                let stop = cue.stop_after_ms.map(Duration::from_millis);
                let natural = match (&cue.clip, cue.looping) {
                    (Some(clip), false) => durations.duration(&clip.as_str().into()),
                    _ => None,
                };
                at + stop.into_iter().chain(natural).min().unwrap_or_default()
            })
            .max()
            .unwrap_or_default()
    }
}

impl Cue {
    pub fn at(&self) -> Duration {
        Duration::from_millis(self.at_ms)
    }

    /// Playback request for a `play` cue.
    pub fn request(&self) -> PlaybackRequest {
        let mut request = PlaybackRequest {
            clip: self.clip.as_deref().map(Into::into),
            route: self.route,
            anchor: self.anchor.map(AnchorId),
            looping: self.looping,
            ..PlaybackRequest::default()
        };
        if let Some(volume) = self.volume {
            request.volume = volume;
        }
        if let Some(pooled) = self.pooled {
            request.pooled = pooled;
        }
        if self.position.is_some() || self.spatial_blend.is_some() {
            let mut spatial = SpatialParams::at(self.position.map(Vec3::from).unwrap_or_default());
            if let Some(blend) = self.spatial_blend {
                spatial = spatial.with_blend(blend);
            }
            request.spatial = Some(spatial);
        }
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = r#"
[clips.step]
duration_ms = 300

[clips.theme]
duration_ms = 4000

[[cue]]
at_ms = 500
action = "stop"
tag = "bgm"

[[cue]]
at_ms = 0
action = "play"
clip = "theme"
route = "music"
looping = true
tag = "bgm"

[[cue]]
at_ms = 100
action = "play"
clip = "step"
route = "sfx"
volume = 0.5
position = [1.0, 0.0, -2.0]
stop_after_ms = 50
"#;

    #[test]
    fn parses_and_orders_cues() {
        let script = Script::parse(SCRIPT).unwrap();
        assert_eq!(script.clips.len(), 2);
        let times: Vec<u64> = script.cues.iter().map(|c| c.at_ms).collect();
        assert_eq!(times, vec![0, 100, 500]);
        assert_eq!(script.cues[2].action, CueAction::Stop);
    }

    #[test]
    fn play_cue_builds_request() {
        let script = Script::parse(SCRIPT).unwrap();
        let req = script.cues[1].request();
        assert_eq!(req.clip.as_deref(), Some("step"));
        assert_eq!(req.route, Route::Sfx);
        assert_eq!(req.volume, 0.5);
        assert!(req.pooled);
        let spatial = req.spatial.unwrap();
        assert_eq!(spatial.position, Vec3::new(1.0, 0.0, -2.0));
        assert_eq!(spatial.spatial_blend, 1.0);

        let flat = script.cues[0].request();
        assert!(flat.spatial.is_none());
        assert!(flat.looping);
    }

    #[test]
    fn library_uses_declared_durations() {
        let script = Script::parse(SCRIPT).unwrap();
        let lib = script.library(Path::new(".")).unwrap();
        assert_eq!(lib.duration(&"step".into()), Some(Duration::from_millis(300)));
        // theme loops until the stop cue at 500; step is cut at 100 + 50.
        assert_eq!(script.last_event(&lib), Duration::from_millis(500));
    }

    #[test]
    fn rejects_stop_without_tag() {
        let err = Script::parse("[[cue]]\nat_ms = 1\naction = \"stop\"\n").unwrap_err();
        assert!(format!("{err:#}").contains("needs a tag"));
    }

    #[test]
    fn rejects_play_of_undeclared_clip() {
        let raw = "[clips.step]\nduration_ms = 300\n\n[[cue]]\nat_ms = 0\naction = \"play\"\nclip = \"stpe\"\n";
        let err = Script::parse(raw).unwrap_err();
        assert!(format!("{err:#}").contains("unknown clip \"stpe\""));
    }

    #[test]
    fn rejects_play_without_clip() {
        let err = Script::parse("[[cue]]\nat_ms = 0\naction = \"play\"\n").unwrap_err();
        assert!(format!("{err:#}").contains("play needs a clip"));
    }

    #[test]
    fn rejects_misspelled_cue_field() {
        let raw = "[clips.step]\nduration_ms = 300\n\n[[cue]]\nat_ms = 0\naction = \"play\"\nclip = \"step\"\nloop = true\n";
        let err = Script::parse(raw).unwrap_err();
        assert!(format!("{err:#}").contains("loop"));
    }

    #[test]
    fn rejects_clip_without_source() {
        let err = Script::parse("[clips.empty]\n").unwrap_err();
        assert!(format!("{err:#}").contains("duration_ms or path"));
    }

    #[test]
    fn missing_clip_file_is_reported() {
        let script = Script::parse("[clips.x]\npath = \"missing.wav\"\n").unwrap();
        let err = script.library(Path::new("/nonexistent")).unwrap_err();
        assert!(format!("{err:#}").contains("load clip \"x\""));
    }
}
