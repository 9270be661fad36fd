//! Clip identities and the duration lookup used to schedule auto-reclaim.
//!
//! [`ClipLibrary`] keeps a name → duration table. Durations are either
//! registered directly or probed from an audio file with Symphonia.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use symphonia::core::codecs::CodecParameters;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Handle naming a playable clip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClipId(pub String);

impl From<String> for ClipId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ClipId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::ops::Deref for ClipId {
    type Target = str;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for ClipId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Answers "how long does this clip play for".
pub trait DurationSource {
    /// Intrinsic playback length of `clip`, or `None` if unknown.
    fn duration(&self, clip: &ClipId) -> Option<Duration>;
}

impl<F> DurationSource for F
where
    F: Fn(&ClipId) -> Option<Duration>,
{
    fn duration(&self, clip: &ClipId) -> Option<Duration> {
        self(clip)
    }
}

/// In-memory clip table.
#[derive(Debug, Default, Clone)]
pub struct ClipLibrary {
    clips: HashMap<ClipId, Duration>,
}

impl ClipLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a clip with a known duration.
    pub fn insert(&mut self, id: impl Into<ClipId>, duration: Duration) -> ClipId {
        let id = id.into();
        self.clips.insert(id.clone(), duration);
        id
    }

    /// Forget a clip. Returns its duration if it was registered.
    pub fn remove(&mut self, id: &ClipId) -> Option<Duration> {
        self.clips.remove(id)
    }

    pub fn contains(&self, id: &ClipId) -> bool {
        self.clips.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Probe `path` and register it under `id`.
    pub fn load_file(&mut self, id: impl Into<ClipId>, path: &Path) -> Result<ClipId> {
        let duration = probe_duration(path)?
            .ok_or_else(|| anyhow!("no duration metadata in {:?}", path))?;
        let id = self.insert(id, duration);
        tracing::debug!(clip = %id, duration_ms = duration.as_millis() as u64, "clip loaded");
        Ok(id)
    }
}

impl DurationSource for ClipLibrary {
    fn duration(&self, clip: &ClipId) -> Option<Duration> {
        self.clips.get(clip).copied()
    }
}

/// Probe an audio file's container for its playback length.
///
/// Returns `Ok(None)` when the container does not carry a frame count.
pub fn probe_duration(path: &Path) -> Result<Option<Duration>> {
    let file = File::open(path).with_context(|| format!("open {:?}", path))?;

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let mss = MediaSourceStream::new(Box::new(file), Default::default());
    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .with_context(|| format!("probe {:?}", path))?;

    let track = probed
        .format
        .default_track()
        .ok_or_else(|| anyhow!("no default audio track in {:?}", path))?;

    Ok(duration_ms_from_codec_params(&track.codec_params).map(Duration::from_millis))
}

/// Best-effort duration in milliseconds from codec metadata.
fn duration_ms_from_codec_params(codec_params: &CodecParameters) -> Option<u64> {
    let frames = codec_params.n_frames?;
    let rate = codec_params.sample_rate? as u64;
    if rate == 0 {
        return None;
    }
    Some(frames.saturating_mul(1000) / rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root(tag: &str) -> std::path::PathBuf {
        let root = std::env::temp_dir().join(format!(
            "sfx-pool-clip-{tag}-{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        let _ = std::fs::create_dir_all(&root);
        root
    }

    /// 16-bit mono PCM WAV with `frames` zeroed samples.
    fn write_wav(path: &Path, rate: u32, frames: u32) {
        let data_len = frames * 2;
        let mut bytes = Vec::with_capacity(44 + data_len as usize);
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVE");
        bytes.extend_from_slice(b"fmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&rate.to_le_bytes());
        bytes.extend_from_slice(&(rate * 2).to_le_bytes());
        bytes.extend_from_slice(&2u16.to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());
        bytes.resize(44 + data_len as usize, 0);
        std::fs::write(path, bytes).unwrap();
    }

    #[test]
    fn duration_ms_from_codec_params_handles_zero_rate() {
        let mut params = CodecParameters::new();
        params.sample_rate = Some(0);
        params.n_frames = Some(100);
        assert!(duration_ms_from_codec_params(&params).is_none());
    }

    #[test]
    fn duration_ms_from_codec_params_computes() {
        let mut params = CodecParameters::new();
        params.sample_rate = Some(48_000);
        params.n_frames = Some(72_000);
        assert_eq!(duration_ms_from_codec_params(&params), Some(1500));
    }

    #[test]
    fn library_reports_registered_durations() {
        let mut lib = ClipLibrary::new();
        let id = lib.insert("click", Duration::from_millis(120));
        assert_eq!(lib.duration(&id), Some(Duration::from_millis(120)));
        assert_eq!(lib.duration(&ClipId::from("missing")), None);
        assert_eq!(lib.remove(&id), Some(Duration::from_millis(120)));
        assert!(lib.is_empty());
    }

    #[test]
    fn closures_act_as_duration_sources() {
        let source = |clip: &ClipId| (&**clip == "boom").then(|| Duration::from_secs(2));
        assert_eq!(source.duration(&"boom".into()), Some(Duration::from_secs(2)));
        assert_eq!(source.duration(&"hiss".into()), None);
    }

    #[test]
    fn load_file_probes_wav_duration() {
        let root = temp_root("wav");
        let path = root.join("beep.wav");
        write_wav(&path, 8_000, 4_000);

        let mut lib = ClipLibrary::new();
        let id = lib.load_file("beep", &path).expect("probe wav");
        assert_eq!(lib.duration(&id), Some(Duration::from_millis(500)));
    }

    #[test]
    fn load_file_missing_path_errors() {
        let root = temp_root("missing");
        let mut lib = ClipLibrary::new();
        let err = lib.load_file("nope", &root.join("nope.wav")).unwrap_err();
        assert!(format!("{err:#}").contains("open"));
        assert!(lib.is_empty());
    }
}
