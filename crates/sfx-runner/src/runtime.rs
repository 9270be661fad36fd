//! Subcommand implementations.
//!
//! The runner owns the only manager in the process and is its frame-tick
//! source: every loop iteration fires due cues and then advances the manager
//! clock by one tick.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use crossbeam_channel::Receiver;
use sfx_pool::clip::{ClipLibrary, probe_duration};
use sfx_pool::config::{ExhaustionPolicy, PoolConfig};
use sfx_pool::manager::{PlaybackManager, StopHandle};
use sfx_pool::mixer::{Channel, MixerSettings};
use sfx_pool::prefs::PrefsStore;
use sfx_pool::request::PlaybackRequest;
use sfx_pool::{PoolStatus, Route};

use crate::config::RunnerConfig;
use crate::script::{Cue, CueAction, Script};
use crate::sink::TracingSink;

/// Play a cue script to the end (or until Ctrl-C) and print the final status.
pub fn run_script(cfg: &RunnerConfig, path: &Path, realtime: bool, json: bool) -> Result<()> {
    let script = Script::load(path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let library = script.library(base_dir)?;
    tracing::info!(
        script = ?path,
        cues = script.cues.len(),
        clips = library.len(),
        until_ms = script.last_event(&library).as_millis() as u64,
        "script loaded"
    );

    let manager = PlaybackManager::new(
        cfg.pool.clone(),
        TracingSink::new(load_mixer(cfg)),
        library,
    );

    let (interrupt_tx, interrupt_rx) = crossbeam_channel::bounded(1);
    let _ = ctrlc::set_handler(move || {
        let _ = interrupt_tx.try_send(());
    });

    let outcome = drive(&manager, script.cues, cfg.tick(), realtime, &interrupt_rx);
    if outcome.rejected > 0 {
        tracing::warn!(rejected = outcome.rejected, "some play cues were refused");
    }
    let status = manager.shutdown();
    print_status(&status, json)
}

#[derive(Debug, Default, PartialEq, Eq)]
struct RunOutcome {
    interrupted: bool,
    rejected: usize,
}

fn drive(
    manager: &PlaybackManager,
    cues: Vec<Cue>,
    tick: Duration,
    realtime: bool,
    interrupt: &Receiver<()>,
) -> RunOutcome {
    let mut player = CuePlayer::new(cues);
    let mut interrupted = false;
    loop {
        player.fire_due(manager);

        let signalled = if realtime {
            matches!(interrupt.recv_timeout(tick), Ok(()))
        } else {
            interrupt.try_recv().is_ok()
        };
        if signalled {
            tracing::info!("interrupted; stopping all voices");
            manager.stop_all();
            interrupted = true;
            break;
        }

        if player.is_done() && manager.next_deadline().is_none() {
            break;
        }
        manager.tick(tick);
    }
    RunOutcome {
        interrupted,
        rejected: player.rejected,
    }
}

struct CuePlayer {
    cues: VecDeque<Cue>,
    tagged: HashMap<String, Vec<StopHandle>>,
    stop_at: Vec<(Duration, StopHandle)>,
    rejected: usize,
}

impl CuePlayer {
    fn new(cues: Vec<Cue>) -> Self {
        Self {
            cues: cues.into(),
            tagged: HashMap::new(),
            stop_at: Vec::new(),
            rejected: 0,
        }
    }

    fn is_done(&self) -> bool {
        self.cues.is_empty() && self.stop_at.is_empty()
    }

    fn fire_due(&mut self, manager: &PlaybackManager) {
        let now = manager.now();
        while self.cues.front().is_some_and(|cue| cue.at() <= now) {
            let Some(cue) = self.cues.pop_front() else {
                break;
            };
            self.apply(&cue, manager, now);
        }

        let (due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.stop_at)
            .into_iter()
            .partition(|(at, _)| *at <= now);
        self.stop_at = pending;
        for (_, handle) in due {
            if handle.stop() {
                tracing::debug!(voice = %handle.key(), "scheduled stop");
            }
        }
    }

    fn apply(&mut self, cue: &Cue, manager: &PlaybackManager, now: Duration) {
        match cue.action {
            CueAction::Play => match manager.play(cue.request()) {
                Ok(handle) => {
                    if let Some(ms) = cue.stop_after_ms {
                        self.stop_at
                            .push((now + Duration::from_millis(ms), handle.clone()));
                    }
                    if let Some(tag) = cue.tag.as_ref() {
                        self.tagged.entry(tag.clone()).or_default().push(handle);
                    }
                }
                Err(err) => {
                    self.rejected += 1;
                    tracing::debug!(at_ms = cue.at_ms, "play cue refused: {err}");
                }
            },
            CueAction::Stop => {
                let handles = cue
                    .tag
                    .as_ref()
                    .and_then(|tag| self.tagged.remove(tag))
                    .unwrap_or_default();
                let stopped = handles.iter().filter(|h| h.stop()).count();
                tracing::info!(tag = ?cue.tag, stopped, "stop cue");
            }
            CueAction::StopAll => {
                manager.stop_all();
            }
        }
    }
}

/// Two-voice pool: a one-shot, a loop, a refused third request, natural
/// completion of the one-shot, then early cancel of the loop.
pub fn run_demo(cfg: &RunnerConfig, json: bool) -> Result<()> {
    let status = demo_scenario(TracingSink::new(load_mixer(cfg)))?;
    print_status(&status, json)
}

fn demo_scenario(sink: TracingSink) -> Result<PoolStatus> {
    let mut library = ClipLibrary::new();
    library.insert("a", Duration::from_millis(1_000));
    library.insert("b", Duration::from_millis(2_000));
    library.insert("c", Duration::from_millis(500));

    let config = PoolConfig {
        pooling_enabled: true,
        capacity: 2,
        on_exhausted: ExhaustionPolicy::Reject,
    };
    let manager = PlaybackManager::new(config, sink, library);

    let a = manager.play(PlaybackRequest::new("a").route(Route::Sfx))?;
    tracing::info!(voice = %a.key(), "A: one-shot, 1.0 s");
    let b = manager.play(PlaybackRequest::new("b").route(Route::Music).looping(true))?;
    tracing::info!(voice = %b.key(), "B: looping");

    match manager.play(PlaybackRequest::new("c").route(Route::Ui)) {
        Err(err) => tracing::info!("C: refused ({err})"),
        Ok(c) => bail!("C got voice {} from a full pool", c.key()),
    }

    manager.tick(Duration::from_millis(999));
    tracing::info!(a_playing = a.is_playing(), "t = 999 ms");
    manager.tick(Duration::from_millis(1));
    tracing::info!(
        a_playing = a.is_playing(),
        available = manager.status().available,
        "t = 1000 ms"
    );

    let stopped = b.stop();
    tracing::info!(stopped, available = manager.status().available, "B: cancelled");

    Ok(manager.shutdown())
}

/// Print the container duration of each file. Fails if any file could not be read.
pub fn probe(paths: &[PathBuf]) -> Result<()> {
    let mut failed = 0usize;
    for path in paths {
        match probe_duration(path) {
            Ok(Some(duration)) => println!("{}\t{} ms", path.display(), duration.as_millis()),
            Ok(None) => println!("{}\tunknown", path.display()),
            Err(err) => {
                failed += 1;
                tracing::warn!("probe failed: {err:#}");
            }
        }
    }
    if failed > 0 {
        bail!("{failed} of {} files could not be probed", paths.len());
    }
    Ok(())
}

/// Edits requested by the `settings` subcommand.
#[derive(Debug, Default, Clone)]
pub struct SettingsEdit {
    pub set: Vec<(Channel, f32)>,
    pub disable: Vec<Channel>,
    pub enable: Vec<Channel>,
    pub reset: bool,
    pub clear: bool,
}

impl SettingsEdit {
    fn changes_mixer(&self) -> bool {
        self.reset || !self.set.is_empty() || !self.disable.is_empty() || !self.enable.is_empty()
    }

    fn is_empty(&self) -> bool {
        !self.clear && !self.changes_mixer()
    }
}

fn apply_settings(prefs: &mut PrefsStore, edit: &SettingsEdit) -> MixerSettings {
    if edit.clear {
        MixerSettings::forget(prefs);
    }
    let mut mixer = MixerSettings::load(prefs);
    if edit.reset {
        mixer.reset();
    }
    for (channel, level) in &edit.set {
        mixer.set_volume(*channel, *level);
    }
    for channel in &edit.disable {
        mixer.set_enabled(*channel, false);
    }
    for channel in &edit.enable {
        mixer.set_enabled(*channel, true);
    }
    if edit.changes_mixer() {
        mixer.store(prefs);
    }
    mixer
}

pub fn settings(cfg: &RunnerConfig, edit: &SettingsEdit, json: bool) -> Result<()> {
    let path = cfg.prefs_path();
    let mut prefs = PrefsStore::open(&path)?;
    let mixer = apply_settings(&mut prefs, edit);
    if !edit.is_empty() {
        prefs.save()?;
        tracing::info!(path = ?path, "settings saved");
    }

    if json {
        let raw = serde_json::to_string_pretty(&mixer).context("serialize settings")?;
        println!("{raw}");
        return Ok(());
    }
    for channel in Channel::ALL {
        let level = mixer.level(channel);
        println!(
            "{:<7} {:>5.2} {:>7.1} dB  {}",
            channel.as_str(),
            level.volume,
            level.attenuation_db(),
            if level.enabled { "on" } else { "off" }
        );
    }
    Ok(())
}

fn load_mixer(cfg: &RunnerConfig) -> MixerSettings {
    let path = cfg.prefs_path();
    match PrefsStore::open(&path) {
        Ok(prefs) => MixerSettings::load(&prefs),
        Err(err) => {
            tracing::warn!("mixer settings unavailable, using defaults: {err:#}");
            MixerSettings::default()
        }
    }
}

fn print_status(status: &PoolStatus, json: bool) -> Result<()> {
    if json {
        let raw = serde_json::to_string_pretty(status).context("serialize status")?;
        println!("{raw}");
        return Ok(());
    }
    let c = &status.counters;
    println!(
        "pool: capacity {} available {} active {} (pooled {}, unpooled {}){}",
        status.capacity,
        status.available,
        status.active(),
        status.active_pooled,
        status.active_unpooled,
        if status.pooling_enabled { "" } else { " [pooling disabled]" }
    );
    println!("clock: {} ms", status.clock_ms);
    println!(
        "started {} completed {} cancelled {} stopped {} stolen {} exhausted {} invalid {}",
        c.started, c.completed, c.cancelled, c.stopped, c.stolen, c.exhausted, c.invalid
    );
    Ok(())
}
