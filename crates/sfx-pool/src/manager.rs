//! The playback manager: pooled and ad hoc voices, reclaim timers, stop-all.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use sfx_types::{PlaybackCounters, PoolStatus, ReclaimReason};

use crate::clip::{ClipId, DurationSource};
use crate::config::{ExhaustionPolicy, PoolConfig};
use crate::error::PlayError;
use crate::pool::VoicePool;
use crate::request::PlaybackRequest;
use crate::sink::PlaybackSink;
use crate::timer::ReclaimTimers;
use crate::voice::{Voice, VoiceId, VoiceKey, VoiceOrigin};

/// Hands out voices for playback requests and takes them back.
///
/// One manager per host. It is `Send + Sync`; the host drives it through
/// [`tick`](Self::tick) and every other call is serialized on an internal lock.
pub struct PlaybackManager {
    state: Arc<Mutex<ManagerState>>,
}

/// Cancels one playback.
///
/// Stopping is synchronous: once [`stop`](Self::stop) returns, the voice is
/// silent and back in the pool (or disposed). A handle never affects a later
/// playback that happens to reuse the same pooled voice.
#[derive(Clone, Debug)]
pub struct StopHandle {
    key: VoiceKey,
    state: Weak<Mutex<ManagerState>>,
}

struct ManagerState {
    config: PoolConfig,
    /// `None` when pooling is disabled.
    pool: Option<VoicePool>,
    unpooled: HashMap<VoiceId, Voice>,
    /// Unpooled ids start above the pool's so the two never collide.
    unpooled_base: u32,
    next_unpooled: u32,
    timers: ReclaimTimers<VoiceKey>,
    clock: Duration,
    start_seq: u64,
    counters: PlaybackCounters,
    sink: Box<dyn PlaybackSink>,
    durations: Box<dyn DurationSource + Send>,
}

fn lock(state: &Mutex<ManagerState>) -> MutexGuard<'_, ManagerState> {
    state.lock().unwrap_or_else(|err| err.into_inner())
}

impl PlaybackManager {
    /// Allocate the pool (when pooling is enabled) and take ownership of the
    /// collaborators.
    pub fn new<S, D>(config: PoolConfig, sink: S, durations: D) -> Self
    where
        S: PlaybackSink + 'static,
        D: DurationSource + Send + 'static,
    {
        let capacity = config.effective_capacity();
        let pool = config.pooling_enabled.then(|| VoicePool::new(capacity));
        let unpooled_base = pool.as_ref().map_or(0, |p| p.capacity() as u32);
        tracing::info!(
            pooling_enabled = config.pooling_enabled,
            capacity,
            on_exhausted = ?config.on_exhausted,
            "playback manager initialized"
        );
        let state = ManagerState {
            config,
            pool,
            unpooled: HashMap::new(),
            unpooled_base,
            next_unpooled: unpooled_base,
            timers: ReclaimTimers::new(),
            clock: Duration::ZERO,
            start_seq: 0,
            counters: PlaybackCounters::default(),
            sink: Box::new(sink),
            durations: Box::new(durations),
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Start playing `request`.
    ///
    /// Non-looping voices are reclaimed automatically once the clip's duration
    /// has elapsed on the manager clock; looping voices play until stopped.
    pub fn play(&self, request: PlaybackRequest) -> Result<StopHandle, PlayError> {
        let key = lock(&self.state).play(request)?;
        Ok(StopHandle {
            key,
            state: Arc::downgrade(&self.state),
        })
    }

    /// Stop the playback identified by `key`. Same semantics as
    /// [`StopHandle::stop`].
    pub fn stop(&self, key: VoiceKey) -> bool {
        lock(&self.state).reclaim(key, ReclaimReason::Cancelled)
    }

    /// Silence and reclaim every playing voice. Returns how many were reclaimed.
    pub fn stop_all(&self) -> usize {
        let stopped = lock(&self.state).reclaim_all(ReclaimReason::StoppedAll);
        if stopped > 0 {
            tracing::info!(stopped, "all voices stopped");
        }
        stopped
    }

    /// Advance the manager clock by `dt` and reclaim every voice whose clip
    /// has finished. Returns how many were reclaimed.
    pub fn tick(&self, dt: Duration) -> usize {
        lock(&self.state).tick(dt)
    }

    pub fn is_active(&self, key: VoiceKey) -> bool {
        lock(&self.state).is_active(key)
    }

    /// Current manager clock.
    pub fn now(&self) -> Duration {
        lock(&self.state).clock
    }

    /// Deadline of the next pending auto-reclaim, if any.
    pub fn next_deadline(&self) -> Option<Duration> {
        lock(&self.state).timers.next_deadline()
    }

    pub fn status(&self) -> PoolStatus {
        lock(&self.state).status()
    }

    /// Stop everything, dispose every pooled voice and release the state.
    ///
    /// Outstanding stop handles become no-ops. Returns the final status.
    pub fn shutdown(self) -> PoolStatus {
        let mut state = lock(&self.state);
        let stopped = state.reclaim_all(ReclaimReason::Shutdown);
        let disposed = match state.pool.as_mut() {
            Some(pool) => pool.dispose_all(),
            None => Vec::new(),
        };
        for key in &disposed {
            state.sink.dispose(*key);
        }
        let status = state.status();
        tracing::info!(
            stopped,
            disposed = disposed.len(),
            started = status.counters.started,
            "playback manager shut down"
        );
        status
    }
}

impl std::fmt::Debug for PlaybackManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackManager")
            .field("status", &self.status())
            .finish()
    }
}

impl StopHandle {
    pub fn key(&self) -> VoiceKey {
        self.key
    }

    /// Stop the playback now. Returns `false` if it had already ended, was
    /// already stopped, or the manager is gone.
    pub fn stop(&self) -> bool {
        let Some(state) = self.state.upgrade() else {
            return false;
        };
        lock(&state).reclaim(self.key, ReclaimReason::Cancelled)
    }

    pub fn is_playing(&self) -> bool {
        let Some(state) = self.state.upgrade() else {
            return false;
        };
        lock(&state).is_active(self.key)
    }
}

impl ManagerState {
    fn play(&mut self, request: PlaybackRequest) -> Result<VoiceKey, PlayError> {
        let Some(clip) = request.clip.clone() else {
            self.counters.invalid += 1;
            tracing::warn!(route = %request.route, "play request without a clip ignored");
            return Err(PlayError::InvalidRequest {
                reason: "missing clip",
            });
        };

        let pooled_id = if request.pooled && self.config.pooling_enabled {
            self.acquire_pooled(&clip)?
        } else {
            None
        };

        let now = self.clock;
        self.start_seq += 1;
        let seq = self.start_seq;

        let pooled_voice = match (pooled_id, self.pool.as_mut()) {
            (Some(id), Some(pool)) => pool.get_mut(id),
            _ => None,
        };
        let (key, settings) = match pooled_voice {
            Some(voice) => {
                voice.configure(&request, clip.clone(), now, seq);
                (voice.key(), voice.settings())
            }
            None => {
                let id = self.next_unpooled_id();
                let mut voice = Voice::new(id, VoiceOrigin::Unpooled);
                voice.configure(&request, clip.clone(), now, seq);
                let out = (voice.key(), voice.settings());
                self.unpooled.insert(id, voice);
                out
            }
        };

        if let Some(settings) = &settings {
            self.sink.start(key, settings);
        }

        if !request.looping {
            let duration = self.durations.duration(&clip).unwrap_or_else(|| {
                tracing::debug!(clip = %clip, "clip duration unknown; reclaiming on next tick");
                Duration::ZERO
            });
            let timer = self.timers.schedule(now.saturating_add(duration), key);
            if let Some(voice) = self.voice_mut(key.id) {
                voice.timer = Some(timer);
            }
        }

        self.counters.started += 1;
        tracing::debug!(
            voice = %key,
            clip = %clip,
            pooled = pooled_id.is_some(),
            looping = request.looping,
            route = %request.route,
            "voice started"
        );
        Ok(key)
    }

    /// Take a free pooled voice, applying the exhaustion policy when none is
    /// left. `Ok(None)` sends the request down the unpooled path.
    fn acquire_pooled(&mut self, clip: &ClipId) -> Result<Option<VoiceId>, PlayError> {
        let Some(pool) = self.pool.as_mut() else {
            return Ok(None);
        };
        if let Some(id) = pool.acquire() {
            return Ok(Some(id));
        }
        let capacity = pool.capacity();
        let victim = pool.oldest_active();
        match self.config.on_exhausted {
            ExhaustionPolicy::Reject => {
                self.counters.exhausted += 1;
                tracing::warn!(clip = %clip, capacity, "voice pool exhausted; request rejected");
                Err(PlayError::PoolExhausted { capacity })
            }
            ExhaustionPolicy::Unpooled => {
                tracing::debug!(clip = %clip, capacity, "voice pool exhausted; playing unpooled");
                Ok(None)
            }
            ExhaustionPolicy::StealOldest => {
                if let Some(victim) = victim {
                    tracing::debug!(clip = %clip, voice = %victim, "voice pool exhausted; stealing oldest");
                    self.reclaim(victim, ReclaimReason::Stolen);
                }
                match self.pool.as_mut().and_then(VoicePool::acquire) {
                    Some(id) => Ok(Some(id)),
                    None => {
                        self.counters.exhausted += 1;
                        tracing::warn!(clip = %clip, capacity, "voice pool exhausted; nothing to steal");
                        Err(PlayError::PoolExhausted { capacity })
                    }
                }
            }
        }
    }

    /// Next free ad hoc id. Wraps back to the base on overflow, skipping ids
    /// still held by playing voices.
    fn next_unpooled_id(&mut self) -> VoiceId {
        loop {
            let id = VoiceId(self.next_unpooled);
            self.next_unpooled = self
                .next_unpooled
                .checked_add(1)
                .unwrap_or(self.unpooled_base);
            if !self.unpooled.contains_key(&id) {
                return id;
            }
        }
    }

    fn voice_mut(&mut self, id: VoiceId) -> Option<&mut Voice> {
        if let Some(pool) = self.pool.as_mut() {
            if pool.owns(id) {
                return pool.get_mut(id);
            }
        }
        self.unpooled.get_mut(&id)
    }

    fn voice(&self, id: VoiceId) -> Option<&Voice> {
        match self.pool.as_ref() {
            Some(pool) if pool.owns(id) => pool.get(id),
            _ => self.unpooled.get(&id),
        }
    }

    fn is_active(&self, key: VoiceKey) -> bool {
        self.voice(key.id)
            .is_some_and(|v| v.is_active() && v.key() == key)
    }

    /// Stop `key` and give its voice back. Returns `false` when `key` no
    /// longer names a playing voice.
    fn reclaim(&mut self, key: VoiceKey, reason: ReclaimReason) -> bool {
        if !self.is_active(key) {
            return false;
        }
        let origin = match self.voice(key.id) {
            Some(voice) => voice.origin(),
            None => return false,
        };
        match origin {
            VoiceOrigin::Pooled => {
                let Some(pool) = self.pool.as_mut() else {
                    return false;
                };
                let Some(voice) = pool.get_mut(key.id) else {
                    return false;
                };
                if let Some(timer) = voice.timer.take() {
                    self.timers.cancel(timer);
                }
                self.sink.stop(key);
                voice.deactivate();
                pool.release(key.id);
            }
            VoiceOrigin::Unpooled => {
                let Some(mut voice) = self.unpooled.remove(&key.id) else {
                    return false;
                };
                if let Some(timer) = voice.timer.take() {
                    self.timers.cancel(timer);
                }
                self.sink.stop(key);
                voice.dispose();
                self.sink.dispose(key);
            }
        }
        self.counters.record_reclaim(reason);
        tracing::debug!(voice = %key, ?reason, "voice reclaimed");
        true
    }

    fn reclaim_all(&mut self, reason: ReclaimReason) -> usize {
        let mut keys = self
            .pool
            .as_ref()
            .map(VoicePool::active_keys)
            .unwrap_or_default();
        keys.extend(
            self.unpooled
                .values()
                .filter(|v| v.is_active())
                .map(Voice::key),
        );
        keys.into_iter()
            .filter(|key| self.reclaim(*key, reason))
            .count()
    }

    fn tick(&mut self, dt: Duration) -> usize {
        self.clock = self.clock.saturating_add(dt);
        let mut reclaimed = 0;
        while let Some((_, key)) = self.timers.pop_due(self.clock) {
            if let Some(voice) = self.voice_mut(key.id) {
                voice.timer = None;
            }
            if self.reclaim(key, ReclaimReason::Completed) {
                reclaimed += 1;
            }
        }
        reclaimed
    }

    fn status(&self) -> PoolStatus {
        let (capacity, available, active_pooled) = match self.pool.as_ref() {
            Some(pool) => (pool.capacity(), pool.available(), pool.active_count()),
            None => (0, 0, 0),
        };
        PoolStatus {
            pooling_enabled: self.config.pooling_enabled,
            capacity,
            available,
            active_pooled,
            active_unpooled: self.unpooled.len(),
            clock_ms: self.clock.as_millis() as u64,
            counters: self.counters.clone(),
        }
    }
}
