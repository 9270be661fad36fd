//! Fixed set of reusable voices.
//!
//! Voices are allocated once and never freed; idle ones wait in a FIFO queue.
//! A per-voice flag guards the queue against double insertion, so a voice
//! reclaimed twice is still queued exactly once.

use std::collections::VecDeque;

use crate::voice::{Voice, VoiceId, VoiceKey, VoiceOrigin, VoiceState};

#[derive(Debug)]
pub struct VoicePool {
    voices: Vec<Voice>,
    free: VecDeque<VoiceId>,
    queued: Vec<bool>,
}

impl VoicePool {
    /// Allocate `capacity` idle voices (at least one), ids `0..capacity`.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let voices: Vec<Voice> = (0..capacity)
            .map(|i| Voice::new(VoiceId(i as u32), VoiceOrigin::Pooled))
            .collect();
        let free = voices.iter().map(Voice::id).collect();
        Self {
            voices,
            free,
            queued: vec![true; capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.voices.len()
    }

    /// Idle voices waiting in the queue.
    pub fn available(&self) -> usize {
        self.free.len()
    }

    pub fn active_count(&self) -> usize {
        self.voices.iter().filter(|v| v.is_active()).count()
    }

    /// Whether `id` names a voice owned by this pool.
    pub fn owns(&self, id: VoiceId) -> bool {
        (id.0 as usize) < self.voices.len()
    }

    /// Take the longest-idle voice out of the queue.
    pub fn acquire(&mut self) -> Option<VoiceId> {
        let id = self.free.pop_front()?;
        self.queued[id.0 as usize] = false;
        Some(id)
    }

    /// Put an idle voice back in the queue.
    ///
    /// Returns `false` (and changes nothing) unless the voice is idle and not
    /// yet queued. Disposed voices never come back.
    pub fn release(&mut self, id: VoiceId) -> bool {
        let idx = id.0 as usize;
        let Some(voice) = self.voices.get(idx) else {
            return false;
        };
        if voice.state() != VoiceState::Idle || self.queued[idx] {
            return false;
        }
        self.queued[idx] = true;
        self.free.push_back(id);
        true
    }

    pub fn is_queued(&self, id: VoiceId) -> bool {
        self.queued.get(id.0 as usize).copied().unwrap_or(false)
    }

    pub fn get(&self, id: VoiceId) -> Option<&Voice> {
        self.voices.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: VoiceId) -> Option<&mut Voice> {
        self.voices.get_mut(id.0 as usize)
    }

    /// Keys of every voice currently playing.
    pub fn active_keys(&self) -> Vec<VoiceKey> {
        self.voices
            .iter()
            .filter(|v| v.is_active())
            .map(Voice::key)
            .collect()
    }

    /// The playing voice that started first.
    pub fn oldest_active(&self) -> Option<VoiceKey> {
        self.voices
            .iter()
            .filter(|v| v.is_active())
            .min_by_key(|v| v.start_seq())
            .map(Voice::key)
    }

    pub fn voices(&self) -> impl Iterator<Item = &Voice> {
        self.voices.iter()
    }

    /// Retire every voice for good. Returns the keys they held beforehand.
    pub(crate) fn dispose_all(&mut self) -> Vec<VoiceKey> {
        self.free.clear();
        self.queued.iter_mut().for_each(|q| *q = false);
        self.voices
            .iter_mut()
            .map(|voice| {
                let key = voice.key();
                voice.dispose();
                key
            })
            .collect()
    }
}
