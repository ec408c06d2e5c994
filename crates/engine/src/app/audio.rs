use std::collections::HashSet;

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CueMode {
    Once,
    Looped,
}

/// Fire-and-forget audio. Callers never observe completion.
pub trait AudioSink {
    fn play_cue(&mut self, name: &str, mode: CueMode);
    fn stop_cue(&mut self, name: &str);
}

/// Tracks looped cues that are currently running so a second request is
/// skipped instead of layering another instance.
#[derive(Debug, Default, Clone)]
pub struct CueLedger {
    looping: HashSet<String>,
}

impl CueLedger {
    /// Returns false when the cue should be skipped.
    pub fn begin(&mut self, name: &str, mode: CueMode) -> bool {
        match mode {
            CueMode::Once => true,
            CueMode::Looped => self.looping.insert(name.to_string()),
        }
    }

    pub fn end(&mut self, name: &str) -> bool {
        self.looping.remove(name)
    }

    pub fn is_looping(&self, name: &str) -> bool {
        self.looping.contains(name)
    }
}

/// Sink for headless runs: every accepted cue becomes a debug event.
#[derive(Debug, Default)]
pub struct TracingAudioSink {
    ledger: CueLedger,
    played: u64,
}

impl TracingAudioSink {
    pub fn played_count(&self) -> u64 {
        self.played
    }
}

impl AudioSink for TracingAudioSink {
    fn play_cue(&mut self, name: &str, mode: CueMode) {
        if !self.ledger.begin(name, mode) {
            return;
        }
        self.played = self.played.saturating_add(1);
        debug!(cue = name, ?mode, "audio_cue_play");
    }

    fn stop_cue(&mut self, name: &str) {
        if self.ledger.end(name) {
            debug!(cue = name, "audio_cue_stop");
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioEvent {
    Play { name: String, mode: CueMode },
    Stop { name: String },
}

#[derive(Debug, Default)]
pub struct RecordingAudioSink {
    ledger: CueLedger,
    events: Vec<AudioEvent>,
}

impl RecordingAudioSink {
    pub fn events(&self) -> &[AudioEvent] {
        &self.events
    }

    pub fn play_count(&self, name: &str) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, AudioEvent::Play { name: played, .. } if played == name))
            .count()
    }

    pub fn is_looping(&self, name: &str) -> bool {
        self.ledger.is_looping(name)
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl AudioSink for RecordingAudioSink {
    fn play_cue(&mut self, name: &str, mode: CueMode) {
        if !self.ledger.begin(name, mode) {
            return;
        }
        self.events.push(AudioEvent::Play {
            name: name.to_string(),
            mode,
        });
    }

    fn stop_cue(&mut self, name: &str) {
        if self.ledger.end(name) {
            self.events.push(AudioEvent::Stop {
                name: name.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looped_cue_is_skipped_while_playing() {
        let mut sink = RecordingAudioSink::default();
        sink.play_cue("push", CueMode::Looped);
        sink.play_cue("push", CueMode::Looped);
        assert_eq!(sink.play_count("push"), 1);

        sink.stop_cue("push");
        sink.play_cue("push", CueMode::Looped);
        assert_eq!(sink.play_count("push"), 2);
    }

    #[test]
    fn one_shot_cues_always_play() {
        let mut sink = RecordingAudioSink::default();
        sink.play_cue("button", CueMode::Once);
        sink.play_cue("button", CueMode::Once);
        assert_eq!(sink.play_count("button"), 2);
    }

    #[test]
    fn stopping_an_idle_cue_records_nothing() {
        let mut sink = RecordingAudioSink::default();
        sink.stop_cue("push");
        assert!(sink.events().is_empty());
    }

    #[test]
    fn tracing_sink_counts_accepted_cues() {
        let mut sink = TracingAudioSink::default();
        sink.play_cue("push", CueMode::Looped);
        sink.play_cue("push", CueMode::Looped);
        sink.play_cue("death", CueMode::Once);
        assert_eq!(sink.played_count(), 2);
    }
}
