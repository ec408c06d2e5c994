use std::collections::HashMap;

/// Maps an animation name to its ordered frame-index sequence. Pixel lookup
/// stays with the renderer; the simulation only selects names and indices.
pub trait AnimationLibrary {
    fn frames(&self, sprite_set: &str, clip: &str) -> &[usize];

    fn frame_count(&self, sprite_set: &str, clip: &str) -> usize {
        self.frames(sprite_set, clip).len()
    }
}

const SINGLE_FRAME: [usize; 1] = [0];

#[derive(Debug, Default, Clone)]
pub struct StaticAnimationLibrary {
    clips: HashMap<(String, String), Vec<usize>>,
}

impl StaticAnimationLibrary {
    pub fn insert(&mut self, sprite_set: &str, clip: &str, frames: Vec<usize>) {
        self.clips
            .insert((sprite_set.to_string(), clip.to_string()), frames);
    }

    /// Registers `clip` with frames `0..frame_count`.
    pub fn insert_sequential(&mut self, sprite_set: &str, clip: &str, frame_count: usize) {
        self.insert(sprite_set, clip, (0..frame_count).collect());
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }
}

impl AnimationLibrary for StaticAnimationLibrary {
    /// Unknown or empty clips read as a single still frame.
    fn frames(&self, sprite_set: &str, clip: &str) -> &[usize] {
        self.clips
            .get(&(sprite_set.to_string(), clip.to_string()))
            .filter(|frames| !frames.is_empty())
            .map(Vec::as_slice)
            .unwrap_or(&SINGLE_FRAME)
    }
}
