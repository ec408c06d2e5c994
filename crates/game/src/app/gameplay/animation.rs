use engine::AnimationLibrary;

pub(crate) const LOCOMOTION_FRAME_MS: f32 = 60.0;
pub(crate) const SEQUENCE_FRAME_MS: f32 = 100.0;

/// Player animation clips. The active clip doubles as the sub-state of
/// multi-phase player states.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub(crate) enum Clip {
    #[default]
    Idle,
    Walk,
    PushStart,
    PushWalk,
    PushStill,
    StairsUp,
    StairsDown,
    WardrobeEnter,
    WardrobeLeave,
    PortraitEnter,
    PortraitLeave,
    ChairControl,
    Die,
}

impl Clip {
    pub(crate) fn name(self) -> &'static str {
        match self {
            Clip::Idle => "idle",
            Clip::Walk => "walk",
            Clip::PushStart => "push_start",
            Clip::PushWalk => "push_walk",
            Clip::PushStill => "push_still",
            Clip::StairsUp => "stairs_up",
            Clip::StairsDown => "stairs_down",
            Clip::WardrobeEnter => "wardrobe_enter",
            Clip::WardrobeLeave => "wardrobe_leave",
            Clip::PortraitEnter => "portrait_enter",
            Clip::PortraitLeave => "portrait_leave",
            Clip::ChairControl => "chair_control",
            Clip::Die => "die",
        }
    }

    pub(crate) fn frame_ms(self) -> f32 {
        match self {
            Clip::Walk
            | Clip::PushStart
            | Clip::PushWalk
            | Clip::StairsUp
            | Clip::StairsDown
            | Clip::ChairControl => LOCOMOTION_FRAME_MS,
            Clip::Idle
            | Clip::PushStill
            | Clip::WardrobeEnter
            | Clip::WardrobeLeave
            | Clip::PortraitEnter
            | Clip::PortraitLeave
            | Clip::Die => SEQUENCE_FRAME_MS,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct FrameStep {
    /// The accumulator crossed its threshold this update.
    pub(crate) advanced: bool,
    /// The advance ran past the last frame and restarted the clip.
    pub(crate) wrapped: bool,
    pub(crate) frame: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct AnimationCursor {
    pub(crate) clip: Clip,
    pub(crate) frame: usize,
    pub(crate) elapsed_ms: f32,
}

impl AnimationCursor {
    pub(crate) fn switch(&mut self, clip: Clip) {
        self.clip = clip;
        self.frame = 0;
        self.elapsed_ms = 0.0;
    }

    /// Plays `clip`, restarting it when it differs from the current one.
    /// A clip switch consumes the update; time starts counting next frame.
    pub(crate) fn play(
        &mut self,
        clip: Clip,
        frame_count: usize,
        elapsed_ms: f32,
    ) -> FrameStep {
        if clip != self.clip {
            self.switch(clip);
            return FrameStep::default();
        }
        self.elapsed_ms += elapsed_ms.max(0.0);
        if self.elapsed_ms < clip.frame_ms() {
            return FrameStep {
                frame: self.frame,
                ..FrameStep::default()
            };
        }

        self.elapsed_ms = 0.0;
        let frame_count = frame_count.max(1);
        let next = self.frame + 1;
        let wrapped = next >= frame_count;
        self.frame = if wrapped { 0 } else { next };
        FrameStep {
            advanced: true,
            wrapped,
            frame: self.frame,
        }
    }

    pub(crate) fn sprite_frame(&self, animations: &dyn AnimationLibrary, sprite_set: &str) -> usize {
        let frames = animations.frames(sprite_set, self.clip.name());
        frames
            .get(self.frame)
            .or_else(|| frames.first())
            .copied()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use engine::StaticAnimationLibrary;

    use super::*;

    #[test]
    fn frame_advances_only_on_threshold_crossing() {
        let mut cursor = AnimationCursor::default();
        cursor.switch(Clip::Walk);

        assert!(!cursor.play(Clip::Walk, 4, 30.0).advanced);
        let step = cursor.play(Clip::Walk, 4, 30.0);
        assert!(step.advanced);
        assert_eq!(step.frame, 1);
        assert_eq!(cursor.elapsed_ms, 0.0);
    }

    #[test]
    fn zero_elapsed_never_advances() {
        let mut cursor = AnimationCursor {
            clip: Clip::Walk,
            frame: 2,
            elapsed_ms: 59.0,
        };
        for _ in 0..10 {
            assert!(!cursor.play(Clip::Walk, 4, 0.0).advanced);
        }
        assert_eq!(cursor.frame, 2);
    }

    #[test]
    fn last_frame_wraps_to_zero() {
        let mut cursor = AnimationCursor {
            clip: Clip::Die,
            frame: 2,
            elapsed_ms: 0.0,
        };
        let step = cursor.play(Clip::Die, 3, SEQUENCE_FRAME_MS);
        assert!(step.wrapped);
        assert_eq!(cursor.frame, 0);
    }

    #[test]
    fn switching_clip_resets_frame_and_accumulator() {
        let mut cursor = AnimationCursor {
            clip: Clip::Walk,
            frame: 3,
            elapsed_ms: 50.0,
        };
        let step = cursor.play(Clip::PushStart, 4, 500.0);
        assert_eq!(step, FrameStep::default());
        assert_eq!(cursor.clip, Clip::PushStart);
        assert_eq!(cursor.frame, 0);
        assert_eq!(cursor.elapsed_ms, 0.0);
    }

    #[test]
    fn sprite_frame_maps_through_library_sequence() {
        let mut library = StaticAnimationLibrary::default();
        library.insert("hans", "walk", vec![8, 9, 10]);
        let cursor = AnimationCursor {
            clip: Clip::Walk,
            frame: 1,
            elapsed_ms: 0.0,
        };
        assert_eq!(cursor.sprite_frame(&library, "hans"), 9);
        assert_eq!(cursor.sprite_frame(&library, "grete"), 0);
    }
}
