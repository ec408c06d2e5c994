mod animation;
mod entities;
mod interactions;
mod level;
mod player;
mod registry;
mod scene_impl;
mod time_period;

use engine::{ContentError, LevelPack, StaticAnimationLibrary};

pub(crate) use player::ProtagonistConfig;
pub(crate) use scene_impl::GameplayScene;

use level::LevelTable;

/// Audio cue names the simulation emits. Dialogue lines use their own text.
pub(crate) mod cues {
    pub(crate) const PUSH: &str = "push";
    pub(crate) const WARDROBE: &str = "wardrobe";
    pub(crate) const PORTRAIT: &str = "portrait";
    pub(crate) const TIME_TRAVEL: &str = "time_travel";
    pub(crate) const DEATH: &str = "death";
    pub(crate) const BUTTON: &str = "button";
    pub(crate) const KEY_PICKUP: &str = "key_pickup";
    pub(crate) const DOOR_UNLOCK: &str = "door_unlock";
    pub(crate) const CHAIR_DROP: &str = "chair_drop";
    pub(crate) const WALL_BREAK: &str = "wall_break";
}

const PLAYER_CLIP_FRAMES: [(&str, usize); 13] = [
    ("idle", 4),
    ("walk", 8),
    ("push_start", 3),
    ("push_walk", 6),
    ("push_still", 2),
    ("stairs_up", 6),
    ("stairs_down", 6),
    ("wardrobe_enter", 6),
    ("wardrobe_leave", 4),
    ("portrait_enter", 6),
    ("portrait_leave", 4),
    ("chair_control", 4),
    ("die", 8),
];

/// Frame sequences for both protagonists' clips.
pub(crate) fn default_animations() -> StaticAnimationLibrary {
    let mut library = StaticAnimationLibrary::default();
    for sprite_set in [player::HANS.sprite_set, player::GRETE.sprite_set] {
        for (clip, frame_count) in PLAYER_CLIP_FRAMES {
            library.insert_sequential(sprite_set, clip, frame_count);
        }
    }
    library
}

pub(crate) fn build_scene(
    pack: &LevelPack,
    protagonist: ProtagonistConfig,
) -> Result<GameplayScene, ContentError> {
    let levels = LevelTable::from_pack(pack)?;
    Ok(GameplayScene::new(
        levels,
        protagonist,
        Box::new(default_animations()),
    ))
}
