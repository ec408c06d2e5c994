use engine::{
    AnimationLibrary, AudioSink, Camera2D, InputSnapshot, Rect, Scene, SceneCommand,
    SceneDebugCommand, SceneDebugCommandResult,
};
use tracing::info;

use super::cues;
use super::entities::{update_entity, EntityHandle};
use super::interactions::dispatch_interactions;
use super::level::{LevelId, LevelTable};
use super::player::{Protagonist, ProtagonistConfig};
use super::registry::{FrameContext, LinkTable, Participant, Registry, Stage};
use super::time_period::TimePeriod;

/// One thing to draw this frame: where, which animation, which frame of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DrawItem {
    pub(crate) bounds: Rect,
    pub(crate) clip: String,
    pub(crate) frame: usize,
}

pub(crate) struct GameplayScene {
    pub(crate) levels: LevelTable,
    pub(crate) active: LevelId,
    pub(crate) period: TimePeriod,
    pub(crate) registry: Registry,
    pub(crate) links: LinkTable,
    pub(crate) player: Protagonist,
    pub(crate) camera: Camera2D,
    pub(crate) in_play: bool,
    pub(crate) ticks: u64,
    animations: Box<dyn AnimationLibrary>,
}

impl GameplayScene {
    pub(crate) fn new(
        levels: LevelTable,
        protagonist: ProtagonistConfig,
        animations: Box<dyn AnimationLibrary>,
    ) -> Self {
        let active = levels.default_level();
        let level = levels.get(active);
        let period = level.start_period;
        let player = Protagonist::new(protagonist, level.spawn);
        Self {
            levels,
            active,
            period,
            registry: Registry::default(),
            links: LinkTable::default(),
            player,
            camera: Camera2D::default(),
            in_play: false,
            ticks: 0,
            animations,
        }
    }

    /// Re-registers and resets the player and every entity of the active
    /// level. The level's starting period is restored unless `preserve_time`.
    pub(crate) fn init_level(&mut self, preserve_time: bool) {
        let level = self.levels.get_mut(self.active);
        if !preserve_time {
            self.period = level.start_period;
        }
        for entity in &mut level.entities {
            entity.reset();
        }

        self.registry.clear();
        self.registry.register_player();
        for (index, entity) in level.entities.iter().enumerate() {
            self.registry.register(EntityHandle(index), &entity.kind);
        }
        self.links.rebuild(&level.entities);
        self.player.reset(level.spawn);
        self.camera.follow(self.player.bounds().center(), level.bounds());

        info!(
            level = %level.name,
            period = self.period.as_token(),
            preserve_time,
            entities = level.entities.len(),
            links = self.links.len(),
            "level_initialized"
        );
    }

    /// Puts the player, every entity and the time period back to the level's
    /// starting state without rebuilding the role lists.
    pub(crate) fn reset_level(&mut self, audio: &mut dyn AudioSink) {
        audio.stop_cue(cues::PUSH);
        let level = self.levels.get_mut(self.active);
        for entity in &mut level.entities {
            entity.reset();
        }
        self.period = level.start_period;
        self.player.reset(level.spawn);
        info!(
            level = %level.name,
            period = self.period.as_token(),
            "level_reset"
        );
    }

    /// Points the scene at the active level's successor, if it has one. The
    /// caller initializes it.
    pub(crate) fn advance_if_possible(&mut self) -> bool {
        let Some(next) = self.levels.successor_of(self.active) else {
            return false;
        };
        info!(
            from = %self.level_name(),
            to = %self.levels.get(next).name,
            "level_advanced"
        );
        self.active = next;
        true
    }

    pub(crate) fn go_to_level(&mut self, name: &str) -> Result<(), String> {
        let id = self
            .levels
            .id_by_name(name)
            .ok_or_else(|| format!("unknown level '{name}'"))?;
        self.active = id;
        self.init_level(false);
        self.in_play = true;
        Ok(())
    }

    pub(crate) fn level_name(&self) -> &str {
        &self.levels.get(self.active).name
    }

    pub(crate) fn step(
        &mut self,
        elapsed_ms: f32,
        input: &InputSnapshot,
        audio: &mut dyn AudioSink,
    ) -> SceneCommand {
        if !self.in_play {
            return SceneCommand::None;
        }
        self.ticks = self.ticks.saturating_add(1);

        let level = self.levels.get_mut(self.active);
        let bounds = level.bounds();
        {
            let mut stage = Stage {
                period: &mut self.period,
                entities: &mut level.entities,
                registry: &self.registry,
                links: &self.links,
                bounds,
            };
            let mut frame = FrameContext {
                elapsed_ms,
                input,
                audio: &mut *audio,
                animations: self.animations.as_ref(),
            };

            for participant in self.registry.updatable() {
                match *participant {
                    Participant::Player => self.player.update(&mut stage, &mut frame),
                    Participant::Entity(handle) => {
                        update_entity(&mut stage, handle, self.player.bounds(), elapsed_ms)
                    }
                }
            }
            dispatch_interactions(&mut self.player, &mut stage, &mut frame);
        }

        if self.player.take_level_reset_request() {
            self.reset_level(audio);
        }
        self.camera.follow(self.player.bounds().center(), bounds);

        if self.player.bounds().intersects(&bounds) {
            return SceneCommand::None;
        }
        if self.advance_if_possible() {
            self.init_level(true);
            return SceneCommand::None;
        }
        info!(level = %self.level_name(), "no_successor_level");
        self.active = self.levels.default_level();
        self.init_level(false);
        self.in_play = false;
        SceneCommand::LeavePlay
    }

    /// Visible drawables inside the camera view, in registration order.
    pub(crate) fn draw_list(&self) -> Vec<DrawItem> {
        let level = self.levels.get(self.active);
        let view = self.camera.visible_rect();
        self.registry
            .drawable()
            .iter()
            .filter_map(|participant| match *participant {
                Participant::Player => Some(DrawItem {
                    bounds: self.player.bounds(),
                    clip: self.player.animation.clip.name().to_string(),
                    frame: self.player.sprite_frame(self.animations.as_ref()),
                }),
                Participant::Entity(handle) => {
                    let kind = &level.entities.get(handle.0)?.kind;
                    kind.visible(self.period).then(|| DrawItem {
                        bounds: kind.bounds(self.period),
                        clip: kind.clip_name(self.period),
                        frame: 0,
                    })
                }
            })
            .filter(|item| item.bounds.intersects(&view))
            .collect()
    }

    fn state_summary(&self) -> String {
        let player = &self.player;
        let [red, green, blue] = self.levels.get(self.active).background_tint;
        format!(
            "level={} tint=#{red:02x}{green:02x}{blue:02x} period={} in_play={} ticks={} \
             player=({:.1},{:.1}) state={:?} interactor={:?} prompt={:?} drawn={}",
            self.level_name(),
            self.period.as_token(),
            self.in_play,
            self.ticks,
            player.position.x,
            player.position.y,
            player.state,
            player.interactor.map(|handle| handle.0),
            player.prompt,
            self.draw_list().len()
        )
    }
}

impl Scene for GameplayScene {
    fn load(&mut self) {
        self.init_level(false);
        self.in_play = true;
        info!(
            protagonist = self.player.config.name,
            level = %self.level_name(),
            "gameplay_scene_loaded"
        );
    }

    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        audio: &mut dyn AudioSink,
    ) -> SceneCommand {
        self.step(fixed_dt_seconds * 1000.0, input, audio)
    }

    fn unload(&mut self) {
        self.registry.clear();
        self.in_play = false;
        info!(ticks = self.ticks, "gameplay_scene_unloaded");
    }

    fn debug_title(&self) -> Option<String> {
        Some(format!(
            "{} | {} | {:?}",
            self.level_name(),
            self.period.as_token(),
            self.player.state
        ))
    }

    fn entity_count(&self) -> usize {
        self.levels.get(self.active).entities.len()
    }

    fn execute_debug_command(
        &mut self,
        command: SceneDebugCommand,
        audio: &mut dyn AudioSink,
    ) -> SceneDebugCommandResult {
        match command {
            SceneDebugCommand::GoToLevel { name } => match self.go_to_level(&name) {
                Ok(()) => SceneDebugCommandResult::Success(format!("entered level '{name}'")),
                Err(error) => SceneDebugCommandResult::Error(error),
            },
            SceneDebugCommand::SetTimePeriod { period } => match TimePeriod::parse(&period) {
                Some(parsed) => {
                    self.period = parsed;
                    info!(period = parsed.as_token(), "time_period_forced");
                    SceneDebugCommandResult::Success(format!(
                        "time period set to {}",
                        parsed.as_token()
                    ))
                }
                None => SceneDebugCommandResult::Error(format!("unknown time period '{period}'")),
            },
            SceneDebugCommand::ReloadLevel { preserve_time } => {
                audio.stop_cue(cues::PUSH);
                self.init_level(preserve_time);
                self.in_play = true;
                SceneDebugCommandResult::Success(format!(
                    "reloaded level '{}' in {}",
                    self.level_name(),
                    self.period.as_token()
                ))
            }
            SceneDebugCommand::DumpState => {
                SceneDebugCommandResult::Success(self.state_summary())
            }
        }
    }
}
