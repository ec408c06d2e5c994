use engine::{AnimationLibrary, AudioSink, CueMode, InputAction, InputSnapshot, Rect, Vec2};
use tracing::{debug, info};

use super::animation::{AnimationCursor, Clip, FrameStep};
use super::cues;
use super::entities::{ChairState, EntityHandle, EntityKind, Facing, StairsEnd};
use super::registry::{FrameContext, Stage};
use super::time_period::TimePeriod;

pub(crate) const PLAYER_WIDTH: i32 = 24;
pub(crate) const PLAYER_HEIGHT: i32 = 48;
pub(crate) const WALK_STEP_PX: f32 = 6.0;
pub(crate) const PUSH_STEP_PX: f32 = 3.0;
pub(crate) const STAIRS_STEP_PX: f32 = 3.0;
pub(crate) const CHAIR_STEP_PX: f32 = 3.0;
pub(crate) const GRAVITY_STEP_PX: f32 = 4.0;
pub(crate) const WARDROBE_EXIT_OFFSET_X: f32 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ControlScheme {
    pub(crate) left: InputAction,
    pub(crate) right: InputAction,
    pub(crate) up: InputAction,
    pub(crate) down: InputAction,
    pub(crate) action: InputAction,
    pub(crate) modifier: InputAction,
}

impl ControlScheme {
    pub(crate) const PRIMARY: ControlScheme = ControlScheme {
        left: InputAction::MoveLeft,
        right: InputAction::MoveRight,
        up: InputAction::MoveUp,
        down: InputAction::MoveDown,
        action: InputAction::Action,
        modifier: InputAction::Modifier,
    };

    pub(crate) const ALTERNATE: ControlScheme = ControlScheme {
        left: InputAction::AltMoveLeft,
        right: InputAction::AltMoveRight,
        up: InputAction::AltMoveUp,
        down: InputAction::AltMoveDown,
        action: InputAction::AltAction,
        modifier: InputAction::AltModifier,
    };
}

/// A playable character: which sprite set it animates with and which
/// bindings drive it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ProtagonistConfig {
    pub(crate) name: &'static str,
    pub(crate) sprite_set: &'static str,
    pub(crate) controls: ControlScheme,
}

pub(crate) const HANS: ProtagonistConfig = ProtagonistConfig {
    name: "hans",
    sprite_set: "hans",
    controls: ControlScheme::PRIMARY,
};

pub(crate) const GRETE: ProtagonistConfig = ProtagonistConfig {
    name: "grete",
    sprite_set: "grete",
    controls: ControlScheme::ALTERNATE,
};

impl ProtagonistConfig {
    pub(crate) fn by_name(name: &str) -> Option<ProtagonistConfig> {
        [HANS, GRETE]
            .into_iter()
            .find(|config| config.name.eq_ignore_ascii_case(name.trim()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Intent {
    horizontal: Option<Facing>,
    up: bool,
    down: bool,
    action: bool,
    modifier: bool,
}

impl Intent {
    fn read(input: &InputSnapshot, controls: &ControlScheme) -> Intent {
        let horizontal = match (input.is_down(controls.left), input.is_down(controls.right)) {
            (true, false) => Some(Facing::Left),
            (false, true) => Some(Facing::Right),
            _ => None,
        };
        Intent {
            horizontal,
            up: input.is_down(controls.up),
            down: input.is_down(controls.down),
            action: input.is_down(controls.action),
            modifier: input.is_down(controls.modifier),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub(crate) enum PlayerState {
    #[default]
    Idle,
    Walk,
    StairsLeft,
    StairsRight,
    PushWalk,
    PushingStill,
    Teleport,
    TimeTravel,
    ControllingChair,
    Die,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PromptKind {
    Push,
    Enter,
    TimeTravel,
    Climb,
}

/// Action bubble shown over the player. A negated prompt is displayed but
/// the action is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Prompt {
    pub(crate) kind: PromptKind,
    pub(crate) negated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct StairsClimb {
    pub(crate) stairs: EntityHandle,
    pub(crate) horizontal: Facing,
    pub(crate) rising: bool,
    pub(crate) target_feet_y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct TimeTravelPlan {
    pub(crate) destination: TimePeriod,
    pub(crate) moved_to: Vec2,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Protagonist {
    pub(crate) config: ProtagonistConfig,
    pub(crate) spawn: Vec2,
    pub(crate) position: Vec2,
    pub(crate) facing: Facing,
    pub(crate) state: PlayerState,
    pub(crate) interactor: Option<EntityHandle>,
    pub(crate) prompt: Option<Prompt>,
    pub(crate) nearest_chair: Option<EntityHandle>,
    pub(crate) controlled_chair: Option<EntityHandle>,
    pub(crate) animation: AnimationCursor,
    pub(crate) climb: Option<StairsClimb>,
    pub(crate) teleport_target: Option<Vec2>,
    pub(crate) travel: Option<TimeTravelPlan>,
    level_reset_requested: bool,
}

impl Protagonist {
    pub(crate) fn new(config: ProtagonistConfig, spawn: Vec2) -> Self {
        Self {
            config,
            spawn,
            position: spawn,
            facing: Facing::Right,
            state: PlayerState::Idle,
            interactor: None,
            prompt: None,
            nearest_chair: None,
            controlled_chair: None,
            animation: AnimationCursor::default(),
            climb: None,
            teleport_target: None,
            travel: None,
            level_reset_requested: false,
        }
    }

    pub(crate) fn reset(&mut self, spawn: Vec2) {
        *self = Protagonist::new(self.config, spawn);
    }

    pub(crate) fn bounds(&self) -> Rect {
        Rect::from_position(self.position, PLAYER_WIDTH, PLAYER_HEIGHT)
    }

    pub(crate) fn feet_y(&self) -> f32 {
        self.position.y + PLAYER_HEIGHT as f32
    }

    pub(crate) fn on_stairs(&self) -> bool {
        matches!(self.state, PlayerState::StairsLeft | PlayerState::StairsRight)
    }

    pub(crate) fn offer(&mut self, handle: EntityHandle, kind: PromptKind, negated: bool) {
        self.interactor = Some(handle);
        self.prompt = Some(Prompt { kind, negated });
    }

    pub(crate) fn prompt_negated(&self) -> bool {
        self.prompt.is_some_and(|prompt| prompt.negated)
    }

    pub(crate) fn take_level_reset_request(&mut self) -> bool {
        std::mem::take(&mut self.level_reset_requested)
    }

    pub(crate) fn sprite_frame(&self, animations: &dyn AnimationLibrary) -> usize {
        self.animation.sprite_frame(animations, self.config.sprite_set)
    }

    /// Furniture the player is set up to push, and the side it is on.
    pub(crate) fn push_target(&self, stage: &Stage<'_>) -> Option<(EntityHandle, Facing)> {
        let handle = self.interactor?;
        if self.prompt?.kind != PromptKind::Push {
            return None;
        }
        let EntityKind::Furniture(furniture) = stage.kind(handle)? else {
            return None;
        };
        let side = Facing::toward(self.bounds(), furniture.bounds(stage.period()));
        Some((handle, side))
    }

    pub(crate) fn is_mid_push(&self, stage: &Stage<'_>) -> bool {
        matches!(self.state, PlayerState::PushWalk | PlayerState::PushingStill)
            && self
                .interactor
                .and_then(|handle| stage.kind(handle))
                .is_some_and(|kind| matches!(kind, EntityKind::Furniture(_)))
    }

    pub(crate) fn set_state(&mut self, next: PlayerState, audio: &mut dyn AudioSink) {
        if next == self.state {
            return;
        }
        if self.state == PlayerState::PushWalk {
            audio.stop_cue(cues::PUSH);
        }
        match next {
            PlayerState::PushWalk => {
                audio.play_cue(cues::PUSH, CueMode::Looped);
                self.animation.switch(Clip::PushStart);
            }
            PlayerState::Teleport => self.animation.switch(Clip::WardrobeEnter),
            PlayerState::TimeTravel => self.animation.switch(Clip::PortraitEnter),
            PlayerState::Die => self.animation.switch(Clip::Die),
            _ => {}
        }
        debug!(from = ?self.state, to = ?next, "player_state_changed");
        self.state = next;
    }

    pub(crate) fn die(&mut self, stage: &mut Stage<'_>, audio: &mut dyn AudioSink) {
        self.release_chair(stage);
        self.climb = None;
        self.teleport_target = None;
        self.travel = None;
        self.set_state(PlayerState::Die, audio);
        audio.play_cue(cues::DEATH, CueMode::Once);
        info!(x = self.position.x, y = self.position.y, "player_died");
    }

    /// Ends a climb on `stairs` once the feet reach the far end.
    pub(crate) fn finish_climb_if_arrived(
        &mut self,
        stairs: EntityHandle,
        audio: &mut dyn AudioSink,
    ) -> bool {
        let Some(climb) = self.climb.filter(|climb| climb.stairs == stairs) else {
            return false;
        };
        let feet = self.feet_y();
        let arrived = if climb.rising {
            feet <= climb.target_feet_y
        } else {
            feet >= climb.target_feet_y
        };
        if !arrived {
            return false;
        }
        self.position.y = climb.target_feet_y - PLAYER_HEIGHT as f32;
        self.climb = None;
        self.set_state(PlayerState::Walk, audio);
        true
    }

    pub(crate) fn update(&mut self, stage: &mut Stage<'_>, frame: &mut FrameContext<'_>) {
        let intent = Intent::read(frame.input, &self.config.controls);
        match self.state {
            PlayerState::Die => self.update_dying(frame),
            PlayerState::Teleport => self.update_teleport(frame),
            PlayerState::TimeTravel => self.update_time_travel(stage, frame),
            PlayerState::ControllingChair => self.update_chair_control(intent, stage, frame),
            PlayerState::StairsLeft | PlayerState::StairsRight => self.update_climb(frame),
            PlayerState::PushWalk => self.update_push_walk(intent, stage, frame),
            PlayerState::PushingStill => self.update_pushing_still(intent, stage, frame),
            PlayerState::Idle | PlayerState::Walk => self.update_free(intent, stage, frame),
        }

        if frame.elapsed_ms > 0.0 && self.affected_by_gravity() {
            self.position.y += GRAVITY_STEP_PX;
        }
    }

    fn affected_by_gravity(&self) -> bool {
        matches!(
            self.state,
            PlayerState::Idle
                | PlayerState::Walk
                | PlayerState::PushWalk
                | PlayerState::PushingStill
                | PlayerState::ControllingChair
                | PlayerState::Die
        )
    }

    fn advance(&mut self, clip: Clip, frame: &FrameContext<'_>) -> FrameStep {
        let frame_count = frame
            .animations
            .frame_count(self.config.sprite_set, clip.name());
        self.animation.play(clip, frame_count, frame.elapsed_ms)
    }

    fn update_free(&mut self, intent: Intent, stage: &mut Stage<'_>, frame: &mut FrameContext<'_>) {
        if intent.action && self.try_use_prompt(stage, frame) {
            return;
        }
        if intent.modifier && self.try_take_chair(stage, frame) {
            return;
        }
        let Some(direction) = intent.horizontal else {
            self.set_state(PlayerState::Idle, frame.audio);
            self.advance(Clip::Idle, frame);
            return;
        };

        if let Some((_, side)) = self.push_target(stage) {
            if side == direction {
                self.facing = direction;
                let next = if self.prompt_negated() {
                    PlayerState::PushingStill
                } else {
                    PlayerState::PushWalk
                };
                self.set_state(next, frame.audio);
                return;
            }
        }

        self.facing = direction;
        self.set_state(PlayerState::Walk, frame.audio);
        self.walk(stage, frame);
    }

    fn walk(&mut self, stage: &Stage<'_>, frame: &mut FrameContext<'_>) {
        let step = self.advance(Clip::Walk, frame);
        if !step.advanced {
            return;
        }
        let dx = self.facing.sign() * WALK_STEP_PX;
        let next = Rect::from_position(
            self.position + Vec2::new(dx, 0.0),
            PLAYER_WIDTH,
            PLAYER_HEIGHT,
        );
        if stage.colliding_with_solid(next, None, None) {
            self.set_state(PlayerState::PushingStill, frame.audio);
            return;
        }
        self.position.x += dx;
    }

    fn try_use_prompt(&mut self, stage: &mut Stage<'_>, frame: &mut FrameContext<'_>) -> bool {
        let (Some(handle), Some(prompt)) = (self.interactor, self.prompt) else {
            return false;
        };
        if prompt.negated {
            return false;
        }
        match prompt.kind {
            PromptKind::Enter => self.enter_wardrobe(handle, stage, frame),
            PromptKind::TimeTravel => self.enter_portrait(handle, stage, frame),
            PromptKind::Climb => self.start_climb(handle, stage, frame),
            PromptKind::Push => false,
        }
    }

    fn enter_wardrobe(
        &mut self,
        handle: EntityHandle,
        stage: &Stage<'_>,
        frame: &mut FrameContext<'_>,
    ) -> bool {
        let Some(EntityKind::Furniture(furniture)) = stage.kind(handle) else {
            return false;
        };
        let Some(target) = furniture
            .link
            .as_deref()
            .and_then(|name| stage.resolve_link(name))
        else {
            return false;
        };
        let Some(exit) = stage.bounds_of(target) else {
            return false;
        };

        self.teleport_target = Some(Vec2::new(
            exit.left() as f32 + WARDROBE_EXIT_OFFSET_X,
            (exit.bottom() - PLAYER_HEIGHT) as f32,
        ));
        self.set_state(PlayerState::Teleport, frame.audio);
        frame.audio.play_cue(cues::WARDROBE, CueMode::Once);
        info!(from = handle.0, to = target.0, "player_entered_wardrobe");
        true
    }

    fn enter_portrait(
        &mut self,
        handle: EntityHandle,
        stage: &Stage<'_>,
        frame: &mut FrameContext<'_>,
    ) -> bool {
        let Some(EntityKind::Portrait(portrait)) = stage.kind(handle) else {
            return false;
        };
        if !portrait.usable_in(stage.period()) {
            return false;
        }
        self.travel = Some(TimeTravelPlan {
            destination: portrait.destination,
            moved_to: portrait.moved_to,
        });
        self.set_state(PlayerState::TimeTravel, frame.audio);
        frame.audio.play_cue(cues::PORTRAIT, CueMode::Once);
        true
    }

    fn start_climb(
        &mut self,
        handle: EntityHandle,
        stage: &Stage<'_>,
        frame: &mut FrameContext<'_>,
    ) -> bool {
        let Some(EntityKind::Stairs(stairs)) = stage.kind(handle) else {
            return false;
        };
        let Some(end) = stairs.aligned_end(self.bounds()) else {
            return false;
        };
        let (horizontal, rising, far_end) = match end {
            StairsEnd::Bottom => (stairs.ascends, true, StairsEnd::Top),
            StairsEnd::Top => (stairs.ascends.opposite(), false, StairsEnd::Bottom),
        };

        self.position.y = stairs.anchor(end).y - PLAYER_HEIGHT as f32;
        self.facing = horizontal;
        self.climb = Some(StairsClimb {
            stairs: handle,
            horizontal,
            rising,
            target_feet_y: stairs.anchor(far_end).y,
        });
        let next = match horizontal {
            Facing::Left => PlayerState::StairsLeft,
            Facing::Right => PlayerState::StairsRight,
        };
        self.set_state(next, frame.audio);
        true
    }

    fn update_climb(&mut self, frame: &mut FrameContext<'_>) {
        let Some(climb) = self.climb else {
            self.set_state(PlayerState::Walk, frame.audio);
            return;
        };
        let clip = if climb.rising {
            Clip::StairsUp
        } else {
            Clip::StairsDown
        };
        if !self.advance(clip, frame).advanced {
            return;
        }
        let dy = if climb.rising {
            -STAIRS_STEP_PX
        } else {
            STAIRS_STEP_PX
        };
        self.position += Vec2::new(climb.horizontal.sign() * STAIRS_STEP_PX, dy);
    }

    /// Stays in `Die` until the scene resets the level, so no rule can kill
    /// the player twice in the frame the clip ends.
    fn update_dying(&mut self, frame: &mut FrameContext<'_>) {
        if self.advance(Clip::Die, frame).wrapped {
            self.level_reset_requested = true;
        }
    }

    fn update_teleport(&mut self, frame: &mut FrameContext<'_>) {
        let clip = match self.animation.clip {
            Clip::WardrobeLeave => Clip::WardrobeLeave,
            _ => Clip::WardrobeEnter,
        };
        let frame_count = frame
            .animations
            .frame_count(self.config.sprite_set, clip.name());
        let step = self.advance(clip, frame);

        if clip == Clip::WardrobeLeave {
            if step.wrapped {
                self.set_state(PlayerState::Idle, frame.audio);
            }
            return;
        }

        let penultimate = frame_count.saturating_sub(2);
        if step.advanced && (step.frame == penultimate || step.wrapped) {
            if let Some(target) = self.teleport_target.take() {
                self.position = target;
                debug!(x = target.x, y = target.y, "player_teleported");
            }
        }
        if step.wrapped {
            self.animation.switch(Clip::WardrobeLeave);
        }
    }

    fn update_time_travel(&mut self, stage: &mut Stage<'_>, frame: &mut FrameContext<'_>) {
        let clip = match self.animation.clip {
            Clip::PortraitLeave => Clip::PortraitLeave,
            _ => Clip::PortraitEnter,
        };
        let step = self.advance(clip, frame);
        if !step.wrapped {
            return;
        }
        if clip == Clip::PortraitLeave {
            self.set_state(PlayerState::Idle, frame.audio);
            return;
        }

        if let Some(plan) = self.travel.take() {
            let from = stage.period();
            let to = if from == TimePeriod::Present {
                plan.destination
            } else {
                TimePeriod::Present
            };
            stage.set_period(to);
            if !plan.moved_to.is_zero() {
                self.position = plan.moved_to;
            }
            frame.audio.play_cue(cues::TIME_TRAVEL, CueMode::Once);
            info!(
                from = from.as_token(),
                to = to.as_token(),
                "time_period_changed"
            );
        }
        self.animation.switch(Clip::PortraitLeave);
    }

    fn try_take_chair(&mut self, stage: &mut Stage<'_>, frame: &mut FrameContext<'_>) -> bool {
        let Some(handle) = self.nearest_chair else {
            return false;
        };
        let Some(EntityKind::Chair(chair)) = stage.kind_mut(handle) else {
            return false;
        };
        if chair.state == ChairState::Moving {
            return false;
        }
        chair.state = ChairState::Moving;
        self.controlled_chair = Some(handle);
        self.set_state(PlayerState::ControllingChair, frame.audio);
        debug!(chair = handle.0, "chair_taken");
        true
    }

    fn release_chair(&mut self, stage: &mut Stage<'_>) {
        let Some(handle) = self.controlled_chair.take() else {
            return;
        };
        if let Some(EntityKind::Chair(chair)) = stage.kind_mut(handle) {
            chair.state = ChairState::Falling;
        }
    }

    fn update_chair_control(
        &mut self,
        intent: Intent,
        stage: &mut Stage<'_>,
        frame: &mut FrameContext<'_>,
    ) {
        let held = self.controlled_chair.filter(|handle| {
            matches!(
                stage.kind(*handle),
                Some(EntityKind::Chair(chair)) if chair.state == ChairState::Moving
            )
        });
        let Some(handle) = held.filter(|_| intent.modifier) else {
            self.release_chair(stage);
            self.set_state(PlayerState::Idle, frame.audio);
            return;
        };

        if !self.advance(Clip::ChairControl, frame).advanced {
            return;
        }
        let mut delta = Vec2::ZERO;
        if let Some(direction) = intent.horizontal {
            delta.x = direction.sign() * CHAIR_STEP_PX;
        }
        if intent.up {
            delta.y -= CHAIR_STEP_PX;
        }
        if intent.down {
            delta.y += CHAIR_STEP_PX;
        }
        if delta.is_zero() {
            return;
        }
        let Some(current) = stage.bounds_of(handle) else {
            return;
        };
        let next = current.offset(delta.x as i32, delta.y as i32);
        let player = self.bounds();
        let blocking_player = (!current.intersects(&player)).then_some(player);
        if stage.colliding_with_solid(next, blocking_player, Some(handle)) {
            return;
        }
        let period = stage.period();
        if let Some(EntityKind::Chair(chair)) = stage.kind_mut(handle) {
            chair.positions.move_by(period, delta);
        }
    }

    fn update_push_walk(
        &mut self,
        intent: Intent,
        stage: &mut Stage<'_>,
        frame: &mut FrameContext<'_>,
    ) {
        if intent.modifier && self.try_take_chair(stage, frame) {
            return;
        }
        let Some((handle, side)) = self.push_target(stage) else {
            self.set_state(PlayerState::Idle, frame.audio);
            return;
        };
        // Turning around mid-push stops the push instead.
        if intent.horizontal != Some(side) {
            self.set_state(PlayerState::PushingStill, frame.audio);
            return;
        }

        let clip = match self.animation.clip {
            Clip::PushWalk => Clip::PushWalk,
            _ => Clip::PushStart,
        };
        let step = self.advance(clip, frame);
        if clip == Clip::PushStart {
            if step.wrapped {
                self.animation.switch(Clip::PushWalk);
            }
            return;
        }
        if step.advanced {
            self.push_step(handle, side, stage, frame);
        }
    }

    fn push_step(
        &mut self,
        handle: EntityHandle,
        side: Facing,
        stage: &mut Stage<'_>,
        frame: &mut FrameContext<'_>,
    ) {
        let delta = Vec2::new(side.sign() * PUSH_STEP_PX, 0.0);
        self.position += delta;
        let Some(current) = stage.bounds_of(handle) else {
            self.position -= delta;
            return;
        };
        if stage.colliding_with_solid(current.offset(delta.x as i32, 0), None, Some(handle)) {
            self.position -= delta;
            self.set_state(PlayerState::PushingStill, frame.audio);
            debug!(furniture = handle.0, "push_blocked");
            return;
        }
        let period = stage.period();
        if let Some(EntityKind::Furniture(furniture)) = stage.kind_mut(handle) {
            furniture.positions.move_by(period, delta);
        }
    }

    fn update_pushing_still(
        &mut self,
        intent: Intent,
        stage: &mut Stage<'_>,
        frame: &mut FrameContext<'_>,
    ) {
        if intent.modifier && self.try_take_chair(stage, frame) {
            return;
        }
        match (self.push_target(stage), intent.horizontal) {
            (Some((_, side)), Some(direction)) if direction == side => {
                if !self.prompt_negated() {
                    self.set_state(PlayerState::PushWalk, frame.audio);
                    return;
                }
            }
            // Leave the push before turning around.
            (Some(_), Some(_)) => {
                self.set_state(PlayerState::Idle, frame.audio);
                return;
            }
            (None, Some(direction)) => {
                let ahead = self
                    .bounds()
                    .offset((direction.sign() * WALK_STEP_PX) as i32, 0);
                if direction != self.facing || !stage.colliding_with_solid(ahead, None, None) {
                    self.facing = direction;
                    self.set_state(PlayerState::Walk, frame.audio);
                    self.walk(stage, frame);
                    return;
                }
            }
            (None, None) => {
                self.set_state(PlayerState::Idle, frame.audio);
                self.advance(Clip::Idle, frame);
                return;
            }
            (Some(_), None) => {}
        }
        self.advance(Clip::PushStill, frame);
    }
}
