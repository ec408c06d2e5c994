use engine::{Rect, Vec2};
use tracing::debug;

use super::registry::Stage;
use super::time_period::{PeriodPositions, PeriodSlots, TimePeriod, PERIOD_COUNT};

pub(crate) const CHAIR_FALL_STEP_PX: f32 = 4.0;
pub(crate) const FOE_DEFAULT_SPEED_PX_PER_SECOND: f32 = 40.0;
pub(crate) const FOE_DEFAULT_PATROL_PX: f32 = 64.0;
pub(crate) const FOE_SEEK_RANGE_PX: f32 = 96.0;
pub(crate) const FOE_RECOVER_MS: f32 = 600.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub(crate) enum Facing {
    Left,
    #[default]
    Right,
}

impl Facing {
    pub(crate) fn sign(self) -> f32 {
        match self {
            Facing::Left => -1.0,
            Facing::Right => 1.0,
        }
    }

    pub(crate) fn opposite(self) -> Facing {
        match self {
            Facing::Left => Facing::Right,
            Facing::Right => Facing::Left,
        }
    }

    /// Side of `from` on which `to` lies, by horizontal center.
    pub(crate) fn toward(from: Rect, to: Rect) -> Facing {
        if to.center().x >= from.center().x {
            Facing::Right
        } else {
            Facing::Left
        }
    }
}

/// Index of an entity in its level's entity list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct EntityHandle(pub(crate) usize);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Capabilities {
    pub(crate) updatable: bool,
    pub(crate) drawable: bool,
    pub(crate) collideable: bool,
    pub(crate) resettable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LevelEntity {
    pub(crate) name: Option<String>,
    pub(crate) kind: EntityKind,
}

impl LevelEntity {
    pub(crate) fn reset(&mut self) {
        if self.kind.capabilities().resettable {
            self.kind.reset();
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum EntityKind {
    Floor(Floor),
    Wall(WallSegment),
    Furniture(Furniture),
    Chair(Chair),
    Door(Door),
    Portrait(Portrait),
    Stairs(Stairs),
    Foe(Foe),
    PressurePad(PressurePad),
    Key(KeyPickup),
    Dialogue(DialogueTrigger),
}

impl EntityKind {
    pub(crate) fn token(&self) -> &'static str {
        match self {
            EntityKind::Floor(_) => "floor",
            EntityKind::Wall(_) => "wall",
            EntityKind::Furniture(_) => "furniture",
            EntityKind::Chair(_) => "chair",
            EntityKind::Door(_) => "door",
            EntityKind::Portrait(_) => "portrait",
            EntityKind::Stairs(_) => "stairs",
            EntityKind::Foe(_) => "foe",
            EntityKind::PressurePad(_) => "pressure_pad",
            EntityKind::Key(_) => "key",
            EntityKind::Dialogue(_) => "dialogue",
        }
    }

    pub(crate) fn capabilities(&self) -> Capabilities {
        let base = Capabilities {
            drawable: true,
            collideable: true,
            ..Capabilities::default()
        };
        match self {
            EntityKind::Floor(_) | EntityKind::Portrait(_) | EntityKind::Stairs(_) => base,
            EntityKind::Wall(_)
            | EntityKind::Door(_)
            | EntityKind::PressurePad(_)
            | EntityKind::Key(_)
            | EntityKind::Furniture(_) => Capabilities {
                resettable: true,
                ..base
            },
            EntityKind::Chair(_) | EntityKind::Foe(_) => Capabilities {
                updatable: true,
                resettable: true,
                ..base
            },
            EntityKind::Dialogue(_) => Capabilities {
                drawable: false,
                resettable: true,
                ..base
            },
        }
    }

    pub(crate) fn bounds(&self, period: TimePeriod) -> Rect {
        match self {
            EntityKind::Floor(floor) => floor.bounds,
            EntityKind::Wall(wall) => wall.bounds,
            EntityKind::Furniture(furniture) => furniture.bounds(period),
            EntityKind::Chair(chair) => chair.bounds(period),
            EntityKind::Door(door) => door.bounds,
            EntityKind::Portrait(portrait) => portrait.bounds,
            EntityKind::Stairs(stairs) => stairs.bounds,
            EntityKind::Foe(foe) => foe.bounds(),
            EntityKind::PressurePad(pad) => pad.bounds,
            EntityKind::Key(key) => key.bounds,
            EntityKind::Dialogue(dialogue) => dialogue.bounds,
        }
    }

    /// Whether this entity blocks movement in `period`. Stairs report solid
    /// but solidity queries skip them.
    pub(crate) fn solid(&self, period: TimePeriod) -> bool {
        match self {
            EntityKind::Floor(_) | EntityKind::Stairs(_) => true,
            EntityKind::Wall(wall) => !wall.is_broken(period),
            EntityKind::Door(door) => !door.is_open(),
            EntityKind::Furniture(_)
            | EntityKind::Chair(_)
            | EntityKind::Portrait(_)
            | EntityKind::Foe(_)
            | EntityKind::PressurePad(_)
            | EntityKind::Key(_)
            | EntityKind::Dialogue(_) => false,
        }
    }

    pub(crate) fn visible(&self, period: TimePeriod) -> bool {
        match self {
            EntityKind::Foe(_) => period == TimePeriod::Present,
            EntityKind::Key(key) => !key.picked_up && key.available_in(period),
            _ => self.capabilities().drawable,
        }
    }

    pub(crate) fn clip_name(&self, period: TimePeriod) -> String {
        match self {
            EntityKind::Wall(wall) if wall.is_broken(period) => "wall_rubble".to_string(),
            EntityKind::Door(door) => {
                let phase = if door.is_open() { "open" } else { "closed" };
                format!("door_{}_{phase}", period.as_token())
            }
            EntityKind::Portrait(portrait) => {
                format!(
                    "portrait_{}_in_{}",
                    portrait.destination.as_token(),
                    period.as_token()
                )
            }
            EntityKind::Furniture(furniture) if furniture.link.is_some() => "wardrobe".to_string(),
            EntityKind::PressurePad(pad) if pad.pressed => "pressure_pad_down".to_string(),
            EntityKind::Foe(foe) => match foe.state {
                FoeState::Idle { .. } => "foe_idle".to_string(),
                FoeState::Patrol => "foe_walk".to_string(),
                FoeState::Seek => "foe_run".to_string(),
            },
            other => other.token().to_string(),
        }
    }

    fn reset(&mut self) {
        match self {
            EntityKind::Wall(wall) => wall.broken.reset(),
            EntityKind::Furniture(furniture) => {
                furniture.positions.reset();
                furniture.locked = furniture.declared_locked;
            }
            EntityKind::Chair(chair) => {
                chair.positions.reset();
                chair.state = ChairState::Idle;
            }
            EntityKind::Door(door) => {
                door.unlocked = false;
                door.held_open = false;
            }
            EntityKind::Foe(foe) => {
                foe.position = foe.spawn;
                foe.facing = Facing::Right;
                foe.state = FoeState::Patrol;
            }
            EntityKind::PressurePad(pad) => pad.pressed = false,
            EntityKind::Key(key) => key.picked_up = false,
            EntityKind::Dialogue(dialogue) => dialogue.played = false,
            EntityKind::Floor(_) | EntityKind::Portrait(_) | EntityKind::Stairs(_) => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Floor {
    pub(crate) bounds: Rect,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct WallSegment {
    pub(crate) bounds: Rect,
    pub(crate) broken: PeriodSlots<bool>,
}

impl WallSegment {
    pub(crate) fn new(bounds: Rect, broken_from: Option<TimePeriod>) -> Self {
        let mut slots = [false; PERIOD_COUNT];
        if let Some(from) = broken_from {
            for period in from.this_and_later() {
                slots[period.index()] = true;
            }
        }
        Self {
            bounds,
            broken: PeriodSlots::from_slots(slots),
        }
    }

    pub(crate) fn is_broken(&self, period: TimePeriod) -> bool {
        self.broken.get(period)
    }

    pub(crate) fn break_from(&mut self, period: TimePeriod) {
        self.broken.set_from(period, true);
    }
}

/// Pushable and possibly enterable furniture. A `link` names the wardrobe
/// the player comes out of when entering this one.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Furniture {
    pub(crate) positions: PeriodPositions,
    pub(crate) width: i32,
    pub(crate) height: i32,
    pub(crate) movable: bool,
    pub(crate) locked: bool,
    pub(crate) declared_locked: bool,
    pub(crate) link: Option<String>,
}

impl Furniture {
    pub(crate) fn bounds(&self, period: TimePeriod) -> Rect {
        Rect::from_position(self.positions.get(period), self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum ChairState {
    #[default]
    Idle,
    Moving,
    Falling,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Chair {
    pub(crate) positions: PeriodPositions,
    pub(crate) width: i32,
    pub(crate) height: i32,
    pub(crate) state: ChairState,
}

impl Chair {
    pub(crate) fn bounds(&self, period: TimePeriod) -> Rect {
        Rect::from_position(self.positions.get(period), self.width, self.height)
    }
}

/// Closed doors are solid. A key opens one for good; a pad holds it open
/// only while pressed.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Door {
    pub(crate) bounds: Rect,
    pub(crate) locked: bool,
    pub(crate) unlocked: bool,
    pub(crate) held_open: bool,
}

impl Door {
    pub(crate) fn is_open(&self) -> bool {
        !self.locked || self.unlocked || self.held_open
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Portrait {
    pub(crate) bounds: Rect,
    pub(crate) destination: TimePeriod,
    /// Where the player reappears after travelling; zero keeps the player in place.
    pub(crate) moved_to: Vec2,
}

impl Portrait {
    pub(crate) fn usable_in(&self, period: TimePeriod) -> bool {
        self.destination != TimePeriod::Present
            && (period == TimePeriod::Present || period == self.destination)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StairsEnd {
    Bottom,
    Top,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Stairs {
    pub(crate) bounds: Rect,
    /// Direction of travel when going up.
    pub(crate) ascends: Facing,
}

pub(crate) const STAIRS_REACH_PX: f32 = 12.0;
pub(crate) const STAIRS_SNAP_PX: f32 = 2.0;

impl Stairs {
    /// Foot anchor of `end`: x of the step edge, y of the walking surface.
    pub(crate) fn anchor(&self, end: StairsEnd) -> Vec2 {
        let (left, right) = (self.bounds.left() as f32, self.bounds.right() as f32);
        let (top, bottom) = (self.bounds.top() as f32, self.bounds.bottom() as f32);
        match (end, self.ascends) {
            (StairsEnd::Bottom, Facing::Right) => Vec2::new(left, bottom),
            (StairsEnd::Top, Facing::Right) => Vec2::new(right, top),
            (StairsEnd::Bottom, Facing::Left) => Vec2::new(right, bottom),
            (StairsEnd::Top, Facing::Left) => Vec2::new(left, top),
        }
    }

    pub(crate) fn aligned_end(&self, player: Rect) -> Option<StairsEnd> {
        let feet = Vec2::new(player.center().x, player.bottom() as f32);
        [StairsEnd::Bottom, StairsEnd::Top].into_iter().find(|end| {
            let anchor = self.anchor(*end);
            (feet.y - anchor.y).abs() <= STAIRS_SNAP_PX
                && (feet.x - anchor.x).abs() <= STAIRS_REACH_PX
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum FoeState {
    Idle { remaining_ms: f32 },
    Patrol,
    Seek,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Foe {
    pub(crate) spawn: Vec2,
    pub(crate) position: Vec2,
    pub(crate) width: i32,
    pub(crate) height: i32,
    pub(crate) patrol_min_x: f32,
    pub(crate) patrol_max_x: f32,
    pub(crate) speed: f32,
    pub(crate) facing: Facing,
    pub(crate) state: FoeState,
}

impl Foe {
    pub(crate) fn bounds(&self) -> Rect {
        Rect::from_position(self.position, self.width, self.height)
    }

    pub(crate) fn recover(&mut self) {
        self.state = FoeState::Idle {
            remaining_ms: FOE_RECOVER_MS,
        };
    }

    /// Advances timers and picks this update's horizontal step.
    fn plan_step(&mut self, player: Rect, elapsed_ms: f32) -> f32 {
        if let FoeState::Idle { remaining_ms } = self.state {
            let remaining_ms = remaining_ms - elapsed_ms;
            if remaining_ms > 0.0 {
                self.state = FoeState::Idle { remaining_ms };
                return 0.0;
            }
            self.state = FoeState::Patrol;
        }

        let bounds = self.bounds();
        let dx = player.center().x - bounds.center().x;
        if dx.abs() <= FOE_SEEK_RANGE_PX && bounds.vertical_overlap(&player) {
            self.state = FoeState::Seek;
            self.facing = Facing::toward(bounds, player);
        } else {
            self.state = FoeState::Patrol;
        }
        self.facing.sign() * self.speed * elapsed_ms / 1000.0
    }

    fn apply_step(&mut self, dx: f32, blocked: bool) {
        if blocked {
            if self.state == FoeState::Patrol {
                self.facing = self.facing.opposite();
            }
            return;
        }
        self.position.x += dx;
        if self.state != FoeState::Patrol {
            return;
        }
        if self.position.x <= self.patrol_min_x {
            self.position.x = self.patrol_min_x;
            self.facing = Facing::Right;
        } else if self.position.x >= self.patrol_max_x {
            self.position.x = self.patrol_max_x;
            self.facing = Facing::Left;
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PressurePad {
    pub(crate) bounds: Rect,
    pub(crate) target: Option<String>,
    pub(crate) pressed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct KeyPickup {
    pub(crate) bounds: Rect,
    pub(crate) unlocks: Option<String>,
    pub(crate) period: Option<TimePeriod>,
    pub(crate) picked_up: bool,
}

impl KeyPickup {
    pub(crate) fn available_in(&self, period: TimePeriod) -> bool {
        self.period.map_or(true, |only| only == period)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DialogueTrigger {
    pub(crate) bounds: Rect,
    pub(crate) line: String,
    pub(crate) played: bool,
}

/// Runs one updatable entity's own per-frame behavior.
pub(crate) fn update_entity(
    stage: &mut Stage<'_>,
    handle: EntityHandle,
    player: Rect,
    elapsed_ms: f32,
) {
    match stage.entities.get(handle.0).map(|entity| &entity.kind) {
        Some(EntityKind::Foe(_)) => update_foe(stage, handle, player, elapsed_ms),
        Some(EntityKind::Chair(_)) => update_chair(stage, handle, elapsed_ms),
        _ => {}
    }
}

fn update_foe(stage: &mut Stage<'_>, handle: EntityHandle, player: Rect, elapsed_ms: f32) {
    if stage.period() != TimePeriod::Present || elapsed_ms <= 0.0 {
        return;
    }
    let EntityKind::Foe(foe) = &mut stage.entities[handle.0].kind else {
        return;
    };
    let dx = foe.plan_step(player, elapsed_ms);
    if dx == 0.0 {
        return;
    }
    let next = Rect::from_position(foe.position + Vec2::new(dx, 0.0), foe.width, foe.height);
    let blocked = stage.colliding_with_solid(next, None, Some(handle));
    if let EntityKind::Foe(foe) = &mut stage.entities[handle.0].kind {
        foe.apply_step(dx, blocked);
    }
}

fn update_chair(stage: &mut Stage<'_>, handle: EntityHandle, elapsed_ms: f32) {
    if elapsed_ms <= 0.0 {
        return;
    }
    let period = stage.period();
    let level_bottom = stage.bounds.bottom();
    let EntityKind::Chair(chair) = &mut stage.entities[handle.0].kind else {
        return;
    };
    if chair.state != ChairState::Falling {
        return;
    }
    chair.positions.move_by(period, Vec2::new(0.0, CHAIR_FALL_STEP_PX));
    if chair.bounds(period).top() >= level_bottom {
        debug!(chair = handle.0, "chair_fell_out_of_level");
        chair.state = ChairState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn foe_at(x: f32) -> Foe {
        Foe {
            spawn: Vec2::new(x, 0.0),
            position: Vec2::new(x, 0.0),
            width: 16,
            height: 32,
            patrol_min_x: 0.0,
            patrol_max_x: 100.0,
            speed: 50.0,
            facing: Facing::Right,
            state: FoeState::Patrol,
        }
    }

    #[test]
    fn wall_broken_from_period_is_broken_in_later_periods_only() {
        let wall = WallSegment::new(Rect::new(0, 0, 8, 8), Some(TimePeriod::Past));
        assert!(!wall.is_broken(TimePeriod::FarPast));
        assert!(wall.is_broken(TimePeriod::Past));
        assert!(wall.is_broken(TimePeriod::Present));
    }

    #[test]
    fn reset_restores_constructed_state() {
        let mut entity = LevelEntity {
            name: None,
            kind: EntityKind::Wall(WallSegment::new(Rect::new(0, 0, 8, 8), None)),
        };
        let constructed = entity.clone();
        if let EntityKind::Wall(wall) = &mut entity.kind {
            wall.break_from(TimePeriod::FarPast);
        }
        assert_ne!(entity, constructed);
        entity.reset();
        assert_eq!(entity, constructed);
    }

    #[test]
    fn portraits_travel_only_from_present_or_their_own_period() {
        let portrait = Portrait {
            bounds: Rect::new(0, 0, 8, 8),
            destination: TimePeriod::Past,
            moved_to: Vec2::ZERO,
        };
        assert!(portrait.usable_in(TimePeriod::Present));
        assert!(portrait.usable_in(TimePeriod::Past));
        assert!(!portrait.usable_in(TimePeriod::FarPast));
    }

    #[test]
    fn stairs_align_at_either_end() {
        let stairs = Stairs {
            bounds: Rect::new(100, 100, 60, 60),
            ascends: Facing::Right,
        };
        let at_bottom = Rect::new(88, 112, 24, 48);
        let at_top = Rect::new(148, 52, 24, 48);
        let midway = Rect::new(118, 82, 24, 48);
        assert_eq!(stairs.aligned_end(at_bottom), Some(StairsEnd::Bottom));
        assert_eq!(stairs.aligned_end(at_top), Some(StairsEnd::Top));
        assert_eq!(stairs.aligned_end(midway), None);
    }

    #[test]
    fn foe_patrol_turns_at_range_edge() {
        let mut foe = foe_at(99.0);
        let far_player = Rect::new(400, 0, 24, 48);
        let dx = foe.plan_step(far_player, 100.0);
        foe.apply_step(dx, false);
        assert_eq!(foe.position.x, 100.0);
        assert_eq!(foe.facing, Facing::Left);
    }

    #[test]
    fn foe_seeks_nearby_player() {
        let mut foe = foe_at(50.0);
        foe.facing = Facing::Right;
        let player = Rect::new(10, 0, 24, 48);
        let dx = foe.plan_step(player, 100.0);
        assert_eq!(foe.state, FoeState::Seek);
        assert!(dx < 0.0);
    }

    #[test]
    fn recovering_foe_waits_before_moving() {
        let mut foe = foe_at(50.0);
        foe.recover();
        assert_eq!(foe.plan_step(Rect::new(60, 0, 24, 48), 100.0), 0.0);
        assert!(matches!(foe.state, FoeState::Idle { .. }));
    }
}
