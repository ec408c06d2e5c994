use engine::{CueMode, Rect, Vec2};
use tracing::{debug, info, warn};

use super::cues;
use super::entities::{ChairState, EntityHandle, EntityKind, Facing};
use super::player::{
    PlayerState, PromptKind, Protagonist, PLAYER_HEIGHT, PLAYER_WIDTH, PUSH_STEP_PX, WALK_STEP_PX,
};
use super::registry::{FrameContext, InteractionRule, Participant, Stage};
use super::time_period::TimePeriod;

/// Furthest gap between player and furniture edges that still offers a push.
pub(crate) const PUSH_REACH_PX: f32 = 4.0;
/// Deepest edge overlap that still counts as standing beside the furniture.
pub(crate) const PUSH_OVERLAP_PX: f32 = 8.0;
pub(crate) const ENTER_BAND_PX: f32 = 8.0;
pub(crate) const VERTICAL_TOLERANCE_PX: i32 = 8;
pub(crate) const CHAIR_REACH_PX: f32 = 48.0;

/// Runs the player against every collideable in registration order. Later
/// rules overwrite the interactor and prompt set by earlier ones.
pub(crate) fn dispatch_interactions(
    player: &mut Protagonist,
    stage: &mut Stage<'_>,
    frame: &mut FrameContext<'_>,
) {
    player.prompt = None;
    if player.state != PlayerState::ControllingChair {
        player.nearest_chair = None;
    }
    let mut nearest_chair_distance = f32::INFINITY;

    let registry = stage.registry;
    for entry in registry.collideable() {
        let Participant::Entity(handle) = entry.participant else {
            continue;
        };
        match entry.rule {
            InteractionRule::Foe => foe_rule(handle, player, stage, frame),
            InteractionRule::Dialogue => dialogue_rule(handle, player, stage, frame),
            InteractionRule::Key => key_rule(handle, player, stage, frame),
            InteractionRule::PressurePad => pressure_pad_rule(handle, player, stage, frame),
            InteractionRule::Stairs => stairs_rule(handle, player, stage, frame),
            InteractionRule::Furniture => furniture_rule(handle, player, stage),
            InteractionRule::Portrait => portrait_rule(handle, player, stage),
            InteractionRule::Chair => {
                chair_rule(handle, player, stage, frame, &mut nearest_chair_distance)
            }
            InteractionRule::Floor => floor_rule(handle, player, stage),
            InteractionRule::Obstacle => obstacle_rule(handle, player, stage, frame),
            InteractionRule::Inert => {}
        }
    }

    if player.prompt.is_none() && !player.is_mid_push(stage) {
        player.interactor = None;
    }
}

fn foe_rule(
    handle: EntityHandle,
    player: &mut Protagonist,
    stage: &mut Stage<'_>,
    frame: &mut FrameContext<'_>,
) {
    if stage.period() != TimePeriod::Present
        || player.on_stairs()
        || player.state == PlayerState::Die
    {
        return;
    }
    let Some(EntityKind::Foe(foe)) = stage.kind(handle) else {
        return;
    };
    if !foe.bounds().intersects(&player.bounds()) {
        return;
    }
    player.die(stage, frame.audio);
    if let Some(EntityKind::Foe(foe)) = stage.kind_mut(handle) {
        foe.recover();
    }
}

fn dialogue_rule(
    handle: EntityHandle,
    player: &Protagonist,
    stage: &mut Stage<'_>,
    frame: &mut FrameContext<'_>,
) {
    let bounds = player.bounds();
    let Some(EntityKind::Dialogue(dialogue)) = stage.kind_mut(handle) else {
        return;
    };
    if dialogue.played || !dialogue.bounds.intersects(&bounds) {
        return;
    }
    dialogue.played = true;
    frame.audio.play_cue(&dialogue.line, CueMode::Once);
    info!(line = %dialogue.line, "dialogue_played");
}

fn key_rule(
    handle: EntityHandle,
    player: &Protagonist,
    stage: &mut Stage<'_>,
    frame: &mut FrameContext<'_>,
) {
    let period = stage.period();
    let bounds = player.bounds();
    let unlocks = match stage.kind_mut(handle) {
        Some(EntityKind::Key(key))
            if !key.picked_up && key.available_in(period) && key.bounds.intersects(&bounds) =>
        {
            key.picked_up = true;
            key.unlocks.clone()
        }
        _ => return,
    };
    frame.audio.play_cue(cues::KEY_PICKUP, CueMode::Once);
    info!(key = handle.0, period = period.as_token(), "key_picked_up");

    let Some(name) = unlocks else {
        return;
    };
    let Some(target) = stage.resolve_link(&name) else {
        warn!(key = handle.0, target = %name, "key_target_missing");
        return;
    };
    match stage.kind_mut(target) {
        Some(EntityKind::Door(door)) => door.unlocked = true,
        Some(EntityKind::Furniture(furniture)) => furniture.locked = false,
        _ => {
            warn!(key = handle.0, target = %name, "key_target_not_lockable");
            return;
        }
    }
    frame.audio.play_cue(cues::DOOR_UNLOCK, CueMode::Once);
    info!(target = %name, "unlocked");
}

fn pressure_pad_rule(
    handle: EntityHandle,
    player: &Protagonist,
    stage: &mut Stage<'_>,
    frame: &mut FrameContext<'_>,
) {
    let Some(EntityKind::PressurePad(pad)) = stage.kind(handle) else {
        return;
    };
    let (pad_bounds, was_pressed, target) = (pad.bounds, pad.pressed, pad.target.clone());
    let pressed = player.bounds().intersects(&pad_bounds)
        || (stage.period() == TimePeriod::Present && foe_overlaps(stage, pad_bounds));

    if let Some(EntityKind::PressurePad(pad)) = stage.kind_mut(handle) {
        pad.pressed = pressed;
    }
    if pressed && !was_pressed {
        frame.audio.play_cue(cues::BUTTON, CueMode::Once);
        debug!(pad = handle.0, "pressure_pad_pressed");
    }

    let Some(linked) = target.as_deref().and_then(|name| stage.resolve_link(name)) else {
        return;
    };
    let held_open = any_pad_holding(stage, linked);
    if let Some(EntityKind::Door(door)) = stage.kind_mut(linked) {
        door.held_open = held_open;
    }
}

/// Whether any pressed pad targets `door`. The last pad in the pass sees
/// every pad's state for this frame.
fn any_pad_holding(stage: &Stage<'_>, door: EntityHandle) -> bool {
    stage.registry.collideable().iter().any(|entry| {
        let (InteractionRule::PressurePad, Participant::Entity(handle)) =
            (entry.rule, entry.participant)
        else {
            return false;
        };
        matches!(
            stage.kind(handle),
            Some(EntityKind::PressurePad(pad))
                if pad.pressed
                    && pad.target.as_deref().and_then(|name| stage.resolve_link(name))
                        == Some(door)
        )
    })
}

fn foe_overlaps(stage: &Stage<'_>, area: Rect) -> bool {
    stage.registry.collideable().iter().any(|entry| {
        let (InteractionRule::Foe, Participant::Entity(handle)) = (entry.rule, entry.participant)
        else {
            return false;
        };
        stage
            .bounds_of(handle)
            .is_some_and(|bounds| bounds.intersects(&area))
    })
}

fn stairs_rule(
    handle: EntityHandle,
    player: &mut Protagonist,
    stage: &Stage<'_>,
    frame: &mut FrameContext<'_>,
) {
    if player.on_stairs() {
        player.finish_climb_if_arrived(handle, frame.audio);
        return;
    }
    if !matches!(player.state, PlayerState::Idle | PlayerState::Walk) {
        return;
    }
    let Some(EntityKind::Stairs(stairs)) = stage.kind(handle) else {
        return;
    };
    if stairs.aligned_end(player.bounds()).is_some() {
        player.offer(handle, PromptKind::Climb, false);
    }
}

fn furniture_rule(handle: EntityHandle, player: &mut Protagonist, stage: &Stage<'_>) {
    let pushing = matches!(
        player.state,
        PlayerState::PushWalk | PlayerState::PushingStill
    );
    if !pushing && !matches!(player.state, PlayerState::Idle | PlayerState::Walk) {
        return;
    }
    let Some(EntityKind::Furniture(furniture)) = stage.kind(handle) else {
        return;
    };
    let furniture_bounds = furniture.bounds(stage.period());
    let bounds = player.bounds();
    if (bounds.bottom() - furniture_bounds.bottom()).abs() > VERTICAL_TOLERANCE_PX {
        return;
    }

    let dx = furniture_bounds.center().x - bounds.center().x;
    if !pushing && dx.abs() <= ENTER_BAND_PX {
        if let Some(link) = furniture.link.as_deref() {
            let negated = furniture.locked || !exit_available(stage, link);
            player.offer(handle, PromptKind::Enter, negated);
            return;
        }
    }

    let gap = dx.abs() - (furniture_bounds.width + bounds.width) as f32 / 2.0;
    if !(-PUSH_OVERLAP_PX..=PUSH_REACH_PX).contains(&gap) {
        return;
    }
    let side = Facing::toward(bounds, furniture_bounds);
    let ahead = furniture_bounds.offset((side.sign() * PUSH_STEP_PX) as i32, 0);
    let blocked = stage.colliding_with_solid(ahead, None, Some(handle));
    let negated = furniture.locked || !furniture.movable || blocked;
    player.offer(handle, PromptKind::Push, negated);
}

fn exit_available(stage: &Stage<'_>, link: &str) -> bool {
    let Some(target) = stage.resolve_link(link) else {
        return false;
    };
    match stage.kind(target) {
        Some(EntityKind::Furniture(exit)) => !exit.locked,
        Some(_) => true,
        None => false,
    }
}

fn portrait_rule(handle: EntityHandle, player: &mut Protagonist, stage: &Stage<'_>) {
    if !matches!(player.state, PlayerState::Idle | PlayerState::Walk) {
        return;
    }
    let period = stage.period();
    let Some(EntityKind::Portrait(portrait)) = stage.kind(handle) else {
        return;
    };
    if !portrait.bounds.intersects(&player.bounds()) || !portrait.usable_in(period) {
        return;
    }
    let arrival = if period == TimePeriod::Present {
        portrait.destination
    } else {
        TimePeriod::Present
    };
    let landing_blocked = !portrait.moved_to.is_zero()
        && stage.colliding_with_solid_in(
            arrival,
            Rect::from_position(portrait.moved_to, PLAYER_WIDTH, PLAYER_HEIGHT),
            None,
            None,
        );
    player.offer(handle, PromptKind::TimeTravel, landing_blocked);
}

fn chair_rule(
    handle: EntityHandle,
    player: &mut Protagonist,
    stage: &mut Stage<'_>,
    frame: &mut FrameContext<'_>,
    nearest_distance: &mut f32,
) {
    let period = stage.period();
    let Some(EntityKind::Chair(chair)) = stage.kind(handle) else {
        return;
    };
    match chair.state {
        ChairState::Idle => {
            if player.state == PlayerState::ControllingChair {
                return;
            }
            let distance = player
                .bounds()
                .center()
                .distance_squared(chair.bounds(period).center());
            if distance <= CHAIR_REACH_PX * CHAIR_REACH_PX && distance < *nearest_distance {
                *nearest_distance = distance;
                player.nearest_chair = Some(handle);
            }
        }
        ChairState::Falling if frame.elapsed_ms > 0.0 => land_chair(handle, stage, frame),
        ChairState::Falling | ChairState::Moving => {}
    }
}

/// Breaks intact walls under a falling chair, then sets it down on any
/// floor it has sunk into.
fn land_chair(handle: EntityHandle, stage: &mut Stage<'_>, frame: &mut FrameContext<'_>) {
    let period = stage.period();
    let registry = stage.registry;

    for entry in registry.collideable() {
        let Participant::Entity(other) = entry.participant else {
            continue;
        };
        let Some(chair_bounds) = stage.bounds_of(handle) else {
            return;
        };
        match entry.rule {
            InteractionRule::Obstacle => {
                if let Some(EntityKind::Wall(wall)) = stage.kind_mut(other) {
                    if !wall.is_broken(period) && wall.bounds.intersects(&chair_bounds) {
                        wall.break_from(period);
                        frame.audio.play_cue(cues::WALL_BREAK, CueMode::Once);
                        info!(wall = other.0, period = period.as_token(), "wall_broken");
                    }
                }
            }
            InteractionRule::Floor => {
                let Some(floor) = stage.bounds_of(other) else {
                    continue;
                };
                if lift_chair_out_of(stage, handle, floor, period) {
                    if let Some(EntityKind::Chair(chair)) = stage.kind_mut(handle) {
                        chair.state = ChairState::Idle;
                    }
                    frame.audio.play_cue(cues::CHAIR_DROP, CueMode::Once);
                    debug!(chair = handle.0, floor = other.0, "chair_landed");
                    return;
                }
            }
            _ => {}
        }
    }
}

fn lift_chair_out_of(
    stage: &mut Stage<'_>,
    handle: EntityHandle,
    floor: Rect,
    period: TimePeriod,
) -> bool {
    let Some(EntityKind::Chair(chair)) = stage.kind_mut(handle) else {
        return false;
    };
    let bounds = chair.bounds(period);
    if !bounds.intersects(&floor) {
        return false;
    }
    let sunk = bounds.bottom() - floor.top();
    chair.positions.move_by(period, Vec2::new(0.0, -(sunk as f32)));
    true
}

fn floor_rule(handle: EntityHandle, player: &mut Protagonist, stage: &Stage<'_>) {
    if player.on_stairs() {
        return;
    }
    let Some(floor) = stage.bounds_of(handle) else {
        return;
    };
    let bounds = player.bounds();
    if bounds.intersects(&floor) {
        player.position.y -= (bounds.bottom() - floor.top()) as f32;
    }
}

fn obstacle_rule(
    handle: EntityHandle,
    player: &mut Protagonist,
    stage: &Stage<'_>,
    frame: &mut FrameContext<'_>,
) {
    if player.state != PlayerState::Walk {
        return;
    }
    let period = stage.period();
    let Some(kind) = stage.kind(handle) else {
        return;
    };
    if !kind.solid(period) {
        return;
    }
    let obstacle = kind.bounds(period);
    let bounds = player.bounds();
    if !bounds.vertical_overlap(&obstacle) {
        return;
    }
    let gap = match player.facing {
        Facing::Right => obstacle.left() - bounds.right(),
        Facing::Left => bounds.left() - obstacle.right(),
    } as f32;
    if (0.0..WALK_STEP_PX).contains(&gap) {
        player.set_state(PlayerState::PushingStill, frame.audio);
    }
}
