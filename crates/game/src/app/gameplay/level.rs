use std::collections::HashMap;

use engine::{ContentError, EntityDef, EntityDefKind, LevelDef, LevelPack, Rect, Vec2};
use tracing::warn;

use super::entities::{
    Chair, ChairState, DialogueTrigger, Door, EntityKind, Facing, Floor, Foe, FoeState, Furniture,
    KeyPickup, LevelEntity, Portrait, PressurePad, Stairs, WallSegment,
    FOE_DEFAULT_PATROL_PX, FOE_DEFAULT_SPEED_PX_PER_SECOND,
};
use super::time_period::{PeriodPositions, TimePeriod};

pub(crate) const DEFAULT_ENTITY_SIZE: i32 = 32;
pub(crate) const DEFAULT_LEVEL_WIDTH: i32 = 640;
pub(crate) const DEFAULT_LEVEL_HEIGHT: i32 = 360;
const DEFAULT_BACKGROUND_TINT: [u8; 3] = [24, 20, 28];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct LevelId(pub(crate) usize);

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Level {
    pub(crate) name: String,
    pub(crate) next: Option<String>,
    pub(crate) width: i32,
    pub(crate) height: i32,
    pub(crate) start_period: TimePeriod,
    pub(crate) background_tint: [u8; 3],
    pub(crate) spawn: Vec2,
    pub(crate) entities: Vec<LevelEntity>,
}

impl Level {
    pub(crate) fn from_def(def: &LevelDef) -> Level {
        let entities = def
            .entities
            .iter()
            .map(|entity| LevelEntity {
                name: entity.name.clone(),
                kind: entity_kind_from_def(entity),
            })
            .collect();
        Level {
            name: def.name.clone(),
            next: def.next.clone(),
            width: def.width.resolve_i32("width", DEFAULT_LEVEL_WIDTH),
            height: def.height.resolve_i32("height", DEFAULT_LEVEL_HEIGHT),
            start_period: TimePeriod::parse_or(
                def.start_period.as_deref(),
                "start_period",
                TimePeriod::Present,
            ),
            background_tint: def.background_tint.unwrap_or(DEFAULT_BACKGROUND_TINT),
            spawn: Vec2::new(
                def.spawn_x.resolve("spawn_x", 0.0),
                def.spawn_y.resolve("spawn_y", 0.0),
            ),
            entities,
        }
    }

    pub(crate) fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }
}

fn entity_kind_from_def(def: &EntityDef) -> EntityKind {
    let position = Vec2::new(def.x.resolve("x", 0.0), def.y.resolve("y", 0.0));
    let width = def.width.resolve_i32("width", DEFAULT_ENTITY_SIZE);
    let height = def.height.resolve_i32("height", DEFAULT_ENTITY_SIZE);
    let bounds = Rect::from_position(position, width, height);

    match &def.kind {
        EntityDefKind::Floor => EntityKind::Floor(Floor { bounds }),
        EntityDefKind::Wall { broken_from } => EntityKind::Wall(WallSegment::new(
            bounds,
            broken_from
                .as_deref()
                .and_then(|raw| parse_optional_period(raw, "broken_from")),
        )),
        EntityDefKind::Furniture {
            movable,
            locked,
            link,
        } => EntityKind::Furniture(Furniture {
            positions: PeriodPositions::new(position),
            width,
            height,
            movable: *movable,
            locked: *locked,
            declared_locked: *locked,
            link: link.clone(),
        }),
        EntityDefKind::Chair => EntityKind::Chair(Chair {
            positions: PeriodPositions::new(position),
            width,
            height,
            state: ChairState::Idle,
        }),
        EntityDefKind::Door { locked } => EntityKind::Door(Door {
            bounds,
            locked: *locked,
            unlocked: false,
            held_open: false,
        }),
        EntityDefKind::Portrait {
            destination,
            moved_to_x,
            moved_to_y,
        } => EntityKind::Portrait(Portrait {
            bounds,
            destination: TimePeriod::parse_or(
                destination.as_deref(),
                "destination",
                TimePeriod::Present,
            ),
            moved_to: Vec2::new(
                moved_to_x.resolve("moved_to_x", 0.0),
                moved_to_y.resolve("moved_to_y", 0.0),
            ),
        }),
        EntityDefKind::Stairs { ascends } => EntityKind::Stairs(Stairs {
            bounds,
            ascends: parse_ascent(ascends.as_deref()),
        }),
        EntityDefKind::Foe {
            patrol_min_x,
            patrol_max_x,
            speed,
        } => {
            let min = patrol_min_x.resolve("patrol_min_x", position.x - FOE_DEFAULT_PATROL_PX);
            let max = patrol_max_x.resolve("patrol_max_x", position.x + FOE_DEFAULT_PATROL_PX);
            EntityKind::Foe(Foe {
                spawn: position,
                position,
                width,
                height,
                patrol_min_x: min.min(max),
                patrol_max_x: min.max(max),
                speed: speed.resolve("speed", FOE_DEFAULT_SPEED_PX_PER_SECOND),
                facing: Facing::Right,
                state: FoeState::Patrol,
            })
        }
        EntityDefKind::PressurePad { target } => EntityKind::PressurePad(PressurePad {
            bounds,
            target: target.clone(),
            pressed: false,
        }),
        EntityDefKind::Key { unlocks, period } => EntityKind::Key(KeyPickup {
            bounds,
            unlocks: unlocks.clone(),
            period: period
                .as_deref()
                .and_then(|raw| parse_optional_period(raw, "period")),
            picked_up: false,
        }),
        EntityDefKind::Dialogue { line } => EntityKind::Dialogue(DialogueTrigger {
            bounds,
            line: line.clone(),
            played: false,
        }),
    }
}

fn parse_optional_period(raw: &str, field: &str) -> Option<TimePeriod> {
    let parsed = TimePeriod::parse(raw);
    if parsed.is_none() {
        warn!(field, raw, "unknown_time_period_ignored");
    }
    parsed
}

fn parse_ascent(raw: Option<&str>) -> Facing {
    match raw.map(str::trim) {
        None | Some("right") => Facing::Right,
        Some("left") => Facing::Left,
        Some(other) => {
            warn!(field = "ascends", raw = other, "unknown_stairs_direction");
            Facing::Right
        }
    }
}

/// Every level of a pack, addressable by name.
#[derive(Debug, Clone)]
pub(crate) struct LevelTable {
    levels: Vec<Level>,
    by_name: HashMap<String, LevelId>,
    default_level: LevelId,
}

impl LevelTable {
    pub(crate) fn from_pack(pack: &LevelPack) -> Result<LevelTable, ContentError> {
        let levels: Vec<Level> = pack.levels.iter().map(Level::from_def).collect();
        let by_name: HashMap<String, LevelId> = levels
            .iter()
            .enumerate()
            .map(|(index, level)| (level.name.clone(), LevelId(index)))
            .collect();
        let default_level = by_name.get(&pack.default_level).copied().ok_or_else(|| {
            ContentError::UnknownDefaultLevel {
                origin: "level table".to_string(),
                name: pack.default_level.clone(),
            }
        })?;
        Ok(LevelTable {
            levels,
            by_name,
            default_level,
        })
    }

    pub(crate) fn default_level(&self) -> LevelId {
        self.default_level
    }

    pub(crate) fn id_by_name(&self, name: &str) -> Option<LevelId> {
        self.by_name.get(name).copied()
    }

    pub(crate) fn get(&self, id: LevelId) -> &Level {
        &self.levels[id.0]
    }

    pub(crate) fn get_mut(&mut self, id: LevelId) -> &mut Level {
        &mut self.levels[id.0]
    }

    pub(crate) fn successor_of(&self, id: LevelId) -> Option<LevelId> {
        self.get(id)
            .next
            .as_deref()
            .and_then(|name| self.id_by_name(name))
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.levels.len()
    }
}
