use std::collections::HashMap;

use engine::{AnimationLibrary, AudioSink, InputSnapshot, Rect};
use tracing::warn;

use super::entities::{EntityHandle, EntityKind, LevelEntity};
use super::time_period::TimePeriod;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Participant {
    Player,
    Entity(EntityHandle),
}

/// What happens when the player's interaction pass meets a collideable.
/// Resolved once when the entity is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum InteractionRule {
    Foe,
    Dialogue,
    Key,
    PressurePad,
    Stairs,
    Furniture,
    Portrait,
    Chair,
    Floor,
    Obstacle,
    Inert,
}

impl InteractionRule {
    pub(crate) fn for_kind(kind: &EntityKind) -> InteractionRule {
        match kind {
            EntityKind::Foe(_) => InteractionRule::Foe,
            EntityKind::Dialogue(_) => InteractionRule::Dialogue,
            EntityKind::Key(_) => InteractionRule::Key,
            EntityKind::PressurePad(_) => InteractionRule::PressurePad,
            EntityKind::Stairs(_) => InteractionRule::Stairs,
            EntityKind::Furniture(_) => InteractionRule::Furniture,
            EntityKind::Portrait(_) => InteractionRule::Portrait,
            EntityKind::Chair(_) => InteractionRule::Chair,
            EntityKind::Floor(_) => InteractionRule::Floor,
            EntityKind::Wall(_) | EntityKind::Door(_) => InteractionRule::Obstacle,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CollideableEntry {
    pub(crate) participant: Participant,
    pub(crate) rule: InteractionRule,
}

/// Per-level role lists. Registration order is iteration order.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    updatable: Vec<Participant>,
    drawable: Vec<Participant>,
    collideable: Vec<CollideableEntry>,
}

impl Registry {
    pub(crate) fn clear(&mut self) {
        self.updatable.clear();
        self.drawable.clear();
        self.collideable.clear();
    }

    pub(crate) fn register_player(&mut self) {
        push_unique(&mut self.updatable, Participant::Player);
        push_unique(&mut self.drawable, Participant::Player);
        push_unique(
            &mut self.collideable,
            CollideableEntry {
                participant: Participant::Player,
                rule: InteractionRule::Inert,
            },
        );
    }

    pub(crate) fn register(&mut self, handle: EntityHandle, kind: &EntityKind) {
        let participant = Participant::Entity(handle);
        let capabilities = kind.capabilities();
        if capabilities.updatable {
            push_unique(&mut self.updatable, participant);
        }
        if capabilities.drawable {
            push_unique(&mut self.drawable, participant);
        }
        if capabilities.collideable {
            push_unique(
                &mut self.collideable,
                CollideableEntry {
                    participant,
                    rule: InteractionRule::for_kind(kind),
                },
            );
        }
    }

    pub(crate) fn updatable(&self) -> &[Participant] {
        &self.updatable
    }

    pub(crate) fn drawable(&self) -> &[Participant] {
        &self.drawable
    }

    pub(crate) fn collideable(&self) -> &[CollideableEntry] {
        &self.collideable
    }
}

fn push_unique<T: PartialEq>(list: &mut Vec<T>, item: T) {
    if !list.contains(&item) {
        list.push(item);
    }
}

/// Name lookup for cross-entity references: wardrobe links, pad and key
/// targets. Rebuilt whenever a level is initialized.
#[derive(Debug, Default)]
pub(crate) struct LinkTable {
    by_name: HashMap<String, EntityHandle>,
}

impl LinkTable {
    pub(crate) fn rebuild(&mut self, entities: &[LevelEntity]) {
        self.by_name.clear();
        for (index, entity) in entities.iter().enumerate() {
            let Some(name) = entity.name.as_deref() else {
                continue;
            };
            if self.by_name.contains_key(name) {
                warn!(name, index, "duplicate_entity_name_ignored");
                continue;
            }
            self.by_name.insert(name.to_string(), EntityHandle(index));
        }
    }

    pub(crate) fn resolve(&self, name: &str) -> Option<EntityHandle> {
        self.by_name.get(name).copied()
    }

    pub(crate) fn len(&self) -> usize {
        self.by_name.len()
    }
}

/// Mutable view of the active level handed to per-frame logic.
pub(crate) struct Stage<'a> {
    pub(crate) period: &'a mut TimePeriod,
    pub(crate) entities: &'a mut [LevelEntity],
    pub(crate) registry: &'a Registry,
    pub(crate) links: &'a LinkTable,
    pub(crate) bounds: Rect,
}

impl Stage<'_> {
    pub(crate) fn period(&self) -> TimePeriod {
        *self.period
    }

    pub(crate) fn set_period(&mut self, period: TimePeriod) {
        *self.period = period;
    }

    pub(crate) fn kind(&self, handle: EntityHandle) -> Option<&EntityKind> {
        self.entities.get(handle.0).map(|entity| &entity.kind)
    }

    pub(crate) fn kind_mut(&mut self, handle: EntityHandle) -> Option<&mut EntityKind> {
        self.entities.get_mut(handle.0).map(|entity| &mut entity.kind)
    }

    pub(crate) fn bounds_of(&self, handle: EntityHandle) -> Option<Rect> {
        let period = self.period();
        self.kind(handle).map(|kind| kind.bounds(period))
    }

    pub(crate) fn resolve_link(&self, name: &str) -> Option<EntityHandle> {
        self.links.resolve(name)
    }

    /// Whether `rect` overlaps anything solid in the active period. The
    /// player counts as solid only when `player` is given; stairs never do.
    pub(crate) fn colliding_with_solid(
        &self,
        rect: Rect,
        player: Option<Rect>,
        exclude: Option<EntityHandle>,
    ) -> bool {
        self.colliding_with_solid_in(self.period(), rect, player, exclude)
    }

    pub(crate) fn colliding_with_solid_in(
        &self,
        period: TimePeriod,
        rect: Rect,
        player: Option<Rect>,
        exclude: Option<EntityHandle>,
    ) -> bool {
        self.registry
            .collideable()
            .iter()
            .any(|entry| match entry.participant {
                Participant::Player => player.is_some_and(|bounds| bounds.intersects(&rect)),
                Participant::Entity(handle) => {
                    if Some(handle) == exclude {
                        return false;
                    }
                    let Some(kind) = self.kind(handle) else {
                        return false;
                    };
                    !matches!(kind, EntityKind::Stairs(_))
                        && kind.solid(period)
                        && kind.bounds(period).intersects(&rect)
                }
            })
    }
}

/// Collaborators and timing for one simulated frame.
pub(crate) struct FrameContext<'a> {
    pub(crate) elapsed_ms: f32,
    pub(crate) input: &'a InputSnapshot,
    pub(crate) audio: &'a mut dyn AudioSink,
    pub(crate) animations: &'a dyn AnimationLibrary,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::gameplay::entities::{Facing, Floor, Stairs, WallSegment};

    fn entity(name: Option<&str>, kind: EntityKind) -> LevelEntity {
        LevelEntity {
            name: name.map(str::to_string),
            kind,
        }
    }

    fn floor(bounds: Rect) -> EntityKind {
        EntityKind::Floor(Floor { bounds })
    }

    #[test]
    fn registering_twice_keeps_one_entry_per_role() {
        let kind = floor(Rect::new(0, 0, 10, 10));
        let mut registry = Registry::default();
        registry.register(EntityHandle(0), &kind);
        registry.register(EntityHandle(0), &kind);
        registry.register_player();
        registry.register_player();

        assert_eq!(registry.collideable().len(), 2);
        assert_eq!(registry.drawable().len(), 2);
        assert_eq!(registry.collideable()[0].rule, InteractionRule::Floor);
    }

    #[test]
    fn link_table_keeps_first_of_duplicate_names() {
        let entities = vec![
            entity(Some("door"), floor(Rect::new(0, 0, 1, 1))),
            entity(None, floor(Rect::new(0, 0, 1, 1))),
            entity(Some("door"), floor(Rect::new(0, 0, 1, 1))),
        ];
        let mut links = LinkTable::default();
        links.rebuild(&entities);
        assert_eq!(links.resolve("door"), Some(EntityHandle(0)));
        assert_eq!(links.len(), 1);
        assert_eq!(links.resolve("missing"), None);
    }

    #[test]
    fn solidity_query_skips_stairs_broken_walls_and_excluded() {
        let mut entities = vec![
            entity(
                None,
                EntityKind::Stairs(Stairs {
                    bounds: Rect::new(0, 0, 50, 50),
                    ascends: Facing::Right,
                }),
            ),
            entity(
                None,
                EntityKind::Wall(WallSegment::new(
                    Rect::new(60, 0, 10, 50),
                    Some(TimePeriod::Past),
                )),
            ),
            entity(None, floor(Rect::new(100, 0, 10, 10))),
        ];
        let mut registry = Registry::default();
        registry.register_player();
        for (index, entity) in entities.iter().enumerate() {
            registry.register(EntityHandle(index), &entity.kind);
        }
        let links = LinkTable::default();
        let mut period = TimePeriod::FarPast;
        let stage = Stage {
            period: &mut period,
            entities: &mut entities,
            registry: &registry,
            links: &links,
            bounds: Rect::new(0, 0, 200, 200),
        };

        assert!(!stage.colliding_with_solid(Rect::new(10, 10, 5, 5), None, None));
        assert!(stage.colliding_with_solid(Rect::new(62, 10, 5, 5), None, None));
        assert!(!stage.colliding_with_solid_in(
            TimePeriod::Present,
            Rect::new(62, 10, 5, 5),
            None,
            None
        ));
        assert!(!stage.colliding_with_solid(Rect::new(101, 1, 5, 5), None, Some(EntityHandle(2))));
        assert!(stage.colliding_with_solid(
            Rect::new(150, 150, 5, 5),
            Some(Rect::new(148, 148, 10, 10)),
            None
        ));
    }
}
