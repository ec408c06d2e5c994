use serde::Deserialize;

use super::lenient::LenientNumber;

/// On-disk description of every level in a game. Entities are listed in
/// registration order; that order is also the interaction order at runtime.
#[derive(Debug, Clone, Deserialize)]
pub struct LevelPack {
    pub default_level: String,
    pub levels: Vec<LevelDef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LevelDef {
    pub name: String,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub width: LenientNumber,
    #[serde(default)]
    pub height: LenientNumber,
    #[serde(default)]
    pub start_period: Option<String>,
    #[serde(default)]
    pub background_tint: Option<[u8; 3]>,
    #[serde(default)]
    pub spawn_x: LenientNumber,
    #[serde(default)]
    pub spawn_y: LenientNumber,
    #[serde(default)]
    pub entities: Vec<EntityDef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntityDef {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub x: LenientNumber,
    #[serde(default)]
    pub y: LenientNumber,
    #[serde(default)]
    pub width: LenientNumber,
    #[serde(default)]
    pub height: LenientNumber,
    #[serde(flatten)]
    pub kind: EntityDefKind,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityDefKind {
    Floor,
    Wall {
        #[serde(default)]
        broken_from: Option<String>,
    },
    Furniture {
        #[serde(default = "default_true")]
        movable: bool,
        #[serde(default)]
        locked: bool,
        #[serde(default)]
        link: Option<String>,
    },
    Chair,
    Door {
        #[serde(default)]
        locked: bool,
    },
    Portrait {
        #[serde(default)]
        destination: Option<String>,
        #[serde(default)]
        moved_to_x: LenientNumber,
        #[serde(default)]
        moved_to_y: LenientNumber,
    },
    Stairs {
        #[serde(default)]
        ascends: Option<String>,
    },
    Foe {
        #[serde(default)]
        patrol_min_x: LenientNumber,
        #[serde(default)]
        patrol_max_x: LenientNumber,
        #[serde(default)]
        speed: LenientNumber,
    },
    PressurePad {
        #[serde(default)]
        target: Option<String>,
    },
    Key {
        #[serde(default)]
        unlocks: Option<String>,
        #[serde(default)]
        period: Option<String>,
    },
    Dialogue {
        line: String,
    },
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_kind_is_read_from_tag() {
        let raw = r#"{
            "kind": "furniture",
            "name": "wardrobe_a",
            "x": 100, "y": "40", "width": 32, "height": 64,
            "locked": true,
            "link": "wardrobe_b"
        }"#;
        let def: EntityDef = serde_json::from_str(raw).expect("entity");

        assert_eq!(def.name.as_deref(), Some("wardrobe_a"));
        assert_eq!(def.y.resolve("y", 0.0), 40.0);
        match def.kind {
            EntityDefKind::Furniture {
                movable,
                locked,
                link,
            } => {
                assert!(movable);
                assert!(locked);
                assert_eq!(link.as_deref(), Some("wardrobe_b"));
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let raw = r#"{"kind": "trampoline", "x": 0}"#;
        assert!(serde_json::from_str::<EntityDef>(raw).is_err());
    }

    #[test]
    fn level_defaults_fill_missing_fields() {
        let raw = r#"{"name": "attic"}"#;
        let level: LevelDef = serde_json::from_str(raw).expect("level");

        assert!(level.next.is_none());
        assert!(level.entities.is_empty());
        assert_eq!(level.width.resolve("width", 640.0), 640.0);
    }
}
