mod lenient;
mod level_pack;
mod loader;

pub use lenient::LenientNumber;
pub use level_pack::{EntityDef, EntityDefKind, LevelDef, LevelPack};
pub use loader::{load_level_pack, parse_level_pack, ContentError};
