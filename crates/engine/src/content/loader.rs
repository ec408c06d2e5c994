use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use super::level_pack::LevelPack;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("failed to read level pack {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse level pack {origin} at line {line}, column {column}: {source}")]
    Parse {
        origin: String,
        line: usize,
        column: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("level pack {origin} declares no levels")]
    Empty { origin: String },
    #[error("level pack {origin} declares level '{name}' more than once")]
    DuplicateLevel { origin: String, name: String },
    #[error("level pack {origin} names default level '{name}' but no such level exists")]
    UnknownDefaultLevel { origin: String, name: String },
}

pub fn load_level_pack(path: &Path) -> Result<LevelPack, ContentError> {
    let raw = fs::read_to_string(path).map_err(|source| ContentError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let pack = parse_level_pack(&raw, &path.display().to_string())?;
    info!(
        path = %path.display(),
        level_count = pack.levels.len(),
        default_level = %pack.default_level,
        "level_pack_loaded"
    );
    Ok(pack)
}

pub fn parse_level_pack(raw: &str, origin: &str) -> Result<LevelPack, ContentError> {
    let pack: LevelPack = serde_json::from_str(raw).map_err(|source| ContentError::Parse {
        origin: origin.to_string(),
        line: source.line(),
        column: source.column(),
        source,
    })?;
    validate_level_pack(&pack, origin)?;
    Ok(pack)
}

fn validate_level_pack(pack: &LevelPack, origin: &str) -> Result<(), ContentError> {
    if pack.levels.is_empty() {
        return Err(ContentError::Empty {
            origin: origin.to_string(),
        });
    }

    let mut names = HashSet::with_capacity(pack.levels.len());
    for level in &pack.levels {
        if !names.insert(level.name.as_str()) {
            return Err(ContentError::DuplicateLevel {
                origin: origin.to_string(),
                name: level.name.clone(),
            });
        }
    }

    if !names.contains(pack.default_level.as_str()) {
        return Err(ContentError::UnknownDefaultLevel {
            origin: origin.to_string(),
            name: pack.default_level.clone(),
        });
    }

    // Dangling successors are legal; they resolve to "no successor" at runtime.
    for level in &pack.levels {
        if let Some(next) = level.next.as_deref() {
            if !names.contains(next) {
                warn!(level = %level.name, next, "unknown_successor_level");
            }
        }
    }
    Ok(())
}
