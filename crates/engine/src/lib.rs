use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;
pub mod content;

pub use app::{
    run_headless, run_headless_with_metrics, AnimationLibrary, AppError, AudioEvent, AudioSink,
    Camera2D, CueLedger, CueMode, IdleInput, InputAction, InputSnapshot, InputSource, LoopConfig,
    LoopMetricsSnapshot, MetricsHandle, Pacing, RecordingAudioSink, Rect, RunEnd, RunSummary,
    Scene, SceneCommand, SceneDebugCommand, SceneDebugCommandResult, StaticAnimationLibrary,
    TracingAudioSink, Vec2, DEFAULT_VIEWPORT_HEIGHT, DEFAULT_VIEWPORT_WIDTH, SLOW_FRAME_ENV_VAR,
};
pub use content::{
    load_level_pack, parse_level_pack, ContentError, EntityDef, EntityDefKind, LenientNumber,
    LevelDef, LevelPack,
};

pub const ROOT_ENV_VAR: &str = "TIMESHIFT_ROOT";
pub const DEFAULT_LEVEL_PACK_FILE: &str = "manor.json";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub levels_dir: PathBuf,
    pub scripts_dir: PathBuf,
}

impl AppPaths {
    pub fn default_level_pack(&self) -> PathBuf {
        self.levels_dir.join(DEFAULT_LEVEL_PACK_FILE)
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error(
        "TIMESHIFT_ROOT is set but does not point to a valid project root: {path}\n\
A valid root must contain Cargo.toml and either crates/ or levels/."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not detect project root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and either crates/ or levels/.\n\
Set {env_var} explicitly, for example:\n\
Bash/zsh: export {env_var}=\"/path/to/timeshift\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let root = resolve_root()?;
    Ok(app_paths_for_root(root))
}

fn app_paths_for_root(root: PathBuf) -> AppPaths {
    let levels_dir = root.join("levels");
    let scripts_dir = levels_dir.join("scripts");
    AppPaths {
        root,
        levels_dir,
        scripts_dir,
    }
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let normalized = normalize_path(&PathBuf::from(value));
            if is_repo_marker(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot { path: normalized })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;

            for candidate in exe_dir.ancestors() {
                if is_repo_marker(candidate) {
                    return Ok(normalize_path(candidate));
                }
            }

            Err(StartupError::RootNotFound {
                start_dir: normalize_path(&exe_dir),
                env_var: ROOT_ENV_VAR,
            })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn is_repo_marker(path: &Path) -> bool {
    let cargo_toml = path.join("Cargo.toml").is_file();
    let has_crates = path.join("crates").is_dir();
    let has_levels = path.join("levels").is_dir();

    cargo_toml && (has_crates || has_levels)
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_marker_requires_cargo_toml() {
        let dir = tempfile::tempdir().expect("temp dir");
        fs::create_dir(dir.path().join("levels")).expect("levels dir");
        assert!(!is_repo_marker(dir.path()));

        fs::write(dir.path().join("Cargo.toml"), "[workspace]\n").expect("manifest");
        assert!(is_repo_marker(dir.path()));
    }

    #[test]
    fn level_paths_hang_off_root() {
        let paths = app_paths_for_root(PathBuf::from("/game"));
        assert_eq!(paths.levels_dir, PathBuf::from("/game/levels"));
        assert_eq!(paths.scripts_dir, PathBuf::from("/game/levels/scripts"));
        assert_eq!(
            paths.default_level_pack(),
            PathBuf::from("/game/levels/manor.json")
        );
    }
}
