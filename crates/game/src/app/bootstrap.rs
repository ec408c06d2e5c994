use std::path::{Path, PathBuf};

use engine::{
    load_level_pack, resolve_app_paths, AppError, IdleInput, InputSource, LoopConfig, Pacing, Scene,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::gameplay::{self, ProtagonistConfig};
use super::script::InputScript;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DriverOptions {
    pub(crate) levels: Option<PathBuf>,
    pub(crate) script: Option<PathBuf>,
    pub(crate) ticks: Option<u64>,
    pub(crate) realtime: bool,
    pub(crate) character: String,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            levels: None,
            script: None,
            ticks: None,
            realtime: false,
            character: "hans".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Invocation {
    Run(DriverOptions),
    Help,
}

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scene: Box<dyn Scene>,
    pub(crate) input: Box<dyn InputSource>,
}

pub(crate) fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

pub(crate) fn parse_args(args: &[String]) -> Result<Invocation, String> {
    let mut options = DriverOptions::default();
    let mut index = 0usize;
    while index < args.len() {
        match args[index].as_str() {
            "-h" | "--help" => return Ok(Invocation::Help),
            "--levels" => {
                options.levels = Some(PathBuf::from(flag_value(args, index, "--levels")?));
                index += 2;
            }
            "--script" => {
                options.script = Some(PathBuf::from(flag_value(args, index, "--script")?));
                index += 2;
            }
            "--ticks" => {
                let value = flag_value(args, index, "--ticks")?;
                options.ticks = Some(
                    value
                        .parse::<u64>()
                        .map_err(|_| format!("invalid --ticks value '{value}' (expected u64)"))?,
                );
                index += 2;
            }
            "--character" => {
                options.character = flag_value(args, index, "--character")?.to_string();
                index += 2;
            }
            "--realtime" => {
                options.realtime = true;
                index += 1;
            }
            other => return Err(format!("unknown argument '{other}'")),
        }
    }
    Ok(Invocation::Run(options))
}

fn flag_value<'a>(args: &'a [String], index: usize, flag: &str) -> Result<&'a str, String> {
    args.get(index + 1)
        .map(String::as_str)
        .ok_or_else(|| format!("missing value for {flag}"))
}

pub(crate) fn usage_text() -> String {
    [
        "timeshift - headless time-travel puzzle simulation",
        "",
        "Usage:",
        "  timeshift [--levels <file>] [--script <file>] [--ticks <u64>] [--realtime] [--character <hans|grete>]",
        "",
        "Defaults:",
        "  --levels <root>/levels/manor.json",
        "  --ticks  script length when a script is given",
        "  --script bare names are also looked up in <root>/levels/scripts",
        "  --character hans",
        "",
        "Unpaced runs (the default) need --ticks or --script.",
    ]
    .join("\n")
}

pub(crate) fn build_app(options: &DriverOptions) -> Result<AppWiring, AppError> {
    info!("=== Timeshift Startup ===");

    let protagonist = ProtagonistConfig::by_name(&options.character).ok_or_else(|| {
        AppError::InvalidOption(format!(
            "unknown character '{}' (expected hans or grete)",
            options.character
        ))
    })?;
    let levels_path = match &options.levels {
        Some(path) => path.clone(),
        None => resolve_app_paths()?.default_level_pack(),
    };
    let pack = load_level_pack(&levels_path)?;
    let scene = gameplay::build_scene(&pack, protagonist)?;

    let script = options
        .script
        .as_deref()
        .map(|path| InputScript::load(&resolve_script_path(path)))
        .transpose()
        .map_err(AppError::InputScript)?;
    let max_ticks = options
        .ticks
        .or_else(|| script.as_ref().map(InputScript::duration_ticks));
    let input: Box<dyn InputSource> = match script {
        Some(script) => Box::new(script),
        None => Box::new(IdleInput),
    };

    info!(
        levels = %levels_path.display(),
        script = ?options.script,
        character = protagonist.name,
        max_ticks = ?max_ticks,
        realtime = options.realtime,
        "driver_configured"
    );

    Ok(AppWiring {
        config: LoopConfig {
            max_ticks,
            pacing: if options.realtime {
                Pacing::Realtime
            } else {
                Pacing::Unpaced
            },
            ..LoopConfig::default()
        },
        scene: Box::new(scene),
        input,
    })
}

/// Paths that do not exist as given are looked up in `<root>/levels/scripts`.
fn resolve_script_path(path: &Path) -> PathBuf {
    if path.is_absolute() || path.exists() {
        return path.to_path_buf();
    }
    match resolve_app_paths() {
        Ok(paths) if paths.scripts_dir.join(path).is_file() => paths.scripts_dir.join(path),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn flags_fill_driver_options() {
        let invocation = parse_args(&args(&[
            "--levels",
            "pack.json",
            "--ticks",
            "120",
            "--realtime",
            "--character",
            "grete",
        ]))
        .expect("args");

        assert_eq!(
            invocation,
            Invocation::Run(DriverOptions {
                levels: Some(PathBuf::from("pack.json")),
                script: None,
                ticks: Some(120),
                realtime: true,
                character: "grete".to_string(),
            })
        );
        assert_eq!(parse_args(&args(&["--help"])), Ok(Invocation::Help));
    }

    #[test]
    fn bad_flags_are_reported() {
        assert_eq!(
            parse_args(&args(&["--ticks"])),
            Err("missing value for --ticks".to_string())
        );
        assert!(parse_args(&args(&["--ticks", "soon"]))
            .expect_err("bad ticks")
            .contains("invalid --ticks"));
        assert!(parse_args(&args(&["--fly"]))
            .expect_err("unknown flag")
            .contains("--fly"));
    }

    #[test]
    fn script_length_bounds_unpaced_runs() {
        let dir = tempfile::tempdir().expect("temp dir");
        let levels = dir.path().join("pack.json");
        fs::write(
            &levels,
            r#"{"default_level": "hall", "levels": [{"name": "hall"}]}"#,
        )
        .expect("write pack");
        let script = dir.path().join("script.json");
        fs::write(
            &script,
            r#"{"steps": [{"from_tick": 0, "until_tick": 30, "actions": ["move_left"]}]}"#,
        )
        .expect("write script");

        let wiring = build_app(&DriverOptions {
            levels: Some(levels),
            script: Some(script),
            ..DriverOptions::default()
        })
        .expect("wiring");

        assert_eq!(wiring.config.max_ticks, Some(30));
        assert_eq!(wiring.config.pacing, Pacing::Unpaced);
        assert_eq!(wiring.scene.entity_count(), 0);
    }

    #[test]
    fn script_paths_fall_back_to_the_scripts_dir() {
        let dir = tempfile::tempdir().expect("temp dir");
        let existing = dir.path().join("mine.json");
        fs::write(&existing, "{}").expect("write script");
        assert_eq!(resolve_script_path(&existing), existing);

        let Ok(paths) = resolve_app_paths() else {
            return;
        };
        let shipped = paths.scripts_dir.join("demo.json");
        if shipped.is_file() {
            assert_eq!(resolve_script_path(Path::new("demo.json")), shipped);
        }
        assert_eq!(
            resolve_script_path(Path::new("nowhere.json")),
            PathBuf::from("nowhere.json")
        );
    }

    #[test]
    fn missing_level_pack_surfaces_content_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let error = build_app(&DriverOptions {
            levels: Some(dir.path().join("absent.json")),
            ..DriverOptions::default()
        })
        .err()
        .expect("missing pack");
        assert!(matches!(error, AppError::Content(_)), "{error}");
    }

    #[test]
    fn unknown_character_is_rejected() {
        let error = build_app(&DriverOptions {
            character: "fritz".to_string(),
            ..DriverOptions::default()
        })
        .err()
        .expect("unknown character");
        assert!(matches!(error, AppError::InvalidOption(_)));
        assert!(error.to_string().contains("fritz"), "{error}");
    }
}
