use std::fs;
use std::path::Path;

use engine::{InputAction, InputSnapshot, InputSource, SceneDebugCommand};
use serde::Deserialize;

pub(crate) type ScriptResult<T> = Result<T, String>;

/// Actions held down for every tick in `[from_tick, until_tick)`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct ScriptStep {
    pub(crate) from_tick: u64,
    pub(crate) until_tick: u64,
    #[serde(default)]
    pub(crate) actions: Vec<InputAction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct ScheduledCommand {
    pub(crate) tick: u64,
    #[serde(flatten)]
    pub(crate) command: SceneDebugCommand,
}

/// Replayable input for headless runs. Overlapping steps combine their
/// actions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub(crate) struct InputScript {
    #[serde(default)]
    pub(crate) steps: Vec<ScriptStep>,
    #[serde(default)]
    pub(crate) commands: Vec<ScheduledCommand>,
}

impl InputScript {
    pub(crate) fn load(path: &Path) -> ScriptResult<InputScript> {
        let raw = fs::read_to_string(path)
            .map_err(|error| format!("read script '{}': {error}", path.display()))?;
        Self::parse(&raw)
    }

    pub(crate) fn parse(raw: &str) -> ScriptResult<InputScript> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        let script = match serde_path_to_error::deserialize::<_, InputScript>(&mut deserializer) {
            Ok(script) => script,
            Err(error) => {
                let path = error.path().to_string();
                let source = error.into_inner();
                return if path.is_empty() || path == "." {
                    Err(format!("parse script json: {source}"))
                } else {
                    Err(format!("parse script json at {path}: {source}"))
                };
            }
        };
        script.validate()?;
        Ok(script)
    }

    fn validate(&self) -> ScriptResult<()> {
        for (index, step) in self.steps.iter().enumerate() {
            if step.until_tick <= step.from_tick {
                return Err(format!(
                    "validation failed at steps[{index}]: until_tick {} must be after from_tick {}",
                    step.until_tick, step.from_tick
                ));
            }
        }
        Ok(())
    }

    /// Ticks needed to play every step and command.
    pub(crate) fn duration_ticks(&self) -> u64 {
        let last_step = self.steps.iter().map(|step| step.until_tick).max();
        let last_command = self
            .commands
            .iter()
            .map(|command| command.tick.saturating_add(1))
            .max();
        last_step.max(last_command).unwrap_or(0)
    }
}

impl InputSource for InputScript {
    fn snapshot_for_tick(&mut self, tick: u64) -> InputSnapshot {
        self.steps
            .iter()
            .filter(|step| (step.from_tick..step.until_tick).contains(&tick))
            .fold(InputSnapshot::empty(), |snapshot, step| {
                snapshot.with_actions_down(&step.actions)
            })
    }

    fn debug_commands_for_tick(&mut self, tick: u64) -> Vec<SceneDebugCommand> {
        self.commands
            .iter()
            .filter(|scheduled| scheduled.tick == tick)
            .map(|scheduled| scheduled.command.clone())
            .collect()
    }
}
