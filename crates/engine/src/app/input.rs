use serde::{Deserialize, Serialize};

use super::scene::SceneDebugCommand;

/// Logical actions a device layer may report. The simulation only ever asks
/// whether one of these is active; it never sees raw device state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputAction {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    Action,
    Modifier,
    AltMoveUp,
    AltMoveDown,
    AltMoveLeft,
    AltMoveRight,
    AltAction,
    AltModifier,
    Quit,
}

const ACTION_COUNT: usize = 13;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }
}

impl InputAction {
    const fn index(self) -> usize {
        match self {
            InputAction::MoveUp => 0,
            InputAction::MoveDown => 1,
            InputAction::MoveLeft => 2,
            InputAction::MoveRight => 3,
            InputAction::Action => 4,
            InputAction::Modifier => 5,
            InputAction::AltMoveUp => 6,
            InputAction::AltMoveDown => 7,
            InputAction::AltMoveLeft => 8,
            InputAction::AltMoveRight => 9,
            InputAction::AltAction => 10,
            InputAction::AltModifier => 11,
            InputAction::Quit => 12,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputSnapshot {
    actions: ActionStates,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn quit_requested(&self) -> bool {
        self.actions.is_down(InputAction::Quit)
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.actions.set(action, is_down);
        self
    }

    pub fn with_actions_down(self, actions: &[InputAction]) -> Self {
        actions
            .iter()
            .fold(self, |snapshot, action| snapshot.with_action_down(*action, true))
    }
}

/// Supplies one input snapshot per simulation tick.
pub trait InputSource {
    fn snapshot_for_tick(&mut self, tick: u64) -> InputSnapshot;

    fn debug_commands_for_tick(&mut self, _tick: u64) -> Vec<SceneDebugCommand> {
        Vec::new()
    }
}

/// Input source that never reports anything; the scene idles.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdleInput;

impl InputSource for IdleInput {
    fn snapshot_for_tick(&mut self, _tick: u64) -> InputSnapshot {
        InputSnapshot::empty()
    }
}
