use serde::{Deserialize, Serialize};

use super::audio::AudioSink;
use super::geometry::{Rect, Vec2};
use super::input::InputSnapshot;

pub const DEFAULT_VIEWPORT_WIDTH: u32 = 480;
pub const DEFAULT_VIEWPORT_HEIGHT: u32 = 270;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    /// Active play ended; the host shows its out-of-game surface.
    LeavePlay,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum SceneDebugCommand {
    GoToLevel { name: String },
    SetTimePeriod { period: String },
    ReloadLevel { preserve_time: bool },
    DumpState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneDebugCommandResult {
    Unsupported,
    Success(String),
    Error(String),
}

/// Derived view position. Recomputed from the followed target every frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera2D {
    pub center: Vec2,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Default for Camera2D {
    fn default() -> Self {
        Self {
            center: Vec2::ZERO,
            viewport_width: DEFAULT_VIEWPORT_WIDTH,
            viewport_height: DEFAULT_VIEWPORT_HEIGHT,
        }
    }
}

impl Camera2D {
    pub fn with_viewport(viewport_width: u32, viewport_height: u32) -> Self {
        Self {
            viewport_width,
            viewport_height,
            ..Self::default()
        }
    }

    /// Centers on `target`, keeping the viewport inside `bounds` where it fits.
    pub fn follow(&mut self, target: Vec2, bounds: Rect) {
        self.center = Vec2::new(
            clamp_axis(
                target.x,
                bounds.left() as f32,
                bounds.right() as f32,
                self.viewport_width as f32,
            ),
            clamp_axis(
                target.y,
                bounds.top() as f32,
                bounds.bottom() as f32,
                self.viewport_height as f32,
            ),
        );
    }

    pub fn visible_rect(&self) -> Rect {
        Rect::from_position(
            Vec2::new(
                self.center.x - self.viewport_width as f32 / 2.0,
                self.center.y - self.viewport_height as f32 / 2.0,
            ),
            self.viewport_width as i32,
            self.viewport_height as i32,
        )
    }
}

fn clamp_axis(target: f32, min: f32, max: f32, extent: f32) -> f32 {
    let half = extent / 2.0;
    if max - min <= extent {
        return (min + max) / 2.0;
    }
    target.clamp(min + half, max - half)
}

pub trait Scene {
    fn load(&mut self);
    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        audio: &mut dyn AudioSink,
    ) -> SceneCommand;
    fn unload(&mut self);
    fn debug_title(&self) -> Option<String> {
        None
    }
    fn entity_count(&self) -> usize {
        0
    }
    fn execute_debug_command(
        &mut self,
        _command: SceneDebugCommand,
        _audio: &mut dyn AudioSink,
    ) -> SceneDebugCommandResult {
        SceneDebugCommandResult::Unsupported
    }
}

pub(crate) struct SceneRuntime {
    scene: Box<dyn Scene>,
    is_loaded: bool,
}

impl SceneRuntime {
    pub(crate) fn new(scene: Box<dyn Scene>) -> Self {
        Self {
            scene,
            is_loaded: false,
        }
    }

    pub(crate) fn load_if_needed(&mut self) {
        if self.is_loaded {
            return;
        }
        self.scene.load();
        self.is_loaded = true;
    }

    pub(crate) fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        audio: &mut dyn AudioSink,
    ) -> SceneCommand {
        self.load_if_needed();
        self.scene.update(fixed_dt_seconds, input, audio)
    }

    pub(crate) fn execute_debug_command(
        &mut self,
        command: SceneDebugCommand,
        audio: &mut dyn AudioSink,
    ) -> SceneDebugCommandResult {
        self.load_if_needed();
        self.scene.execute_debug_command(command, audio)
    }

    pub(crate) fn entity_count(&self) -> usize {
        self.scene.entity_count()
    }

    pub(crate) fn debug_title(&self) -> Option<String> {
        self.scene.debug_title()
    }

    pub(crate) fn shutdown(&mut self) {
        if self.is_loaded {
            self.scene.unload();
            self.is_loaded = false;
        }
    }
}
