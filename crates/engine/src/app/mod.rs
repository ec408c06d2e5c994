mod animation;
mod audio;
mod geometry;
mod input;
mod loop_runner;
mod metrics;
mod scene;

pub use animation::{AnimationLibrary, StaticAnimationLibrary};
pub use audio::{AudioEvent, AudioSink, CueLedger, CueMode, RecordingAudioSink, TracingAudioSink};
pub use geometry::{Rect, Vec2};
pub use input::{IdleInput, InputAction, InputSnapshot, InputSource};
pub use loop_runner::{
    run_headless, run_headless_with_metrics, AppError, LoopConfig, Pacing, RunEnd, RunSummary,
    SLOW_FRAME_ENV_VAR,
};
pub use metrics::{LoopMetricsSnapshot, MetricsHandle};
pub use scene::{
    Camera2D, Scene, SceneCommand, SceneDebugCommand, SceneDebugCommandResult,
    DEFAULT_VIEWPORT_HEIGHT, DEFAULT_VIEWPORT_WIDTH,
};
