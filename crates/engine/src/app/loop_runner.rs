use std::env;
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{info, warn};

use crate::{ContentError, StartupError};

use super::audio::AudioSink;
use super::input::InputSource;
use super::metrics::MetricsAccumulator;
use super::scene::{SceneDebugCommandResult, SceneRuntime};
use super::{MetricsHandle, Scene, SceneCommand};

pub const SLOW_FRAME_ENV_VAR: &str = "TIMESHIFT_SLOW_FRAME_MS";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    /// Ticks follow the wall clock through a fixed-step accumulator.
    Realtime,
    /// Ticks run back to back; used for replays and tests.
    Unpaced,
}

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    pub max_ticks: Option<u64>,
    pub pacing: Pacing,
    pub simulated_slow_frame_ms: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(1),
            max_ticks: None,
            pacing: Pacing::Realtime,
            simulated_slow_frame_ms: 0,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("failed to load level content: {0}")]
    Content(#[from] ContentError),
    #[error("invalid launch option: {0}")]
    InvalidOption(String),
    #[error("failed to load input script: {0}")]
    InputScript(String),
    #[error("unpaced runs need a tick limit")]
    UnboundedUnpacedRun,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEnd {
    TickLimit,
    QuitRequested,
    SceneQuit,
    LeftPlay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub end: RunEnd,
}

pub fn run_headless(
    config: LoopConfig,
    scene: Box<dyn Scene>,
    input: &mut dyn InputSource,
    audio: &mut dyn AudioSink,
) -> Result<RunSummary, AppError> {
    run_headless_with_metrics(config, scene, input, audio, MetricsHandle::default())
}

pub fn run_headless_with_metrics(
    config: LoopConfig,
    scene: Box<dyn Scene>,
    input: &mut dyn InputSource,
    audio: &mut dyn AudioSink,
    metrics_handle: MetricsHandle,
) -> Result<RunSummary, AppError> {
    if config.pacing == Pacing::Unpaced && config.max_ticks.is_none() {
        return Err(AppError::UnboundedUnpacedRun);
    }

    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let slow_frame_delay = resolve_slow_frame_delay(config.simulated_slow_frame_ms);

    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        slow_frame_delay_ms = slow_frame_delay.as_millis() as u64,
        pacing = ?config.pacing,
        max_ticks = ?config.max_ticks,
        "loop_config"
    );

    let mut driver = TickDriver {
        runtime: SceneRuntime::new(scene),
        fixed_dt_seconds: fixed_dt.as_secs_f32(),
        max_ticks: config.max_ticks,
        metrics: MetricsAccumulator::new(metrics_log_interval, Instant::now()),
        metrics_handle,
    };
    driver.runtime.load_if_needed();
    info!(
        entity_count = driver.runtime.entity_count(),
        title = %driver.runtime.debug_title().unwrap_or_default(),
        "scene_loaded"
    );

    let end = match config.pacing {
        Pacing::Unpaced => loop {
            if let Some(end) = driver.step(input, audio) {
                break end;
            }
            driver.maybe_publish_metrics(Instant::now());
        },
        Pacing::Realtime => {
            let mut accumulator = Duration::ZERO;
            let mut last_frame_instant = Instant::now();
            'frames: loop {
                if slow_frame_delay > Duration::ZERO {
                    // Explicit debug perturbation only.
                    thread::sleep(slow_frame_delay);
                }

                let now = Instant::now();
                let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                last_frame_instant = now;
                accumulator = accumulator
                    .saturating_add(clamp_frame_delta(raw_frame_dt, max_frame_delta));

                let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
                for _ in 0..step_plan.ticks_to_run {
                    if let Some(end) = driver.step(input, audio) {
                        break 'frames end;
                    }
                }
                accumulator = step_plan.remaining_accumulator;

                if step_plan.dropped_backlog > Duration::ZERO {
                    warn!(
                        dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                        max_ticks_per_frame, "sim_clamp_triggered"
                    );
                }

                driver.maybe_publish_metrics(now);
                let busy = Instant::now().saturating_duration_since(now);
                let idle = fixed_dt.saturating_sub(accumulator).saturating_sub(busy);
                if idle > Duration::ZERO {
                    thread::sleep(idle);
                }
            }
        }
    };

    driver.runtime.shutdown();
    let summary = RunSummary {
        ticks: driver.metrics.ticks_total(),
        end,
    };
    info!(ticks = summary.ticks, end = ?summary.end, "shutdown");
    Ok(summary)
}

struct TickDriver {
    runtime: SceneRuntime,
    fixed_dt_seconds: f32,
    max_ticks: Option<u64>,
    metrics: MetricsAccumulator,
    metrics_handle: MetricsHandle,
}

impl TickDriver {
    fn step(&mut self, input: &mut dyn InputSource, audio: &mut dyn AudioSink) -> Option<RunEnd> {
        let tick = self.metrics.ticks_total();
        if self.max_ticks.is_some_and(|max| tick >= max) {
            return Some(RunEnd::TickLimit);
        }

        for command in input.debug_commands_for_tick(tick) {
            match self.runtime.execute_debug_command(command.clone(), audio) {
                SceneDebugCommandResult::Success(message) => {
                    info!(tick, ?command, message = %message, "debug_command_applied")
                }
                SceneDebugCommandResult::Error(message) => {
                    warn!(tick, ?command, message = %message, "debug_command_failed")
                }
                SceneDebugCommandResult::Unsupported => {
                    warn!(tick, ?command, "debug_command_unsupported")
                }
            }
        }

        let snapshot = input.snapshot_for_tick(tick);
        if snapshot.quit_requested() {
            info!(tick, reason = "input_quit", "shutdown_requested");
            return Some(RunEnd::QuitRequested);
        }

        let started = Instant::now();
        let command = self.runtime.update(self.fixed_dt_seconds, &snapshot, audio);
        self.metrics
            .record_tick(Instant::now().saturating_duration_since(started));

        match command {
            SceneCommand::None => None,
            SceneCommand::LeavePlay => {
                info!(tick, "left_play");
                Some(RunEnd::LeftPlay)
            }
            SceneCommand::Quit => {
                info!(tick, reason = "scene_quit", "shutdown_requested");
                Some(RunEnd::SceneQuit)
            }
        }
    }

    fn maybe_publish_metrics(&mut self, now: Instant) {
        if let Some(snapshot) = self.metrics.maybe_snapshot(now) {
            self.metrics_handle.publish(snapshot);
            info!(
                tps = snapshot.tps,
                update_time_ms = snapshot.update_time_ms,
                max_update_time_ms = snapshot.max_update_time_ms,
                ticks_total = snapshot.ticks_total,
                entity_count = self.runtime.entity_count(),
                "loop_metrics"
            );
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(accumulator: Duration, fixed_dt: Duration, max_ticks_per_frame: u32) -> StepPlan {
    let mut remaining = accumulator;
    let mut ticks_to_run = 0u32;
    while remaining >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        remaining -= fixed_dt;
        ticks_to_run += 1;
    }

    let dropped_backlog = if remaining >= fixed_dt {
        let dropped = remaining;
        remaining = Duration::ZERO;
        dropped
    } else {
        Duration::ZERO
    };

    StepPlan {
        ticks_to_run,
        remaining_accumulator: remaining,
        dropped_backlog,
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn resolve_slow_frame_delay(config_slow_frame_ms: u64) -> Duration {
    match env::var(SLOW_FRAME_ENV_VAR) {
        Ok(raw) => match raw.trim().parse::<u64>() {
            Ok(ms) => Duration::from_millis(ms),
            Err(_) => {
                warn!(value = %raw, var = SLOW_FRAME_ENV_VAR, "invalid_slow_frame_value");
                Duration::from_millis(config_slow_frame_ms)
            }
        },
        Err(_) => Duration::from_millis(config_slow_frame_ms),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::audio::RecordingAudioSink;
    use crate::app::input::{IdleInput, InputAction, InputSnapshot};
    use crate::app::SceneDebugCommand;

    struct CountingScene {
        updates: u64,
        leave_after: Option<u64>,
    }

    impl Scene for CountingScene {
        fn load(&mut self) {}

        fn update(
            &mut self,
            _fixed_dt_seconds: f32,
            _input: &InputSnapshot,
            _audio: &mut dyn AudioSink,
        ) -> SceneCommand {
            self.updates += 1;
            if self.leave_after == Some(self.updates) {
                SceneCommand::LeavePlay
            } else {
                SceneCommand::None
            }
        }

        fn unload(&mut self) {}
    }

    struct QuitAt(u64);

    impl InputSource for QuitAt {
        fn snapshot_for_tick(&mut self, tick: u64) -> InputSnapshot {
            InputSnapshot::empty().with_action_down(InputAction::Quit, tick >= self.0)
        }

        fn debug_commands_for_tick(&mut self, tick: u64) -> Vec<SceneDebugCommand> {
            if tick == 0 {
                vec![SceneDebugCommand::DumpState]
            } else {
                Vec::new()
            }
        }
    }

    fn unpaced(max_ticks: u64) -> LoopConfig {
        LoopConfig {
            pacing: Pacing::Unpaced,
            max_ticks: Some(max_ticks),
            ..LoopConfig::default()
        }
    }

    #[test]
    fn clamp_frame_delta_caps_large_frame() {
        let max_frame_delta = Duration::from_millis(250);
        assert_eq!(
            clamp_frame_delta(Duration::from_millis(600), max_frame_delta),
            max_frame_delta
        );
    }

    #[test]
    fn plan_sim_steps_runs_expected_ticks_without_drop() {
        let result = plan_sim_steps(Duration::from_millis(48), Duration::from_millis(16), 5);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::ZERO);
    }

    #[test]
    fn plan_sim_steps_drops_backlog_when_tick_cap_hit() {
        let result = plan_sim_steps(Duration::from_millis(120), Duration::from_millis(16), 3);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::from_millis(72));
    }

    #[test]
    fn unpaced_run_stops_at_tick_limit() {
        let scene = CountingScene {
            updates: 0,
            leave_after: None,
        };
        let mut audio = RecordingAudioSink::default();
        let summary =
            run_headless(unpaced(12), Box::new(scene), &mut IdleInput, &mut audio).expect("run");

        assert_eq!(summary.ticks, 12);
        assert_eq!(summary.end, RunEnd::TickLimit);
    }

    #[test]
    fn quit_input_ends_run_before_update() {
        let scene = CountingScene {
            updates: 0,
            leave_after: None,
        };
        let mut audio = RecordingAudioSink::default();
        let summary =
            run_headless(unpaced(100), Box::new(scene), &mut QuitAt(4), &mut audio).expect("run");

        assert_eq!(summary.ticks, 4);
        assert_eq!(summary.end, RunEnd::QuitRequested);
    }

    #[test]
    fn leave_play_command_ends_run() {
        let scene = CountingScene {
            updates: 0,
            leave_after: Some(3),
        };
        let mut audio = RecordingAudioSink::default();
        let summary =
            run_headless(unpaced(100), Box::new(scene), &mut IdleInput, &mut audio).expect("run");

        assert_eq!(summary.ticks, 3);
        assert_eq!(summary.end, RunEnd::LeftPlay);
    }

    #[test]
    fn unpaced_without_limit_is_rejected() {
        let scene = CountingScene {
            updates: 0,
            leave_after: None,
        };
        let config = LoopConfig {
            pacing: Pacing::Unpaced,
            ..LoopConfig::default()
        };
        let mut audio = RecordingAudioSink::default();
        let result = run_headless(config, Box::new(scene), &mut IdleInput, &mut audio);
        assert!(matches!(result, Err(AppError::UnboundedUnpacedRun)));
    }

    #[test]
    fn normalize_non_zero_duration_uses_fallback_for_zero() {
        let fallback = Duration::from_secs(1);
        assert_eq!(normalize_non_zero_duration(Duration::ZERO, fallback), fallback);
        assert_eq!(
            normalize_non_zero_duration(Duration::from_millis(5), fallback),
            Duration::from_millis(5)
        );
    }
}
