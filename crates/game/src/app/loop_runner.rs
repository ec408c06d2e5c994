use std::process::ExitCode;

use engine::{run_headless, RunEnd, TracingAudioSink};
use tracing::{error, info};

use super::bootstrap::AppWiring;

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let AppWiring {
        config,
        scene,
        mut input,
    } = app;
    let mut audio = TracingAudioSink::default();

    match run_headless(config, scene, input.as_mut(), &mut audio) {
        Ok(summary) => {
            info!(
                ticks = summary.ticks,
                end = ?summary.end,
                cues_played = audio.played_count(),
                "run_finished"
            );
            if summary.end == RunEnd::LeftPlay {
                info!("returned_to_title");
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "run_failed");
            ExitCode::FAILURE
        }
    }
}
