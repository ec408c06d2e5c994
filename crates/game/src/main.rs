mod app;

use std::process::ExitCode;

use app::bootstrap::{self, Invocation};
use tracing::error;

fn main() -> ExitCode {
    bootstrap::init_tracing();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let options = match bootstrap::parse_args(&args) {
        Ok(Invocation::Run(options)) => options,
        Ok(Invocation::Help) => {
            println!("{}", bootstrap::usage_text());
            return ExitCode::SUCCESS;
        }
        Err(message) => {
            eprintln!("{message}\n\n{}", bootstrap::usage_text());
            return ExitCode::from(2);
        }
    };

    match bootstrap::build_app(&options) {
        Ok(app) => app::loop_runner::run(app),
        Err(err) => {
            error!(error = %err, "startup_failed");
            ExitCode::FAILURE
        }
    }
}
