mod bootstrap;
mod gameplay;
mod loop_runner;

use std::process::ExitCode;

pub(crate) fn run() -> ExitCode {
    bootstrap::init_tracing();
    loop_runner::run(bootstrap::build_app())
}
