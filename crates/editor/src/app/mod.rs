use std::env;
use std::process::ExitCode;

use tracing::error;

mod bootstrap;
mod loop_runner;

pub(crate) fn main_entry() -> ExitCode {
    let args = env::args().skip(1).collect::<Vec<_>>();
    let options = match bootstrap::parse_args(&args) {
        Ok(bootstrap::CliCommand::Run(options)) => options,
        Ok(bootstrap::CliCommand::Help) => {
            println!("{}", bootstrap::usage_text());
            return ExitCode::SUCCESS;
        }
        Err(message) => {
            eprintln!("{message}\n\n{}", bootstrap::usage_text());
            return ExitCode::from(2);
        }
    };

    bootstrap::init_tracing();
    match bootstrap::build_app(options) {
        Ok(app) => loop_runner::run(app),
        Err(message) => {
            error!(error = %message, "startup_failed");
            ExitCode::FAILURE
        }
    }
}
