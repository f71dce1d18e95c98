use std::process::ExitCode;

use colored::Colorize;
use shim_config::cli;

fn main() -> ExitCode {
    let command_line_interface = cli::CommandLineInterface::load();
    cli::init_tracing(command_line_interface.verbose);
    match command_line_interface.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{} {error:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}
