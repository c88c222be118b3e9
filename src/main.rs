//! Spritemapper - command-line tool for collecting CSS spritemap listings

use std::process::ExitCode;

use spritemapper::cli;

fn main() -> ExitCode {
    cli::run()
}
