use std::process::ExitCode;

fn main() -> ExitCode {
    applypilot_cli::run()
}
