use std::process::ExitCode;

fn main() -> ExitCode {
    ims_tracker_cli::run()
}
