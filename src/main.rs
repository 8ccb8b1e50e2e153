use std::process::ExitCode;

fn main() -> ExitCode {
    multirepo::cli::run()
}
