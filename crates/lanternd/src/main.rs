use std::process::ExitCode;

fn main() -> ExitCode {
    match lanternd::run_daemon() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("lanternd: {error}");
            ExitCode::FAILURE
        }
    }
}
