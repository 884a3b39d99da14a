use std::process::ExitCode;

fn main() -> ExitCode {
    match bitlamp::cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("bitlamp: {e:#}");
            ExitCode::FAILURE
        }
    }
}
