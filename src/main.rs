use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match pharmaguard_lib::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("pharmaguard: {e}");
            ExitCode::FAILURE
        }
    }
}
