use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    showtally_cli::run().await
}
