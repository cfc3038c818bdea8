use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match vetdx_gateway::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            eprintln!("vetdx-gateway: {e}");
            ExitCode::FAILURE
        }
    }
}
