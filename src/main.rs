use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match salesdesk_lib::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Gateway exited");
            eprintln!("salesdesk-gateway: {e}");
            ExitCode::FAILURE
        }
    }
}
