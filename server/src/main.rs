use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match pokedex_proxy::start_server().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            eprintln!("pokedex-proxy: {e}");
            ExitCode::FAILURE
        }
    }
}
