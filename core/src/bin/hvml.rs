/// HVML command-line runner
///
/// Loads vDOM documents and runs each one as a coroutine on the tokio driver
/// with the headless renderer.

use hvml_core::cli;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    if let Err(e) = cli::run_cli().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
