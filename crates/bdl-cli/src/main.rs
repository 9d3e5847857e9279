mod cli;

use crate::cli::CliCommand;

#[tokio::main]
async fn main() {
    // Parse CLI and dispatch. Logging is set up per command, since the
    // download log location comes from the job config.
    match CliCommand::run_from_args().await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            eprintln!("bdl error: {:#}", err);
            std::process::exit(1);
        }
    }
}
