// src/main.rs

use runwarden::cli::{self, Command};
use runwarden::logging::{self, Verbosity};
use runwarden::run;

#[tokio::main]
async fn main() {
    let cli = match cli::parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() { 1 } else { 0 };
            let _ = err.print();
            std::process::exit(code);
        }
    };

    let verbosity = match &cli.command {
        Command::Run(args) => Verbosity::from_flags(args.verbose, args.quiet),
    };
    if let Err(err) = logging::init_logging(verbosity) {
        eprintln!("runwarden: {err:?}");
    }

    std::process::exit(run(cli).await);
}
