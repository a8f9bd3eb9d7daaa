use clap::Parser;
use ddsls_runner::{execute_instrument, execute_monitors, execute_rewrite_definition, Cli, Commands};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match &cli.command {
        Commands::Instrument(command) => execute_instrument(command),
        Commands::RewriteDefinition(command) => execute_rewrite_definition(command),
        Commands::Monitors(command) => execute_monitors(command),
    };

    match result {
        Ok(output) => {
            println!("{output}");
        }
        Err(error) => {
            eprintln!("{error}");
            std::process::exit(1);
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).without_time().with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
