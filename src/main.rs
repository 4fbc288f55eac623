use notefiler::cli::commands::{CliArgs, Commands};
use notefiler::cli::handlers::{handle_config, handle_organize, handle_subjects};
use notefiler::util::logging::{init_logging, LoggingConfig};
use notefiler::VERSION;

use clap::Parser;
use tracing::debug;

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging(LoggingConfig::from_flags(
        args.log_level.as_deref(),
        args.verbose,
        args.quiet,
        args.log_json,
    ));

    debug!("notefiler v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Organize(organize_args) => handle_organize(organize_args, args.quiet).await,
        Commands::Subjects(subjects_args) => handle_subjects(subjects_args).await,
        Commands::Config(config_args) => handle_config(config_args).await,
    };

    std::process::exit(exit_code);
}
