//! CLI entry point.

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use arielle_cli::{Cli, CliConfig, Commands, OutputMode, bootstrap, handlers};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables (HF_TOKEN, ARIELLE_*)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = CliConfig::from_cli(&cli);
    init_tracing(cli.verbose, config.output);

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let ctx = bootstrap(config);
    let result = match command {
        Commands::Download { model_id, name } => {
            handlers::download::execute(&ctx, &model_id, name.as_deref()).await
        }
        Commands::Watch { model_ids } => handlers::watch::execute(&ctx, &model_ids).await,
    };
    ctx.shutdown().await;
    result
}

/// `RUST_LOG` wins; otherwise progress bars keep logs to warnings.
fn init_tracing(verbose: bool, output: OutputMode) {
    let default = match (verbose, output) {
        (true, _) => "debug",
        (false, OutputMode::Plain) => "info",
        (false, OutputMode::Terminal) => "warn",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
