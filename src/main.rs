use clap::Parser;
use docsim::Settings;
use docsim::cli::commands::{init, search, serve};
use docsim::cli::{Cli, Commands};

fn load_settings(cli: &Cli) -> Settings {
    let loaded = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };
    loaded.unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        eprintln!("Falling back to default settings.");
        Settings::default()
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_settings(&cli);
    docsim::logging::init_with_config(&config.logging);

    match cli.command {
        Commands::Init { force } => init::run_init(force),
        Commands::Config => init::run_config(&config),
        Commands::Serve { bind, corpus } => {
            serve::run(serve::ServeArgs { bind, corpus }, config).await?
        }
        Commands::Similar {
            id,
            limit,
            corpus,
            json,
        } => search::run_similar(&config, &id, limit, corpus, json).await?,
        Commands::Tokens {
            prefix,
            corpus,
            json,
        } => search::run_tokens(&config, &prefix, corpus, json).await?,
    }

    Ok(())
}
