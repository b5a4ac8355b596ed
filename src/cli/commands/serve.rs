//! Serve command - HTTP server.

use std::path::PathBuf;

use crate::config::Settings;

/// Arguments for the serve command.
pub struct ServeArgs {
    pub bind: Option<String>,
    pub corpus: Option<PathBuf>,
}

/// Run the serve command. CLI flags win over the loaded settings.
#[cfg(feature = "http-server")]
pub async fn run(args: ServeArgs, mut config: Settings) -> anyhow::Result<()> {
    if let Some(corpus) = args.corpus {
        config.store.corpus_path = corpus;
    }
    let bind = args.bind.unwrap_or_else(|| config.server.bind.clone());
    crate::server::serve_http(config, bind).await
}

#[cfg(not(feature = "http-server"))]
pub async fn run(_args: ServeArgs, _config: Settings) -> anyhow::Result<()> {
    eprintln!("HTTP server support is not compiled in.");
    eprintln!("Please rebuild with: cargo build --features http-server");
    std::process::exit(1);
}
