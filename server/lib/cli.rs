use std::{ net::SocketAddr, path::PathBuf };
use anyhow::{ Context, Result };
use clap::Parser;
use log::LevelFilter;
use crate::{
    config::ServerConfig,
    logging::logger_init,
    routes::{ router, AppState },
};

/// HTTP service for grid-based Schrödinger equation solves.
#[derive(Debug, Parser)]
#[command(name = "tdse-server", version)]
pub struct Cli {
    /// TOML configuration file; defaults are used for anything it omits.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to listen on; overrides the config file.
    #[arg(short, long)]
    pub bind: Option<SocketAddr>,

    /// Maximum log level; overrides the config file.
    #[arg(short, long)]
    pub log_level: Option<LevelFilter>,
}

impl Cli {
    /// Read the config file, if any, and apply command-line overrides.
    pub fn load_config(&self) -> Result<ServerConfig> {
        let mut config
            = match &self.config {
                Some(path) => ServerConfig::from_file(path)?,
                None => ServerConfig::default(),
            };
        if let Some(bind) = self.bind { config.bind = bind; }
        if let Some(level) = self.log_level { config.log_level = level; }
        Ok(config)
    }
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;
    logger_init(config.log_level, config.log_file.as_deref())?;
    match &config.log_file {
        Some(path) => log::info!("logging to stderr and {}", path.display()),
        None => log::info!("logging to stderr"),
    }
    log::debug!("{:?}", config.limits);

    let app = router(AppState::new(config.limits));
    let listener
        = tokio::net::TcpListener::bind(config.bind).await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    log::info!("serving on http://{}", config.bind);
    axum::serve(listener, app).await?;
    Ok(())
}
