use crate::config::Config;
use crate::dashboard::{self, Dashboard};
use crate::sources::PlexClient;
use clap::Parser;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug, Clone)]
#[command(name = "plex-info-server")]
#[command(about = "Local web dashboard for plex-info reports")]
#[command(version)]
pub struct ServerCli {
    /// Port to listen on (default: 9924)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    pub host: IpAddr,

    /// TOML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl ServerCli {
    pub async fn run(&self) -> anyhow::Result<()> {
        let config = Config::load(self.config.as_deref())?;
        let port = self.port.unwrap_or(config.dashboard_port);

        let plex = PlexClient::new(&config)?;
        let dashboard = Dashboard::new(Arc::new(plex));

        dashboard::serve(dashboard, (self.host, port).into()).await?;
        Ok(())
    }
}
