use std::path::PathBuf;

use clap::Parser;

mod application;
mod config;
mod domain;
mod logger;
mod server;

#[derive(Parser, Debug, Default)]
#[command(version, about)]
struct Args {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Sets a port to start the provisioner server
    #[arg(short, long)]
    pub port: Option<u16>,
    /// Sets the base URL of the Grafana instance to provision
    #[arg(long)]
    pub grafana_endpoint: Option<String>,
    /// Sets the JWKS endpoint of the identity provider
    #[arg(long)]
    pub jwks_url: Option<String>,
    /// Sets the audience tokens must be issued for
    #[arg(long)]
    pub audience: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let app_config = config::load_config(args)?;

    logger::init_logger(&app_config.logger);

    let application = application::init(&app_config)?;

    server::run(application, (&app_config).into()).await?;
    Ok(())
}
