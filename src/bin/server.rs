use anyhow::Result;
use clap::Parser;
use std::net::IpAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spanrs::server::utils::{port_in_range, shutdown_signal, threads_in_range};
use spanrs::server::{Mode, Server, ServerConfig};

#[derive(Debug, Parser)]
#[command(version, about = "Minimum spanning tree analysis server")]
pub struct App {
    /// JSON configuration file. Flags override its values.
    #[clap(short, long)]
    pub config: Option<PathBuf>,

    #[clap(short, long, value_enum)]
    pub mode: Option<Mode>,

    #[arg(value_parser = threads_in_range)]
    #[clap(short, long)]
    pub threads: Option<usize>,

    #[arg(value_parser = port_in_range)]
    #[clap(short, long)]
    pub port: Option<u16>,

    #[clap(long)]
    pub host: Option<IpAddr>,
}

impl App {
    fn server_config(&self) -> Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::from_file(path)?,
            None => ServerConfig::default(),
        };
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(host) = self.host {
            config.host = host;
        }
        Ok(config)
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<ExitCode> {
    let args = App::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                eprintln!("No environment variables found that can initialize tracing_subscriber::EnvFilter. Using defaults.");
                "spanrs=debug,server=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = args.server_config()?;
    let server = Server::bind(config).await?;
    server.run(shutdown_signal()).await?;

    Ok(ExitCode::SUCCESS)
}
