use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "api", about = "Boxing academy payments API")]
pub struct Cli {
    /// TOML file with server, gateway, catalog and session settings
    #[arg(short, long, env = "ACADEMY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Overrides the configured port
    #[arg(short, long)]
    pub port: Option<u16>,
}
