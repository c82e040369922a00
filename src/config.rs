use clap::Args;
use std::path::PathBuf;

pub const DEFAULT_DB_PATH: &str = "consumo.db";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Database location, shared by the CLI and the server
#[derive(Args, Debug, Clone)]
pub struct DatabaseArgs {
    /// SQLite database file (created if missing)
    #[arg(long = "database", short = 'd', env = "WATER_BILLING_DB", default_value = DEFAULT_DB_PATH, global = true)]
    pub path: PathBuf,
}

/// Listener settings for the HTTP server
#[derive(Args, Debug, Clone)]
pub struct ServerArgs {
    /// Address to bind, host:port
    #[arg(long, short = 'b', env = "WATER_BILLING_ADDR", default_value = DEFAULT_BIND_ADDR)]
    pub bind: String,
}
