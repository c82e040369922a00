// Water Billing - Web Server

use anyhow::{Context, Result};
use clap::Parser;
use rusqlite::Connection;
use tracing::info;
use water_billing::api::{router, AppState};
use water_billing::config::{DatabaseArgs, ServerArgs};
use water_billing::{init_tracing, setup_database};

#[derive(Parser, Debug)]
#[command(name = "water-billing-server", version, about = "Water billing REST API")]
struct Cli {
    #[command(flatten)]
    database: DatabaseArgs,

    #[command(flatten)]
    server: ServerArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let conn = Connection::open(&cli.database.path)
        .with_context(|| format!("Failed to open database {:?}", cli.database.path))?;
    setup_database(&conn)?;
    info!(path = ?cli.database.path, "database ready");

    let app = router(AppState::new(conn));

    let listener = tokio::net::TcpListener::bind(&cli.server.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", cli.server.bind))?;

    info!("server listening on http://{}", cli.server.bind);
    info!("API: http://{}/api/consumo/listar", cli.server.bind);

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
