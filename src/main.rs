use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use std::fs::File;
use std::path::{Path, PathBuf};

use water_billing::config::DatabaseArgs;
use water_billing::{import_readings, init_tracing, load_csv, setup_database, store, ConsumptionRecord};

#[derive(Parser, Debug)]
#[command(name = "water-billing", version, about = "Monthly water consumption billing")]
struct Cli {
    #[command(flatten)]
    database: DatabaseArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Import readings from a CSV file (cpf,mes,ano,m3Consumidos,bandeira,possuiEsgoto)
    Import { csv: PathBuf },

    /// List all stored records
    List,

    /// Show one record
    Show { cpf: String, mes: i32, ano: i32 },

    /// Remove one record
    Remove { cpf: String, mes: i32, ano: i32 },

    /// Sum of all bills
    Total,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let conn = Connection::open(&cli.database.path)
        .with_context(|| format!("Failed to open database {:?}", cli.database.path))?;
    setup_database(&conn)?;

    match cli.command {
        Commands::Import { csv } => run_import(&conn, &csv)?,
        Commands::List => {
            let records = store::list(&conn)?;
            for record in &records {
                print_record(record);
            }
            println!("{} records", records.len());
        }
        Commands::Show { cpf, mes, ano } => {
            let record = store::find_by_key(&conn, &cpf, mes, ano)?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Commands::Remove { cpf, mes, ano } => {
            store::delete_by_key(&conn, &cpf, mes, ano)?;
            println!("✓ Removed {} {:02}/{}", cpf, mes, ano);
        }
        Commands::Total => {
            println!("{:.2}", store::aggregate_total(&conn)?);
        }
    }

    Ok(())
}

fn run_import(conn: &Connection, csv_path: &Path) -> Result<()> {
    println!("📂 Loading {:?}...", csv_path);
    let file = File::open(csv_path).with_context(|| format!("Failed to open {:?}", csv_path))?;
    let readings = load_csv(file)?;
    println!("✓ Loaded {} readings", readings.len());

    let summary = import_readings(conn, &readings)?;

    println!("✓ Created: {}", summary.created);
    if !summary.rejected.is_empty() {
        println!("✗ Rejected: {}", summary.rejected.len());
        for (row, reason) in &summary.rejected {
            println!("   row {}: {}", row, reason);
        }
    }
    println!("✓ Database contains {} records", store::count(conn)?);

    Ok(())
}

fn print_record(record: &ConsumptionRecord) {
    println!(
        "#{:<4} {:<14} {:02}/{}  {:>8.2} m³  {:<8}  esgoto={:<5}  total={:>10.2}",
        record.id,
        record.identifier,
        record.month,
        record.year,
        record.raw_volume,
        record.color_band,
        record.has_sewage_service,
        record.total_charge,
    );
}
