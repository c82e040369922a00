use anyhow::{Context, Result};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::billing::{Bill, ColorBand};

/// Stored consumption record. Billing fields are computed once at creation
/// and never recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionRecord {
    pub id: i64,

    // ========================================================================
    // READING (as submitted)
    // ========================================================================
    #[serde(rename = "cpf")]
    pub identifier: String,

    #[serde(rename = "mes")]
    pub month: i32,

    #[serde(rename = "ano")]
    pub year: i32,

    #[serde(rename = "m3Consumidos")]
    pub raw_volume: f64,

    #[serde(rename = "bandeira")]
    pub color_band: ColorBand,

    #[serde(rename = "possuiEsgoto")]
    pub has_sewage_service: bool,

    // ========================================================================
    // BILL (rounded to 2 decimal places)
    // ========================================================================
    #[serde(rename = "faturaDoConsumo")]
    pub billable_volume: f64,

    #[serde(rename = "tarifa")]
    pub unit_rate: f64,

    #[serde(rename = "valorAgua")]
    pub water_charge: f64,

    #[serde(rename = "adicionalDaBandeira")]
    pub band_surcharge: f64,

    #[serde(rename = "taxaEsgoto")]
    pub sewage_charge: f64,

    #[serde(rename = "total")]
    pub total_charge: f64,
}

/// Incoming reading, from an HTTP body or a CSV row.
/// Missing fields fall back to defaults and are caught by validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewConsumption {
    #[serde(rename = "cpf")]
    pub identifier: String,

    #[serde(rename = "mes")]
    pub month: i32,

    #[serde(rename = "ano")]
    pub year: i32,

    #[serde(rename = "m3Consumidos")]
    pub raw_volume: f64,

    #[serde(rename = "bandeira")]
    pub color_band: String,

    #[serde(rename = "possuiEsgoto")]
    pub has_sewage_service: bool,
}

impl ToSql for ColorBand {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for ColorBand {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let name = value.as_str()?;
        ColorBand::parse(name)
            .ok_or_else(|| FromSqlError::Other(format!("unknown color band: {}", name).into()))
    }
}

const RECORD_COLUMNS: &str = "id, cpf, mes, ano, m3_consumidos, bandeira, possui_esgoto,
    fatura_do_consumo, tarifa, valor_agua, adicional_da_bandeira, taxa_esgoto, total";

/// Create the consumption table if it does not exist. Safe to call on
/// every startup.
pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")
        .context("Failed to enable WAL journal mode")?;

    // UNIQUE(cpf, mes, ano) keeps one record per key even when two writers
    // pass the existence check at the same time.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS consumos_agua (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            cpf TEXT NOT NULL,
            mes INTEGER NOT NULL,
            ano INTEGER NOT NULL,
            m3_consumidos REAL NOT NULL,
            bandeira TEXT NOT NULL,
            possui_esgoto INTEGER NOT NULL,
            fatura_do_consumo REAL NOT NULL,
            tarifa REAL NOT NULL,
            valor_agua REAL NOT NULL,
            adicional_da_bandeira REAL NOT NULL,
            taxa_esgoto REAL NOT NULL,
            total REAL NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (cpf, mes, ano)
        )",
        [],
    )
    .context("Failed to create consumos_agua table")?;

    Ok(())
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<ConsumptionRecord> {
    Ok(ConsumptionRecord {
        id: row.get(0)?,
        identifier: row.get(1)?,
        month: row.get(2)?,
        year: row.get(3)?,
        raw_volume: row.get(4)?,
        color_band: row.get(5)?,
        has_sewage_service: row.get(6)?,
        billable_volume: row.get(7)?,
        unit_rate: row.get(8)?,
        water_charge: row.get(9)?,
        band_surcharge: row.get(10)?,
        sewage_charge: row.get(11)?,
        total_charge: row.get(12)?,
    })
}

/// Insert a validated reading with its bill and return the stored record
pub fn insert_record(
    conn: &Connection,
    reading: &NewConsumption,
    band: ColorBand,
    bill: &Bill,
) -> rusqlite::Result<ConsumptionRecord> {
    conn.execute(
        "INSERT INTO consumos_agua (
            cpf, mes, ano, m3_consumidos, bandeira, possui_esgoto,
            fatura_do_consumo, tarifa, valor_agua, adicional_da_bandeira, taxa_esgoto, total
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            reading.identifier,
            reading.month,
            reading.year,
            reading.raw_volume,
            band,
            reading.has_sewage_service,
            bill.billable_volume,
            bill.unit_rate,
            bill.water_charge,
            bill.band_surcharge,
            bill.sewage_charge,
            bill.total_charge,
        ],
    )?;

    Ok(ConsumptionRecord {
        id: conn.last_insert_rowid(),
        identifier: reading.identifier.clone(),
        month: reading.month,
        year: reading.year,
        raw_volume: reading.raw_volume,
        color_band: band,
        has_sewage_service: reading.has_sewage_service,
        billable_volume: bill.billable_volume,
        unit_rate: bill.unit_rate,
        water_charge: bill.water_charge,
        band_surcharge: bill.band_surcharge,
        sewage_charge: bill.sewage_charge,
        total_charge: bill.total_charge,
    })
}

pub fn record_exists(conn: &Connection, identifier: &str, month: i32, year: i32) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM consumos_agua WHERE cpf = ?1 AND mes = ?2 AND ano = ?3)",
        params![identifier, month, year],
        |row| row.get(0),
    )
}

pub fn find_record(
    conn: &Connection,
    identifier: &str,
    month: i32,
    year: i32,
) -> rusqlite::Result<Option<ConsumptionRecord>> {
    let sql = format!(
        "SELECT {} FROM consumos_agua WHERE cpf = ?1 AND mes = ?2 AND ano = ?3",
        RECORD_COLUMNS
    );
    conn.query_row(&sql, params![identifier, month, year], row_to_record)
        .optional()
}

/// Returns the number of rows removed (0 or 1)
pub fn delete_record(conn: &Connection, identifier: &str, month: i32, year: i32) -> rusqlite::Result<usize> {
    conn.execute(
        "DELETE FROM consumos_agua WHERE cpf = ?1 AND mes = ?2 AND ano = ?3",
        params![identifier, month, year],
    )
}

/// All records in insertion order
pub fn get_all_records(conn: &Connection) -> rusqlite::Result<Vec<ConsumptionRecord>> {
    let sql = format!("SELECT {} FROM consumos_agua ORDER BY id", RECORD_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;

    let records = stmt
        .query_map([], row_to_record)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(records)
}

pub fn verify_count(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM consumos_agua", [], |row| row.get(0))
}
