// Bulk CSV import of consumption readings
// Header: cpf,mes,ano,m3Consumidos,bandeira,possuiEsgoto

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::io::Read;
use tracing::warn;

use crate::db::NewConsumption;
use crate::error::ConsumptionError;
use crate::store;

#[derive(Debug, Default)]
pub struct ImportSummary {
    pub created: usize,
    /// (1-based data row, reason)
    pub rejected: Vec<(usize, String)>,
}

pub fn load_csv<R: Read>(reader: R) -> Result<Vec<NewConsumption>> {
    let mut rdr = csv::Reader::from_reader(reader);

    let mut readings = Vec::new();
    for (index, result) in rdr.deserialize().enumerate() {
        let reading: NewConsumption =
            result.with_context(|| format!("Failed to parse reading on row {}", index + 1))?;
        readings.push(reading);
    }

    Ok(readings)
}

/// Create every reading. Validation and duplicate failures are collected
/// in the summary; a storage failure stops the import.
pub fn import_readings(conn: &Connection, readings: &[NewConsumption]) -> Result<ImportSummary> {
    let mut summary = ImportSummary::default();

    for (index, reading) in readings.iter().enumerate() {
        match store::create(conn, reading) {
            Ok(_) => summary.created += 1,
            Err(err @ ConsumptionError::Storage(_)) => {
                return Err(err).with_context(|| format!("Import aborted on row {}", index + 1));
            }
            Err(err) => {
                warn!(row = index + 1, kind = err.kind(), "reading skipped: {}", err);
                summary.rejected.push((index + 1, err.to_string()));
            }
        }
    }

    Ok(summary)
}
