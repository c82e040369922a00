// Record Store - consumption records keyed by (cpf, mes, ano)
// Every operation takes the connection explicitly; nothing is held globally.

use rusqlite::{ffi, Connection};
use tracing::{debug, info, warn};

use crate::billing::{calculate_bill, round2};
use crate::db::{self, ConsumptionRecord, NewConsumption};
use crate::error::{ConsumptionError, ConsumptionResult};
use crate::validation::validate_reading;

pub const MSG_DUPLICATE: &str = "Já existe cadastro para esse Cpf mes e ano";
pub const MSG_NOT_FOUND: &str = "Consumo não foi encontrado";

/// Only the UNIQUE(cpf, mes, ano) constraint means a duplicate; NOT NULL and
/// other constraint failures stay storage errors.
fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// Translate an insert failure into the store's error taxonomy
fn map_insert_error(err: rusqlite::Error) -> ConsumptionError {
    if is_unique_violation(&err) {
        warn!("duplicate caught by unique constraint");
        ConsumptionError::Conflict(MSG_DUPLICATE.to_string())
    } else {
        ConsumptionError::Storage(err)
    }
}

/// Validate a reading, bill it, and store it.
///
/// Fails with `Validation` on bad input and `Conflict` when the key is
/// already taken. A constraint violation from a concurrent insert is reported
/// as the same `Conflict`.
pub fn create(conn: &Connection, reading: &NewConsumption) -> ConsumptionResult<ConsumptionRecord> {
    let band = validate_reading(reading).map_err(|err| {
        debug!(field = %err.field, "rejected reading: {}", err.message);
        ConsumptionError::from(err)
    })?;

    if db::record_exists(conn, &reading.identifier, reading.month, reading.year)? {
        warn!(
            cpf = %reading.identifier,
            mes = reading.month,
            ano = reading.year,
            "duplicate consumption record rejected"
        );
        return Err(ConsumptionError::Conflict(MSG_DUPLICATE.to_string()));
    }

    let bill = calculate_bill(reading.raw_volume, band.as_str(), reading.has_sewage_service);

    let record = db::insert_record(conn, reading, band, &bill).map_err(map_insert_error)?;

    info!(
        id = record.id,
        cpf = %record.identifier,
        mes = record.month,
        ano = record.year,
        total = record.total_charge,
        "consumption record created"
    );

    Ok(record)
}

pub fn list(conn: &Connection) -> ConsumptionResult<Vec<ConsumptionRecord>> {
    Ok(db::get_all_records(conn)?)
}

pub fn find_by_key(
    conn: &Connection,
    identifier: &str,
    month: i32,
    year: i32,
) -> ConsumptionResult<ConsumptionRecord> {
    db::find_record(conn, identifier, month, year)?
        .ok_or_else(|| ConsumptionError::NotFound(MSG_NOT_FOUND.to_string()))
}

pub fn delete_by_key(conn: &Connection, identifier: &str, month: i32, year: i32) -> ConsumptionResult<()> {
    match db::delete_record(conn, identifier, month, year)? {
        0 => Err(ConsumptionError::NotFound(MSG_NOT_FOUND.to_string())),
        _ => {
            info!(cpf = %identifier, mes = month, ano = year, "consumption record removed");
            Ok(())
        }
    }
}

/// Sum of stored totals, in id order, rounded once at the end
pub fn aggregate_total(conn: &Connection) -> ConsumptionResult<f64> {
    let sum: f64 = db::get_all_records(conn)?
        .iter()
        .map(|record| record.total_charge)
        .sum();

    Ok(round2(sum))
}

pub fn count(conn: &Connection) -> ConsumptionResult<i64> {
    Ok(db::verify_count(conn)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::ColorBand;
    use crate::validation::MSG_INVALID_BAND;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        db::setup_database(&conn).unwrap();
        conn
    }

    fn create_test_reading(identifier: &str, raw_volume: f64, band: &str, sewage: bool) -> NewConsumption {
        NewConsumption {
            identifier: identifier.to_string(),
            month: 6,
            year: 2024,
            raw_volume,
            color_band: band.to_string(),
            has_sewage_service: sewage,
        }
    }

    #[test]
    fn test_create_returns_billed_record() {
        let conn = setup();

        let record = create(&conn, &create_test_reading("111", 30.0, "Amarela", true)).unwrap();

        assert!(record.id > 0);
        assert_eq!(record.color_band, ColorBand::Amarela);
        assert_eq!(record.raw_volume, 30.0);
        assert_eq!(record.billable_volume, 30.0);
        assert_eq!(record.unit_rate, 5.0);
        assert_eq!(record.water_charge, 150.0);
        assert_eq!(record.band_surcharge, 15.0);
        assert_eq!(record.sewage_charge, 132.0);
        assert_eq!(record.total_charge, 297.0);
    }

    #[test]
    fn test_duplicate_key_rejected_once() {
        let conn = setup();
        let reading = create_test_reading("111", 5.0, "VERDE", false);

        let first = create(&conn, &reading);
        let second = create(&conn, &reading);

        assert!(first.is_ok());
        match second {
            Err(ConsumptionError::Conflict(msg)) => assert_eq!(msg, MSG_DUPLICATE),
            other => panic!("expected conflict, got {:?}", other),
        }
        assert_eq!(count(&conn).unwrap(), 1);
    }

    #[test]
    fn test_unique_constraint_maps_to_conflict() {
        let conn = setup();
        let reading = create_test_reading("111", 30.0, "AMARELA", true);
        create(&conn, &reading).unwrap();

        // A second writer that already passed the existence check
        let bill = calculate_bill(reading.raw_volume, "AMARELA", true);
        let err = db::insert_record(&conn, &reading, ColorBand::Amarela, &bill).unwrap_err();

        match map_insert_error(err) {
            ConsumptionError::Conflict(msg) => assert_eq!(msg, MSG_DUPLICATE),
            other => panic!("expected conflict, got {:?}", other),
        }
        assert_eq!(count(&conn).unwrap(), 1);
    }

    #[test]
    fn test_other_constraint_failures_stay_storage_errors() {
        let not_null = rusqlite::Error::SqliteFailure(
            ffi::Error::new(ffi::SQLITE_CONSTRAINT_NOTNULL),
            Some("NOT NULL constraint failed: consumos_agua.cpf".to_string()),
        );
        assert!(matches!(map_insert_error(not_null), ConsumptionError::Storage(_)));

        let check = rusqlite::Error::SqliteFailure(ffi::Error::new(ffi::SQLITE_CONSTRAINT_CHECK), None);
        assert!(matches!(map_insert_error(check), ConsumptionError::Storage(_)));
    }

    #[test]
    fn test_same_cpf_other_month_allowed() {
        let conn = setup();
        let mut reading = create_test_reading("111", 5.0, "VERDE", false);
        create(&conn, &reading).unwrap();

        reading.month = 7;
        create(&conn, &reading).unwrap();

        assert_eq!(count(&conn).unwrap(), 2);
    }

    #[test]
    fn test_invalid_reading_not_stored() {
        let conn = setup();

        let err = create(&conn, &create_test_reading("111", 5.0, "azul", false)).unwrap_err();

        assert!(matches!(err, ConsumptionError::Validation(_)));
        assert_eq!(err.to_string(), MSG_INVALID_BAND);
        assert_eq!(count(&conn).unwrap(), 0);
    }

    #[test]
    fn test_find_by_key() {
        let conn = setup();
        let created = create(&conn, &create_test_reading("111", 5.0, "verde", false)).unwrap();

        assert_eq!(find_by_key(&conn, "111", 6, 2024).unwrap(), created);
        assert!(matches!(
            find_by_key(&conn, "111", 6, 2023),
            Err(ConsumptionError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_missing_key_leaves_store_unchanged() {
        let conn = setup();
        create(&conn, &create_test_reading("111", 5.0, "verde", false)).unwrap();

        let err = delete_by_key(&conn, "999", 6, 2024).unwrap_err();

        assert!(matches!(err, ConsumptionError::NotFound(_)));
        assert_eq!(err.to_string(), MSG_NOT_FOUND);
        assert_eq!(list(&conn).unwrap().len(), 1);
    }

    #[test]
    fn test_delete_then_recreate() {
        let conn = setup();
        let reading = create_test_reading("111", 5.0, "verde", false);
        create(&conn, &reading).unwrap();

        delete_by_key(&conn, "111", 6, 2024).unwrap();
        assert_eq!(count(&conn).unwrap(), 0);

        create(&conn, &reading).unwrap();
        assert_eq!(count(&conn).unwrap(), 1);
    }

    #[test]
    fn test_aggregate_total() {
        let conn = setup();
        assert_eq!(aggregate_total(&conn).unwrap(), 0.0);

        create(&conn, &create_test_reading("111", 5.0, "VERDE", false)).unwrap();
        create(&conn, &create_test_reading("222", 30.0, "AMARELA", true)).unwrap();

        assert_eq!(aggregate_total(&conn).unwrap(), 322.0);
    }
}
