// 📐 Validation - Reading Rules
// Rejects readings before they reach the calculator or the database

use crate::billing::ColorBand;
use crate::db::NewConsumption;
use crate::error::ValidationError;

pub const MIN_YEAR: i32 = 2000;

pub const MSG_INVALID_MONTH: &str = "Digite um mes entre 1 e 12";
pub const MSG_INVALID_YEAR: &str = "Ano deve ser maior ou igual a 2000";
pub const MSG_INVALID_VOLUME: &str = "Consumo deve ser maior que zero";
pub const MSG_INVALID_BAND: &str = "Bandeira deve ser VERDE AMARELA ou VERMELHA";

/// Check a reading field by field, in a fixed order, and report the first
/// failure. On success the parsed color band is returned.
pub fn validate_reading(reading: &NewConsumption) -> Result<ColorBand, ValidationError> {
    if !(1..=12).contains(&reading.month) {
        return Err(ValidationError::new("mes", MSG_INVALID_MONTH));
    }

    if reading.year < MIN_YEAR {
        return Err(ValidationError::new("ano", MSG_INVALID_YEAR));
    }

    // NaN and infinity never bill to a finite total
    if !(reading.raw_volume.is_finite() && reading.raw_volume > 0.0) {
        return Err(ValidationError::new("m3Consumidos", MSG_INVALID_VOLUME));
    }

    ColorBand::parse(&reading.color_band)
        .ok_or_else(|| ValidationError::new("bandeira", MSG_INVALID_BAND))
}
