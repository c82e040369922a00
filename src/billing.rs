// 💧 Billing Calculator - Tariff Pipeline
// Turns a raw consumption reading into an itemized monthly bill

use serde::{Deserialize, Serialize};

// ============================================================================
// TARIFF TABLE
// ============================================================================

/// Minimum billable volume in m³. Anything below is billed as this.
pub const MINIMUM_VOLUME: f64 = 10.0;

/// Unit rate tiers as (inclusive upper bound in m³, rate per m³),
/// evaluated in ascending order, first match wins.
const RATE_TIERS: &[(f64, f64)] = &[(10.0, 2.50), (20.0, 3.50), (50.0, 5.00)];

/// Rate applied above the last tier
const TOP_RATE: f64 = 6.50;

/// Share of (water + surcharge) billed for sewage service
const SEWAGE_RATE: f64 = 0.80;

// ============================================================================
// COLOR BAND ("bandeira")
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColorBand {
    Verde,
    Amarela,
    Vermelha,
}

impl ColorBand {
    /// Case-insensitive lookup. English names are accepted as aliases.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_uppercase().as_str() {
            "VERDE" | "GREEN" => Some(ColorBand::Verde),
            "AMARELA" | "YELLOW" => Some(ColorBand::Amarela),
            "VERMELHA" | "RED" => Some(ColorBand::Vermelha),
            _ => None,
        }
    }

    /// Canonical name, as stored
    pub fn as_str(&self) -> &'static str {
        match self {
            ColorBand::Verde => "VERDE",
            ColorBand::Amarela => "AMARELA",
            ColorBand::Vermelha => "VERMELHA",
        }
    }

    /// Surcharge as a fraction of the water charge
    pub fn surcharge_rate(&self) -> f64 {
        match self {
            ColorBand::Verde => 0.0,
            ColorBand::Amarela => 0.10,
            ColorBand::Vermelha => 0.20,
        }
    }
}

impl std::fmt::Display for ColorBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

// ============================================================================
// PIPELINE STEPS
// ============================================================================

pub fn billable_volume(raw_volume: f64) -> f64 {
    if raw_volume < MINIMUM_VOLUME {
        MINIMUM_VOLUME
    } else {
        raw_volume
    }
}

pub fn unit_rate(billable_volume: f64) -> f64 {
    RATE_TIERS
        .iter()
        .find(|(upper, _)| billable_volume <= *upper)
        .map(|(_, rate)| *rate)
        .unwrap_or(TOP_RATE)
}

pub fn water_charge(billable_volume: f64, unit_rate: f64) -> f64 {
    billable_volume * unit_rate
}

/// Unrecognized bands carry no surcharge.
pub fn band_surcharge(water_charge: f64, band: &str) -> f64 {
    match ColorBand::parse(band) {
        Some(band) => water_charge * band.surcharge_rate(),
        None => 0.0,
    }
}

pub fn sewage_charge(water_charge: f64, band_surcharge: f64, has_sewage_service: bool) -> f64 {
    if !has_sewage_service {
        return 0.0;
    }
    (water_charge + band_surcharge) * SEWAGE_RATE
}

pub fn total_charge(water_charge: f64, band_surcharge: f64, sewage_charge: f64) -> f64 {
    water_charge + band_surcharge + sewage_charge
}

/// Round to 2 decimal places, ties to even.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

// ============================================================================
// ITEMIZED BILL
// ============================================================================

/// Itemized bill, every field already rounded to 2 decimal places
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bill {
    pub billable_volume: f64,
    pub unit_rate: f64,
    pub water_charge: f64,
    pub band_surcharge: f64,
    pub sewage_charge: f64,
    pub total_charge: f64,
}

/// Run the whole pipeline at full precision and round each output
/// independently. The total is summed from unrounded parts.
pub fn calculate_bill(raw_volume: f64, band: &str, has_sewage_service: bool) -> Bill {
    let volume = billable_volume(raw_volume);
    let rate = unit_rate(volume);
    let water = water_charge(volume, rate);
    let surcharge = band_surcharge(water, band);
    let sewage = sewage_charge(water, surcharge, has_sewage_service);
    let total = total_charge(water, surcharge, sewage);

    Bill {
        billable_volume: round2(volume),
        unit_rate: round2(rate),
        water_charge: round2(water),
        band_surcharge: round2(surcharge),
        sewage_charge: round2(sewage),
        total_charge: round2(total),
    }
}
