// Water Billing - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod billing;
pub mod config;
pub mod db;
pub mod error;
pub mod import;
pub mod store;
pub mod validation;

#[cfg(feature = "server")]
pub mod api;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// Re-export commonly used types
pub use billing::{calculate_bill, round2, Bill, ColorBand};
pub use db::{setup_database, ConsumptionRecord, NewConsumption};
pub use error::{ConsumptionError, ConsumptionResult, ValidationError};
pub use import::{import_readings, load_csv, ImportSummary};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the global tracing subscriber. `RUST_LOG` overrides the
/// default `info` level.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .init();
}
