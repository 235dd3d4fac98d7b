//! Dual-backend local persistence for odolog vehicle tracking.
//!
//! This crate owns the table schemas and provides the record store the
//! entity services are built on. Every store runs against one of two
//! backends behind the same typed operation surface:
//!
//! - **Embedded**: SQLite via `rusqlite`, the normal mode.
//! - **Fallback**: plain in-memory tables, entered when the embedded
//!   engine cannot be opened, so the application keeps working in
//!   environments without it.
//!
//! The backend is an explicit state machine (see [`BackendKind`]); the
//! only embedded-to-fallback transition after init is the explicit
//! [`Store::downgrade_to_fallback`] call.
//!
//! # Example
//!
//! ```no_run
//! use odolog_store::{FuelQuery, Store};
//!
//! let mut store = Store::new(odolog_store::default_db_path());
//! store.init();
//!
//! let query = FuelQuery::new().vehicle("v1").limit(10);
//! let entries = store.query_fuel_entries(&query)?;
//! # Ok::<(), odolog_store::Error>(())
//! ```

mod dates;
mod error;
mod export;
mod memory;
mod queries;
mod schema;
mod store;

pub use error::{Error, Result};
pub use queries::{FuelQuery, ServiceQuery};
pub use store::{BackendKind, Store};

/// Default database path following platform conventions.
///
/// - Linux: `~/.local/share/odolog/data.db`
/// - macOS: `~/Library/Application Support/odolog/data.db`
/// - Windows: `C:\Users\<user>\AppData\Local\odolog\data.db`
pub fn default_db_path() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("odolog")
        .join("data.db")
}
