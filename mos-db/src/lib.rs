//! In-memory SQLite tabular source for MOS station and model-grid data.
//!
//! CSV archives are loaded into an in-memory SQLite database and read back
//! through equality/range filtered selects. Training pulls history through
//! the [`mos_core::source::HistorySource`] implementation on [`Database`].
//!
//! # Usage
//!
//! ```rust
//! use mos_db::Database;
//!
//! let db = Database::new().unwrap();
//! db.load_stations("station_id,latitude,longitude\nLUG,46.0,8.96\n").unwrap();
//! let stations = db.query_stations().unwrap();
//! assert_eq!(stations.len(), 1);
//! ```
//!
//! # Tables
//!
//! See [`schema::create_schema`] for the full SQL schema.
//!
//! - `stations` - Station metadata
//! - `observations` - Station observations, one row per variable and time
//! - `model_data` - Model values extracted at each station's grid cell
//!
//! Persisted models ([`store`]) and extracted monthly archives
//! ([`writer`]) live in plain files next to the database inputs.

pub mod schema;
mod loader;
pub mod queries;
pub mod store;
pub mod writer;

use rusqlite::Connection;
use std::cell::RefCell;
use std::rc::Rc;

/// In-memory SQLite database holding the historical archives.
///
/// Cheaply cloneable (via `Rc`); clones share one connection. It is used
/// from the thread that drives training, never from worker threads.
#[derive(Clone)]
pub struct Database {
    conn: Rc<RefCell<Connection>>,
}

impl Database {
    /// Create a new in-memory database with the full schema applied.
    ///
    /// The database is empty after creation; use the `load_*` methods
    /// to populate it with CSV data.
    pub fn new() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(schema::create_schema())?;
        Ok(Self {
            conn: Rc::new(RefCell::new(conn)),
        })
    }
}
