//! # Persist Core
//!
//! A driver-agnostic document persistence facade.
//!
//! Application code talks to [`Database`], [`Collection`], [`Document`] and
//! [`QueryIter`]; a pluggable [`Driver`] does the actual storing. Swapping
//! the driver changes nothing above this crate.
//!
//! ## Core Concepts
//!
//! - **Database**: one driver bound to one path
//! - **Collection**: a named partition of schemaless documents
//! - **Document**: a dict with a mandatory string `id`
//! - **Query**: rules and params handed to the driver, results read
//!   through a [`QueryIter`]
//! - **Transaction**: a mode of the database, owned by the driver
//!
//! Every collection has a metadata record (creation time, reserved
//! migration slot, application metadata) kept in the reserved
//! `collections` collection.
//!
//! ## Example
//!
//! ```rust
//! use persist_core::{dict, Database, QueryParams, Value};
//!
//! let db = Database::open("scratch", "mem", &Value::Null)?;
//! let users = db.collection("users", true)?;
//!
//! users.save(&dict! { "id" => "1", "name" => "Ann", "age" => 34 })?;
//! users.save(&dict! { "id" => "2", "name" => "Bob", "age" => 27 })?;
//!
//! let rules = Value::from(vec![Value::from(vec![
//!     Value::from("age"),
//!     Value::from(">"),
//!     Value::from(30),
//! ])]);
//! for doc in users.query(&rules, &QueryParams::default())? {
//!     assert_eq!(doc?.id(), "1");
//! }
//! # Ok::<(), persist_core::PersistError>(())
//! ```
//!
//! ## Errors
//!
//! Every operation returns a [`PersistResult`]. Each error has an
//! [`ErrorKind`] with a stable numeric code, and the most recent failure
//! on the current thread is also available from [`last_error`].

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod collection;
mod config;
mod database;
mod document;
mod error;
mod last_error;
mod query;
mod record;
mod transaction;

pub use collection::Collection;
pub use config::Config;
pub use database::{Database, RESERVED_COLLECTION};
pub use document::{Document, ID_KEY};
pub use error::{ErrorKind, PersistError, PersistResult};
pub use last_error::{clear_last_error, last_error, LastError};
pub use query::QueryIter;
pub use record::CollectionRecord;

// Re-export the layers below for convenience
pub use persist_driver::{
    Cursor, Driver, DriverError, DriverRegistry, DriverResult, FileConfig, FileDriver,
    MemoryDriver, QueryParams,
};
pub use persist_value::{dict, Dict, Value};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
