//! # Persist Driver
//!
//! The driver contract and bundled drivers for Persist.
//!
//! A driver is the only component that knows how documents are stored.
//! The facade in `persist_core` binds exactly one driver per database and
//! delegates every operation to it.
//!
//! ## Design Principles
//!
//! - Drivers are trait objects resolved by name at open time
//! - A miss is always [`DriverError::NotFound`], never a generic failure
//! - Cursors signal exhaustion with `Ok(None)`, not an error
//! - Drivers synchronize their own state; the facade adds no locks
//!
//! ## Available Drivers
//!
//! - [`MemoryDriver`] (`mem`) - For testing and ephemeral storage
//! - [`FileDriver`] (`file`) - Whole database in one CBOR file
//!
//! Both interpret query rules with [`Filter`]; see the [`rules`] module
//! for the rule grammar.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod driver;
mod error;
mod file;
mod memory;
mod registry;
pub mod rules;
mod store;

pub use driver::{Cursor, Driver, QueryParams};
pub use error::{DriverError, DriverResult};
pub use file::{FileConfig, FileDriver};
pub use memory::MemoryDriver;
pub use registry::DriverRegistry;
pub use rules::Filter;
