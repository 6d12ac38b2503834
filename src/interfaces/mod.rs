//! Abstract interfaces for clubhouse components.
//!
//! These traits define the contracts for:
//! - Relational storage backends (SQLite, PostgreSQL)
//! - Geolocation lookups used by request telemetry

pub mod backend;
pub mod geo;

pub use backend::{Backend, BackendKind, Result, Row, StorageError, WriteOp};
pub use geo::{GeoError, GeoLocation, GeoLocator};
