//! Clubhouse - persistence and request telemetry core
//!
//! Stores the platform's named collections in an embedded SQLite file or a
//! networked PostgreSQL server, reads and writes them as whole snapshots,
//! and records per-request telemetry into an append-only request log.

pub mod codec;
pub mod config;
pub mod facade;
pub mod interfaces;
pub mod registry;
pub mod repository;
pub mod storage;
pub mod telemetry;
pub mod utils;
