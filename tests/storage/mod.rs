//! Shared storage integration tests.
//!
//! Tests the Backend contract and the snapshot reader/writer on top of it.
//! Each backend test binary provisions a schema and runs these.

pub mod backend_contract_tests;
