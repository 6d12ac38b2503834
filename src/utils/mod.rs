//! Process-level helpers shared by binaries and embedding services.

pub mod bootstrap;
