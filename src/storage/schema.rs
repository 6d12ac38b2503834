//! Database schema definitions using sea-query.
//!
//! Only the shared settings table has a fixed layout; every other
//! collection table is addressed dynamically by name and introspected.

use sea_query::Iden;

/// Shared key/value settings table schema.
#[derive(Iden)]
pub enum Settings {
    Table,
    #[iden = "key"]
    Key,
    #[iden = "value"]
    Value,
}
