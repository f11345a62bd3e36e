//! Persistence layer: durable local key-value storage and the PostgreSQL
//! remote document store.
//!
//! [`KeyValueStorage`] backs the per-device record store. The concrete
//! implementations are an in-memory map (tests) and a directory of files.
//! [`PostgresRemote`] implements the remote gateway with `sqlx::PgPool`.

pub mod local;
pub mod models;
pub mod postgres;

pub use local::{FileStorage, KeyValueStorage, MemoryStorage};
pub use postgres::PostgresRemote;
