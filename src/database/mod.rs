pub mod manager;
pub mod memory;
pub mod postgres;
pub mod query_builder;
pub mod store;
pub mod value;

pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryRecordStore;
pub use postgres::PgRecordStore;
pub use query_builder::SqlBuilder;
pub use store::{decode, decode_all, Condition, Query, RecordStore, Row, SortDirection, StoreError};
pub use value::{Fields, SqlValue};
