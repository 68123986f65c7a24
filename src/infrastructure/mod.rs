//! Port implementations: in-memory for tests and ephemeral runs, RocksDB for
//! persistence behind the `storage-rocksdb` feature.

pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
