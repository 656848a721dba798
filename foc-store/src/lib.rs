//! Template storage and the operations session.
//!
//! This crate owns everything between the pure recomputation engine and the
//! UI: the in-memory template collection, the key-value persistence boundary
//! (an in-memory backend for tests and a SQLite file backend standing in for
//! browser local storage), and `session::OperationsSession`, the plain-data
//! facade a frontend drives.
//!
//! # Architecture
//!
//! - `store` — the pure template collection; no storage dependency, so the
//!   core stays testable without a storage stub.
//! - `persist` — the `KeyValueStore` trait plus the fixed JSON keys
//!   (`operationsTemplates`, `lastUsedTemplate`) and their codecs.
//! - `schema` / `sqlite` — the durable backend: one `kv_store` table behind
//!   an `Rc<RefCell<Connection>>` cloneable handle.
//! - `session` — selection, the live working copy, view state and the
//!   change log, persisting after each committing mutation.
//! - `models` — serializable view structs handed to rendering layers.

pub mod models;
pub mod persist;
pub mod schema;
pub mod session;
pub mod sqlite;
pub mod store;
