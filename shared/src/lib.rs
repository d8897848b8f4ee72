//! Shared types and inventory logic for the Warehouse Inventory Dashboard
//!
//! This crate holds the reconciliation and soft-delete core used by the
//! backend server and the browser (via WASM). Everything here is synchronous
//! and free of I/O: callers pass state in and get state plus structured
//! warnings back.

pub mod analytics;
pub mod coercion;
pub mod ledger;
pub mod models;
pub mod reconcile;
pub mod schema;
pub mod types;
pub mod validation;

pub use analytics::*;
pub use coercion::*;
pub use ledger::*;
pub use models::*;
pub use reconcile::*;
pub use schema::*;
pub use types::*;
pub use validation::*;
