//! Business logic services for the Warehouse Inventory Dashboard

pub mod session;
pub mod spreadsheet;
pub mod store;

pub use session::{InventorySession, SessionState};
pub use spreadsheet::SpreadsheetService;
pub use store::InventoryStore;
