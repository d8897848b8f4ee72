//! HTTP handlers for the Warehouse Inventory Dashboard

pub mod deleted;
pub mod health;
pub mod inventory;
pub mod logs;

pub use deleted::*;
pub use health::*;
pub use inventory::*;
pub use logs::*;
