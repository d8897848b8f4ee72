//! Domain models for the Warehouse Inventory Dashboard

mod change_log;
mod inventory;
mod movement;

pub use change_log::*;
pub use inventory::*;
pub use movement::*;
