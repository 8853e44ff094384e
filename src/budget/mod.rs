//! Budget control: availability checks and reservation accounting

pub mod control;
pub mod ledger;

pub use control::*;
pub use ledger::*;
