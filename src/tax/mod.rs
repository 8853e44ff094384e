//! Tax arithmetic for AP vouchers

pub mod withholding;

pub use withholding::*;
