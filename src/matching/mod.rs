//! Three-way matching of AP vouchers against purchase orders and goods receipts

pub mod engine;
pub mod service;
pub mod tolerance;

pub use engine::*;
pub use service::*;
pub use tolerance::*;
