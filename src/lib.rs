//! # Procurement Core
//!
//! The stateful core of a purchase-to-pay system (PR -> PO -> GR -> AP):
//! three-way matching of AP vouchers against purchase orders and goods
//! receipts, and budget control with reserve/release/commit accounting.
//!
//! ## Features
//!
//! - **Three-way matching**: per-line quantity and price variances against configurable tolerances
//! - **Force match**: attributed manual overrides of a computed verdict
//! - **Budget ledger**: budget / reserved / used balances per department and cost center
//! - **Optimistic concurrency**: version-checked writes for budgets and vouchers
//! - **AP tax totals**: VAT and withholding tax for voucher net payable
//! - **Storage abstraction**: database-agnostic design with trait-based storage
//!
//! ## Quick Start
//!
//! ```rust
//! use procurement_core::utils::MemoryStorage;
//! use procurement_core::{MatchingService, RequestContext};
//!
//! let storage = MemoryStorage::new();
//! let matching = MatchingService::new(storage);
//! let ctx = RequestContext::new("company-1", "user-1");
//! // matching.perform_three_way_match(&ctx, "ap-1").await?;
//! # let _ = (matching, ctx);
//! ```

pub mod budget;
pub mod config;
pub mod matching;
pub mod tax;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use budget::*;
pub use config::*;
pub use matching::*;
pub use tax::*;
pub use traits::*;
pub use types::*;
