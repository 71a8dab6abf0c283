//! # Condo Charges
//!
//! Recurring-charge reconciliation for condominium units. For every unit and
//! calendar month the engine produces exactly one authoritative charge:
//! either a recorded payment or a projected due, classified as paid, pending
//! or overdue.
//!
//! ## Features
//!
//! - **Projection**: twelve monthly dues per year from the unit's billing profile
//! - **Payment matching**: recorded payments always take precedence over projections
//! - **Classification**: pending/overdue against a single date per run
//! - **Visibility**: dues predating a resident's registration are hidden
//! - **Settlement hand-off**: PIX payee data for an outstanding charge
//! - **Storage abstraction**: upstream reads behind the [`BillingStorage`] trait
//!
//! ## Quick Start
//!
//! ```rust
//! use condo_charges::utils::MemoryStorage;
//! use condo_charges::{ChargeReconciler, ChargeView, ReconciliationRequest};
//! use chrono::NaiveDate;
//!
//! # futures::executor::block_on(async {
//! let storage = MemoryStorage::new();
//! let reconciler = ChargeReconciler::new(storage);
//! let request = ReconciliationRequest {
//!     account_id: "condo-1".to_string(),
//!     resident_id: "resident-1".to_string(),
//!     unit: "101B".to_string(),
//!     year: 2024,
//! };
//!
//! let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
//! let outstanding = reconciler
//!     .charges(&request, ChargeView::Outstanding, today)
//!     .await;
//! // No profile recorded yet, so nothing is projected
//! assert!(outstanding.is_empty());
//! # });
//! ```

pub mod config;
pub mod reconciliation;
pub mod settlement;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::*;
pub use reconciliation::*;
pub use settlement::*;
pub use traits::*;
pub use types::*;
