//! Charge reconciliation: projection, payment matching, classification and
//! visibility, coordinated by [`ChargeReconciler`]

pub mod classifier;
pub mod engine;
pub mod matcher;
pub mod projector;
pub mod visibility;

pub use classifier::*;
pub use engine::*;
pub use matcher::*;
pub use projector::*;
pub use visibility::*;
