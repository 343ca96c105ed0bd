//! Leave accrual, balance reconciliation and review.

pub mod accrual;
pub mod error;
pub mod service;
pub mod store;
