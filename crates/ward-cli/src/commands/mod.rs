//! Command handlers.

pub mod account;
pub mod chain;
pub mod sign;
