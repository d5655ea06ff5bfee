//! Request handlers

pub mod decisions;
pub mod health;
pub mod reviews;
