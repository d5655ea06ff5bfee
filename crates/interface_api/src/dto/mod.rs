//! Request and response bodies

pub mod decisions;
pub mod reviews;
