//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! claim decision engine test suite.
//!
//! # Modules
//!
//! - `fixtures`: Reference scenarios and fixed test data
//! - `builders`: Builder patterns for claim and policy inputs
//! - `harness`: Orchestrator wired to the in-memory adapters
//! - `database`: PostgreSQL container management
//! - `assertions`: Assertion helpers for engine results
//! - `generators`: Property-based test data generators

pub mod fixtures;
pub mod builders;
pub mod harness;
pub mod database;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use harness::TestEngine;
pub use database::*;
pub use assertions::*;
pub use generators::*;
