//! Core Kernel - Foundational types shared by the claim decision engine
//!
//! This crate provides the building blocks used by every other crate:
//! - Strongly-typed identifiers for reviews, audit events and decisions
//! - Port plumbing (errors, health checks) for swappable adapters
//! - Lenient parsing of the free-text dates found on claim documents

pub mod identifiers;
pub mod temporal;
pub mod ports;
pub mod error;

pub use identifiers::{ReviewId, AuditEventId, DecisionId};
pub use temporal::{DATE_FORMATS, ParsedDatePair, parse_date, parse_date_pair};
pub use ports::{PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth};
pub use error::CoreError;
