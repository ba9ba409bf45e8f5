//! Staff leave management core: the request lifecycle engine, balance ledger,
//! and calendar logic, plus the app-level config/telemetry/error plumbing the
//! API service builds on.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
