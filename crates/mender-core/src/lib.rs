//! Repair sessions: configuration validation, the driver tying the oracle
//! and search layers together, and serializable reports.

pub mod config;
pub mod session;

pub use config::{ConfigError, RepairConfig};
pub use session::{FixEdit, FixReport, RepairReport, RepairSession, SessionError};
