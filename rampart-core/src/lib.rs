//! # Rampart Core — Security Group Risk Engine
//!
//! Pure domain logic for auditing cloud security groups: risk classification,
//! remediation planning, and the bulk orchestration loop. Everything here is
//! deterministic and free of AWS I/O — the collaborator that actually talks
//! to the cloud implements [`orchestrator::SecurityGroupApi`].

pub mod classifier;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod remediation;
pub mod report;
pub mod types;

pub use config::AuditConfig;
pub use error::{Error, RampartResult};
pub use types::{Finding, PortFilter, RemediationPlan, RiskLevel, SecurityGroup, SgRule};

#[cfg(test)]
mod tests;
