//! Risk classification policy.
//!
//! Deterministic and total: a group's level is the maximum severity over its
//! ingress rules, so the result never depends on rule order or any external
//! state. Same rules, same answer.
//!
//!   - Extreme: all-protocol rule open to the world
//!   - High:    world-open rule covering a management port (ssh/rdp)
//!   - Medium:  world-open rule covering any other watched port
//!   - Low:     world-open rule on non-watched ports only
//!   - Secure:  nothing world-open

use std::collections::BTreeSet;

use crate::types::{Protocol, RiskLevel, SecurityGroup, SgRule};

/// Ports that rate High on their own, independent of the watched set.
pub const MANAGEMENT_PORTS: [u16; 2] = [22, 3389];

/// Severity contributed by a single rule.
pub fn rule_severity(rule: &SgRule, watched_ports: &BTreeSet<u16>) -> RiskLevel {
    if !rule.is_world_open() {
        return RiskLevel::Secure;
    }
    match rule.protocol {
        Protocol::All => RiskLevel::Extreme,
        // icmp has no ports to expose a service on
        Protocol::Icmp => RiskLevel::Low,
        Protocol::Tcp | Protocol::Udp => {
            if MANAGEMENT_PORTS.iter().any(|p| rule.covers_port(*p)) {
                RiskLevel::High
            } else if watched_ports.iter().any(|p| rule.covers_port(*p)) {
                RiskLevel::Medium
            } else {
                RiskLevel::Low
            }
        }
    }
}

/// Classify a group: maximum rule severity, `Secure` for an empty rule set.
pub fn classify(group: &SecurityGroup, watched_ports: &BTreeSet<u16>) -> RiskLevel {
    group
        .ingress
        .iter()
        .map(|rule| rule_severity(rule, watched_ports))
        .max()
        .unwrap_or(RiskLevel::Secure)
}
