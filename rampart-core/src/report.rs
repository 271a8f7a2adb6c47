//! Findings and audit summary construction for `find`/`report` output.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::classifier;
use crate::types::{Finding, PortFilter, RiskLevel, SecurityGroup};

/// One finding per group with at least one world-open rule matching the
/// filter. `violating_rules` lists those rules; `risk_level` is the full
/// group classification. Sorted by severity descending, then group id, so
/// output is stable across runs.
pub fn build_findings(
    groups: &[SecurityGroup],
    filter: &PortFilter,
    watched_ports: &BTreeSet<u16>,
) -> Vec<Finding> {
    let mut findings: Vec<Finding> = groups
        .iter()
        .filter_map(|group| {
            let violating: Vec<_> = group
                .ingress
                .iter()
                .filter(|rule| rule.is_world_open() && filter.matches(rule))
                .cloned()
                .collect();
            if violating.is_empty() {
                return None;
            }
            Some(Finding {
                group_id: group.group_id.clone(),
                group_name: group.name.clone(),
                risk_level: classifier::classify(group, watched_ports),
                violating_rules: violating,
            })
        })
        .collect();

    findings.sort_by(|a, b| {
        b.risk_level
            .cmp(&a.risk_level)
            .then_with(|| a.group_id.cmp(&b.group_id))
    });
    findings
}

/// Aggregate counters over one audit pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditSummary {
    pub generated_at: i64,
    pub groups_audited: u64,
    pub groups_flagged: u64,
    pub world_open_rules: u64,
    pub by_level: BTreeMap<RiskLevel, u64>,
}

pub fn summarize(
    groups: &[SecurityGroup],
    findings: &[Finding],
    generated_at: i64,
) -> AuditSummary {
    let mut by_level = BTreeMap::new();
    for finding in findings {
        *by_level.entry(finding.risk_level).or_insert(0) += 1;
    }
    AuditSummary {
        generated_at,
        groups_audited: groups.len() as u64,
        groups_flagged: findings.len() as u64,
        world_open_rules: findings
            .iter()
            .map(|f| f.violating_rules.len() as u64)
            .sum(),
        by_level,
    }
}
