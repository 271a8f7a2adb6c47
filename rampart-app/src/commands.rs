//! Subcommand implementations. Each one composes the same pipeline: fetch
//! through the API seam, run the pure engine, write JSON to the sink.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Result;
use tracing::info;

use rampart_core::orchestrator::{Remediator, SecurityGroupApi};
use rampart_core::report::{build_findings, summarize};
use rampart_core::types::{parse_cidrs, PortFilter};
use rampart_core::AuditConfig;

use crate::output;

/// `--ports` resolution: absent → configured watched ports; `all` → every
/// port (classification still uses the configured watched set); a csv list
/// replaces the watched set for both filtering and classification.
fn resolve_filter(
    config: &AuditConfig,
    ports: Option<&str>,
) -> Result<(PortFilter, BTreeSet<u16>)> {
    match ports {
        None => {
            let watched = config.watched_set();
            Ok((PortFilter::Watched(watched.clone()), watched))
        }
        Some(requested) => {
            let filter = PortFilter::parse(requested)?;
            let watched = match &filter {
                PortFilter::Watched(set) => set.clone(),
                PortFilter::All => config.watched_set(),
            };
            Ok((filter, watched))
        }
    }
}

fn resolve_cidrs(config: &AuditConfig, cidrs: Option<&str>) -> Result<Vec<String>> {
    match cidrs {
        Some(csv) => Ok(parse_cidrs(csv)?),
        None => Ok(config.audit.replacement_cidrs.clone()),
    }
}

pub fn find(
    api: impl SecurityGroupApi,
    config: &AuditConfig,
    ports: Option<&str>,
    out: Option<&Path>,
) -> Result<()> {
    let (filter, watched) = resolve_filter(config, ports)?;
    let groups = api.describe_groups()?;
    let findings = build_findings(&groups, &filter, &watched);
    info!(
        groups = groups.len(),
        findings = findings.len(),
        "audit complete"
    );
    output::write_json(&findings, out)
}

pub fn remediate(
    api: impl SecurityGroupApi,
    config: &AuditConfig,
    group_id: &str,
    dry_run: bool,
    cidrs: Option<&str>,
    ports: Option<&str>,
) -> Result<()> {
    let (filter, _) = resolve_filter(config, ports)?;
    let cidrs = resolve_cidrs(config, cidrs)?;
    let remediator = Remediator::new(api);
    let outcome = remediator.remediate_group(group_id, &filter, &cidrs, dry_run)?;
    output::write_json(&outcome, None)
}

pub fn bulk_remediate(
    api: impl SecurityGroupApi,
    config: &AuditConfig,
    dry_run: bool,
    cidrs: Option<&str>,
    ports: Option<&str>,
    out: Option<&Path>,
) -> Result<()> {
    let (filter, _) = resolve_filter(config, ports)?;
    let cidrs = resolve_cidrs(config, cidrs)?;
    let remediator = Remediator::new(api);
    let groups = remediator.api().describe_groups()?;
    let outcomes = remediator.bulk_remediate(&groups, &filter, &cidrs, dry_run)?;
    output::write_json(&outcomes, out)
}

pub fn report(api: impl SecurityGroupApi, config: &AuditConfig, out: Option<&Path>) -> Result<()> {
    let watched = config.watched_set();
    let groups = api.describe_groups()?;
    let findings = build_findings(&groups, &PortFilter::All, &watched);
    let summary = summarize(&groups, &findings, chrono::Utc::now().timestamp());
    info!(summary = %serde_json::to_string(&summary)?, "audit summary");
    output::write_json(&findings, out)
}
