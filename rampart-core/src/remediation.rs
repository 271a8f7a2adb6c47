//! Remediation planning: compute the minimal rule mutation that closes a
//! group's world-open ingress, without touching the cloud.
//!
//! Scoping is a safety property: only rules matching the port filter are
//! planned for revocation; everything else stays out of the plan entirely.

use crate::error::RampartResult;
use crate::types::{validate_cidr, PortFilter, RemediationPlan, SecurityGroup};

/// Build the plan for one group.
///
/// Every world-open ingress rule matching `filter` is scheduled for
/// revocation, with one replacement per entry in `replacement_cidrs` carrying
/// the same protocol and port range. Replacements are deduplicated, so a
/// v4/v6 world-open pair on the same port yields one set of substitutes.
///
/// Idempotent: a group with no world-open rules on filtered ports yields an
/// empty plan.
pub fn plan(
    group: &SecurityGroup,
    filter: &PortFilter,
    replacement_cidrs: &[String],
) -> RampartResult<RemediationPlan> {
    for cidr in replacement_cidrs {
        validate_cidr(cidr)?;
    }

    let mut plan = RemediationPlan::default();
    for rule in &group.ingress {
        if !rule.is_world_open() || !filter.matches(rule) {
            continue;
        }
        plan.revoke.push(rule.clone());
        for cidr in replacement_cidrs {
            let replacement = rule.with_cidr(cidr);
            if !plan.authorize.contains(&replacement) {
                plan.authorize.push(replacement);
            }
        }
    }
    Ok(plan)
}
