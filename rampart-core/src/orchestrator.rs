//! Bulk remediation orchestration.
//!
//! [`Remediator`] drives the plan → apply cycle over the [`SecurityGroupApi`]
//! seam. Groups are processed sequentially — the security-group API is
//! rate-limited and low-volume — and one group's failure is recorded as an
//! error outcome without aborting the rest of the batch.

use tracing::{info, warn};

use crate::error::RampartResult;
use crate::remediation;
use crate::types::{
    OutcomeStatus, PortFilter, RemediationOutcome, RemediationPlan, SecurityGroup, SgRule,
};

/// The security-group operations the engine consumes. Implemented by the AWS
/// collaborator and by in-memory fakes in tests; an enumerated seam rather
/// than any call-by-name dispatch, so every operation is checked at compile
/// time.
pub trait SecurityGroupApi {
    fn describe_groups(&self) -> RampartResult<Vec<SecurityGroup>>;
    fn describe_group(&self, group_id: &str) -> RampartResult<SecurityGroup>;
    fn authorize_ingress(&self, group_id: &str, rule: &SgRule) -> RampartResult<()>;
    fn revoke_ingress(&self, group_id: &str, rule: &SgRule) -> RampartResult<()>;
}

pub struct Remediator<A> {
    api: A,
}

impl<A: SecurityGroupApi> Remediator<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Fetch one group, plan, and apply (or log, when `dry_run`).
    pub fn remediate_group(
        &self,
        group_id: &str,
        filter: &PortFilter,
        replacement_cidrs: &[String],
        dry_run: bool,
    ) -> RampartResult<RemediationOutcome> {
        let group = self.api.describe_group(group_id)?;
        let plan = remediation::plan(&group, filter, replacement_cidrs)?;
        self.apply(group_id, plan, dry_run)
    }

    /// Execute a plan against the API, or log it when `dry_run` is set. An
    /// empty plan short-circuits to a skipped outcome.
    pub fn apply(
        &self,
        group_id: &str,
        plan: RemediationPlan,
        dry_run: bool,
    ) -> RampartResult<RemediationOutcome> {
        if plan.is_empty() {
            info!(group = group_id, "nothing to remediate");
            return Ok(RemediationOutcome {
                group_id: group_id.into(),
                status: OutcomeStatus::Skipped,
                revoked: Vec::new(),
                authorized: Vec::new(),
                error: None,
            });
        }

        if dry_run {
            for rule in &plan.revoke {
                info!(group = group_id, %rule, "would revoke");
            }
            for rule in &plan.authorize {
                info!(group = group_id, %rule, "would authorize");
            }
            return Ok(RemediationOutcome {
                group_id: group_id.into(),
                status: OutcomeStatus::Planned,
                revoked: plan.revoke,
                authorized: plan.authorize,
                error: None,
            });
        }

        for rule in &plan.revoke {
            self.api.revoke_ingress(group_id, rule)?;
            info!(group = group_id, %rule, "revoked");
        }
        for rule in &plan.authorize {
            self.api.authorize_ingress(group_id, rule)?;
            info!(group = group_id, %rule, "authorized");
        }

        Ok(RemediationOutcome {
            group_id: group_id.into(),
            status: OutcomeStatus::Remediated,
            revoked: plan.revoke,
            authorized: plan.authorize,
            error: None,
        })
    }

    /// Plan and apply across all supplied groups. Per-group API failures
    /// (permission denial, throttling, vanished group) become error outcomes;
    /// fatal errors (credentials, invalid replacement CIDRs) abort the batch.
    pub fn bulk_remediate(
        &self,
        groups: &[SecurityGroup],
        filter: &PortFilter,
        replacement_cidrs: &[String],
        dry_run: bool,
    ) -> RampartResult<Vec<RemediationOutcome>> {
        // Validate the replacements once up front so a malformed CIDR is
        // fatal before anything is touched, not a per-group error.
        for cidr in replacement_cidrs {
            crate::types::validate_cidr(cidr)?;
        }

        let mut outcomes = Vec::with_capacity(groups.len());
        for group in groups {
            let result = remediation::plan(group, filter, replacement_cidrs)
                .and_then(|plan| self.apply(&group.group_id, plan, dry_run));
            match result {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) if e.is_batch_recoverable() => {
                    warn!(group = %group.group_id, error = %e, "group failed, continuing batch");
                    outcomes.push(RemediationOutcome::error(&group.group_id, e.to_string()));
                }
                Err(e) => return Err(e),
            }
        }
        Ok(outcomes)
    }
}
