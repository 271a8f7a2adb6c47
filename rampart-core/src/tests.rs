#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::{BTreeMap, BTreeSet};

    use crate::classifier::{classify, rule_severity};
    use crate::config::AuditConfig;
    use crate::error::Error;
    use crate::orchestrator::{Remediator, SecurityGroupApi};
    use crate::remediation;
    use crate::report::{build_findings, summarize};
    use crate::types::*;

    fn rule(protocol: Protocol, port: u16, cidr: &str) -> SgRule {
        SgRule::new(protocol, Some(port), Some(port), cidr)
    }

    fn group(id: &str, ingress: Vec<SgRule>) -> SecurityGroup {
        SecurityGroup {
            group_id: id.into(),
            name: format!("{id}-name"),
            vpc_id: "vpc-1234".into(),
            ingress,
            tags: BTreeMap::new(),
        }
    }

    fn watched() -> BTreeSet<u16> {
        [22, 3389, 1433, 3306, 5432, 6379, 27017, 9200, 5601]
            .into_iter()
            .collect()
    }

    fn rfc1918() -> Vec<String> {
        vec![
            "10.0.0.0/8".into(),
            "172.16.0.0/12".into(),
            "192.168.0.0/16".into(),
        ]
    }

    // ── Fake API ────────────────────────────────────────────────────────────

    struct FakeApi {
        groups: RefCell<BTreeMap<String, SecurityGroup>>,
        denied: BTreeSet<String>,
    }

    impl FakeApi {
        fn new(groups: Vec<SecurityGroup>) -> Self {
            Self {
                groups: RefCell::new(
                    groups.into_iter().map(|g| (g.group_id.clone(), g)).collect(),
                ),
                denied: BTreeSet::new(),
            }
        }

        fn deny(mut self, group_id: &str) -> Self {
            self.denied.insert(group_id.into());
            self
        }

        fn check(&self, group_id: &str) -> Result<(), Error> {
            if self.denied.contains(group_id) {
                return Err(Error::Permission(format!(
                    "not authorized to modify {group_id}"
                )));
            }
            Ok(())
        }

        fn snapshot(&self, group_id: &str) -> SecurityGroup {
            self.groups.borrow()[group_id].clone()
        }
    }

    impl SecurityGroupApi for FakeApi {
        fn describe_groups(&self) -> Result<Vec<SecurityGroup>, Error> {
            Ok(self.groups.borrow().values().cloned().collect())
        }

        fn describe_group(&self, group_id: &str) -> Result<SecurityGroup, Error> {
            self.check(group_id)?;
            self.groups
                .borrow()
                .get(group_id)
                .cloned()
                .ok_or_else(|| Error::NotFound(format!("security group {group_id}")))
        }

        fn authorize_ingress(&self, group_id: &str, rule: &SgRule) -> Result<(), Error> {
            self.check(group_id)?;
            let mut groups = self.groups.borrow_mut();
            let g = groups
                .get_mut(group_id)
                .ok_or_else(|| Error::NotFound(format!("security group {group_id}")))?;
            g.ingress.push(rule.clone());
            Ok(())
        }

        fn revoke_ingress(&self, group_id: &str, rule: &SgRule) -> Result<(), Error> {
            self.check(group_id)?;
            let mut groups = self.groups.borrow_mut();
            let g = groups
                .get_mut(group_id)
                .ok_or_else(|| Error::NotFound(format!("security group {group_id}")))?;
            g.ingress.retain(|r| r != rule);
            Ok(())
        }
    }

    // ── Classifier ──────────────────────────────────────────────────────────

    #[test]
    fn test_secure_when_nothing_world_open() {
        let g = group(
            "sg-1",
            vec![
                rule(Protocol::Tcp, 22, "10.0.0.0/8"),
                rule(Protocol::Tcp, 3306, "192.168.1.0/24"),
            ],
        );
        assert_eq!(classify(&g, &watched()), RiskLevel::Secure);
    }

    #[test]
    fn test_extreme_all_protocol_world_open() {
        let g = group(
            "sg-1",
            vec![
                rule(Protocol::Tcp, 443, "0.0.0.0/0"),
                SgRule::new(Protocol::All, None, None, "0.0.0.0/0"),
                rule(Protocol::Tcp, 22, "10.0.0.0/8"),
            ],
        );
        assert_eq!(classify(&g, &watched()), RiskLevel::Extreme);
    }

    #[test]
    fn test_all_protocol_private_source_is_secure() {
        let g = group("sg-1", vec![SgRule::new(Protocol::All, None, None, "10.0.0.0/8")]);
        assert_eq!(classify(&g, &watched()), RiskLevel::Secure);
    }

    #[test]
    fn test_high_on_management_port() {
        let g = group(
            "sg-1",
            vec![
                rule(Protocol::Tcp, 22, "0.0.0.0/0"),
                rule(Protocol::Tcp, 443, "0.0.0.0/0"),
            ],
        );
        assert_eq!(classify(&g, &[22, 3389].into_iter().collect()), RiskLevel::High);
    }

    #[test]
    fn test_medium_on_other_watched_port() {
        let g = group("sg-1", vec![rule(Protocol::Tcp, 3306, "0.0.0.0/0")]);
        assert_eq!(classify(&g, &watched()), RiskLevel::Medium);
    }

    #[test]
    fn test_low_on_unwatched_port() {
        let g = group("sg-1", vec![rule(Protocol::Tcp, 443, "0.0.0.0/0")]);
        assert_eq!(classify(&g, &watched()), RiskLevel::Low);
    }

    #[test]
    fn test_port_range_spanning_watched_port() {
        let span = SgRule::new(Protocol::Tcp, Some(3300), Some(3400), "0.0.0.0/0");
        assert_eq!(rule_severity(&span, &watched()), RiskLevel::Medium);
        let mgmt = SgRule::new(Protocol::Tcp, Some(20), Some(25), "0.0.0.0/0");
        assert_eq!(rule_severity(&mgmt, &watched()), RiskLevel::High);
    }

    #[test]
    fn test_ipv6_world_open_is_symmetric() {
        let g = group("sg-1", vec![rule(Protocol::Tcp, 22, "::/0")]);
        assert_eq!(classify(&g, &watched()), RiskLevel::High);
    }

    #[test]
    fn test_icmp_world_open_is_low() {
        let g = group("sg-1", vec![SgRule::new(Protocol::Icmp, None, None, "0.0.0.0/0")]);
        assert_eq!(classify(&g, &watched()), RiskLevel::Low);
    }

    #[test]
    fn test_empty_rule_set_is_secure() {
        assert_eq!(classify(&group("sg-1", vec![]), &watched()), RiskLevel::Secure);
    }

    #[test]
    fn test_classification_is_order_independent() {
        let mut rules = vec![
            rule(Protocol::Tcp, 443, "0.0.0.0/0"),
            rule(Protocol::Tcp, 22, "0.0.0.0/0"),
            rule(Protocol::Tcp, 3306, "0.0.0.0/0"),
        ];
        let forward = classify(&group("sg-1", rules.clone()), &watched());
        rules.reverse();
        let backward = classify(&group("sg-1", rules), &watched());
        assert_eq!(forward, backward);
        assert_eq!(forward, RiskLevel::High);
    }

    // ── Planner ─────────────────────────────────────────────────────────────

    #[test]
    fn test_plan_is_scoped_to_watched_ports() {
        let ssh = rule(Protocol::Tcp, 22, "0.0.0.0/0");
        let https = rule(Protocol::Tcp, 443, "0.0.0.0/0");
        let g = group("sg-1", vec![ssh.clone(), https.clone()]);
        let filter = PortFilter::Watched([22, 3389].into_iter().collect());

        let plan = remediation::plan(&g, &filter, &rfc1918()).unwrap();
        assert_eq!(plan.revoke, vec![ssh]);
        assert_eq!(plan.authorize.len(), 3);
        assert!(plan
            .authorize
            .iter()
            .all(|r| r.from_port == Some(22) && !r.is_world_open()));
        assert!(!plan.revoke.contains(&https));
    }

    #[test]
    fn test_plan_idempotent_after_apply() {
        let g = group("sg-1", vec![rule(Protocol::Tcp, 22, "0.0.0.0/0")]);
        let filter = PortFilter::Watched(watched());
        let api = FakeApi::new(vec![g.clone()]);
        let remediator = Remediator::new(api);

        let plan = remediation::plan(&g, &filter, &rfc1918()).unwrap();
        remediator.apply("sg-1", plan, false).unwrap();

        let after = remediator.api().snapshot("sg-1");
        let replan = remediation::plan(&after, &filter, &rfc1918()).unwrap();
        assert!(replan.is_empty());
    }

    #[test]
    fn test_plan_all_filter_matches_any_open_port() {
        let g = group("sg-1", vec![rule(Protocol::Tcp, 443, "0.0.0.0/0")]);
        let plan = remediation::plan(&g, &PortFilter::All, &rfc1918()).unwrap();
        assert_eq!(plan.revoke.len(), 1);
        assert_eq!(plan.authorize.len(), 3);
    }

    #[test]
    fn test_plan_dedups_replacements_for_v4_v6_pair() {
        let g = group(
            "sg-1",
            vec![rule(Protocol::Tcp, 22, "0.0.0.0/0"), rule(Protocol::Tcp, 22, "::/0")],
        );
        let plan = remediation::plan(&g, &PortFilter::Watched(watched()), &rfc1918()).unwrap();
        assert_eq!(plan.revoke.len(), 2);
        assert_eq!(plan.authorize.len(), 3);
    }

    #[test]
    fn test_plan_rejects_malformed_replacement_cidr() {
        let g = group("sg-1", vec![rule(Protocol::Tcp, 22, "0.0.0.0/0")]);
        let err = remediation::plan(
            &g,
            &PortFilter::Watched(watched()),
            &["10.0.0.0/33".to_string()],
        )
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_plan_empty_for_clean_group() {
        let g = group("sg-1", vec![rule(Protocol::Tcp, 22, "10.0.0.0/8")]);
        let plan = remediation::plan(&g, &PortFilter::Watched(watched()), &rfc1918()).unwrap();
        assert!(plan.is_empty());
    }

    // ── Filters and validation ──────────────────────────────────────────────

    #[test]
    fn test_port_filter_parse() {
        assert_eq!(PortFilter::parse("all").unwrap(), PortFilter::All);
        assert_eq!(PortFilter::parse("ALL").unwrap(), PortFilter::All);
        assert_eq!(
            PortFilter::parse("22, 3389").unwrap(),
            PortFilter::Watched([22, 3389].into_iter().collect())
        );
        assert!(matches!(
            PortFilter::parse("22,ssh").unwrap_err(),
            Error::Validation(_)
        ));
        assert!(matches!(PortFilter::parse("").unwrap_err(), Error::Validation(_)));
    }

    #[test]
    fn test_validate_cidr() {
        assert!(validate_cidr("10.0.0.0/8").is_ok());
        assert!(validate_cidr("0.0.0.0/0").is_ok());
        assert!(validate_cidr("::/0").is_ok());
        assert!(validate_cidr("2001:db8::/32").is_ok());
        assert!(validate_cidr("10.0.0.0/33").is_err());
        assert!(validate_cidr("10.0.0.0").is_err());
        assert!(validate_cidr("not-a-cidr/8").is_err());
    }

    #[test]
    fn test_parse_cidrs() {
        let cidrs = parse_cidrs("10.0.0.0/8, 192.168.0.0/16").unwrap();
        assert_eq!(cidrs, vec!["10.0.0.0/8", "192.168.0.0/16"]);
        assert!(parse_cidrs("10.0.0.0/8,bogus").is_err());
    }

    // ── Orchestrator ────────────────────────────────────────────────────────

    #[test]
    fn test_bulk_remediate_tolerates_partial_failure() {
        let denied = group("sg-denied", vec![rule(Protocol::Tcp, 22, "0.0.0.0/0")]);
        let open = group("sg-open", vec![rule(Protocol::Tcp, 22, "0.0.0.0/0")]);
        let api = FakeApi::new(vec![denied.clone(), open.clone()]).deny("sg-denied");
        let remediator = Remediator::new(api);

        let outcomes = remediator
            .bulk_remediate(
                &[denied, open],
                &PortFilter::Watched(watched()),
                &rfc1918(),
                false,
            )
            .unwrap();

        assert_eq!(outcomes.len(), 2);
        let error = outcomes.iter().find(|o| o.group_id == "sg-denied").unwrap();
        assert_eq!(error.status, OutcomeStatus::Error);
        assert!(error.error.as_deref().unwrap().contains("Permission denied"));
        let ok = outcomes.iter().find(|o| o.group_id == "sg-open").unwrap();
        assert_eq!(ok.status, OutcomeStatus::Remediated);
        assert_eq!(ok.revoked.len(), 1);
        assert_eq!(ok.authorized.len(), 3);
    }

    #[test]
    fn test_bulk_remediate_fatal_on_invalid_cidr() {
        let g = group("sg-1", vec![rule(Protocol::Tcp, 22, "0.0.0.0/0")]);
        let remediator = Remediator::new(FakeApi::new(vec![g.clone()]));
        let err = remediator
            .bulk_remediate(
                &[g],
                &PortFilter::Watched(watched()),
                &["garbage".to_string()],
                false,
            )
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_apply_dry_run_leaves_state_untouched() {
        let g = group("sg-1", vec![rule(Protocol::Tcp, 22, "0.0.0.0/0")]);
        let remediator = Remediator::new(FakeApi::new(vec![g.clone()]));
        let plan = remediation::plan(&g, &PortFilter::Watched(watched()), &rfc1918()).unwrap();

        let outcome = remediator.apply("sg-1", plan, true).unwrap();
        assert_eq!(outcome.status, OutcomeStatus::Planned);
        assert_eq!(outcome.revoked.len(), 1);
        assert_eq!(outcome.authorized.len(), 3);
        assert_eq!(remediator.api().snapshot("sg-1"), g);
    }

    #[test]
    fn test_apply_empty_plan_is_skipped() {
        let g = group("sg-1", vec![rule(Protocol::Tcp, 22, "10.0.0.0/8")]);
        let remediator = Remediator::new(FakeApi::new(vec![g]));
        let outcome = remediator
            .apply("sg-1", RemediationPlan::default(), false)
            .unwrap();
        assert_eq!(outcome.status, OutcomeStatus::Skipped);
    }

    #[test]
    fn test_remediate_group_propagates_not_found() {
        let remediator = Remediator::new(FakeApi::new(vec![]));
        let err = remediator
            .remediate_group("sg-missing", &PortFilter::Watched(watched()), &rfc1918(), false)
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    // ── Report ──────────────────────────────────────────────────────────────

    #[test]
    fn test_findings_sorted_by_severity_then_id() {
        let groups = vec![
            group("sg-low", vec![rule(Protocol::Tcp, 443, "0.0.0.0/0")]),
            group("sg-clean", vec![rule(Protocol::Tcp, 22, "10.0.0.0/8")]),
            group("sg-extreme", vec![SgRule::new(Protocol::All, None, None, "0.0.0.0/0")]),
            group("sg-high", vec![rule(Protocol::Tcp, 22, "0.0.0.0/0")]),
        ];
        let findings = build_findings(&groups, &PortFilter::All, &watched());
        let ids: Vec<_> = findings.iter().map(|f| f.group_id.as_str()).collect();
        assert_eq!(ids, vec!["sg-extreme", "sg-high", "sg-low"]);
    }

    #[test]
    fn test_findings_respect_port_filter() {
        let groups = vec![group("sg-1", vec![rule(Protocol::Tcp, 443, "0.0.0.0/0")])];
        let filtered = build_findings(
            &groups,
            &PortFilter::Watched(watched()),
            &watched(),
        );
        assert!(filtered.is_empty());
        let all = build_findings(&groups, &PortFilter::All, &watched());
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_summary_counts() {
        let groups = vec![
            group("sg-high", vec![rule(Protocol::Tcp, 22, "0.0.0.0/0")]),
            group("sg-clean", vec![]),
        ];
        let findings = build_findings(&groups, &PortFilter::All, &watched());
        let summary = summarize(&groups, &findings, 1_700_000_000);
        assert_eq!(summary.groups_audited, 2);
        assert_eq!(summary.groups_flagged, 1);
        assert_eq!(summary.world_open_rules, 1);
        assert_eq!(summary.by_level[&RiskLevel::High], 1);
    }

    // ── Config ──────────────────────────────────────────────────────────────

    #[test]
    fn test_config_defaults() {
        let cfg = AuditConfig::default();
        assert!(cfg.watched_set().contains(&22));
        assert!(cfg.watched_set().contains(&5601));
        assert_eq!(cfg.audit.replacement_cidrs.len(), 3);
        assert_eq!(cfg.general.log_level, "info");
    }

    #[test]
    fn test_config_sections_are_optional() {
        let cfg: AuditConfig = toml::from_str(
            r#"
            [audit]
            watched_ports = [22]
            replacement_cidrs = ["10.0.0.0/8"]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.audit.watched_ports, vec![22]);
        assert_eq!(cfg.general.log_level, "info");
    }

    #[test]
    fn test_config_load_missing_file() {
        let err = AuditConfig::load("/nonexistent/rampart.toml").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    // ── Errors ──────────────────────────────────────────────────────────────

    #[test]
    fn test_batch_recoverable_split() {
        assert!(Error::Permission("x".into()).is_batch_recoverable());
        assert!(Error::Throttling("x".into()).is_batch_recoverable());
        assert!(Error::NotFound("x".into()).is_batch_recoverable());
        assert!(Error::Aws { status: 254, stderr: "boom".into() }.is_batch_recoverable());
        assert!(!Error::Credential("x".into()).is_batch_recoverable());
        assert!(!Error::Validation("x".into()).is_batch_recoverable());
        assert!(!Error::Config("x".into()).is_batch_recoverable());
    }
}
