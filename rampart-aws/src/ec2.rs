//! Security-group operations over the CLI runner: describe, authorize,
//! revoke, plus the flattening from the wire shape into core types.
//!
//! The wire shape nests ranges inside permissions (`IpPermissions[]` ×
//! `IpRanges[]`/`Ipv6Ranges[]`); the engine wants one rule per
//! (permission, cidr) pair, so describe flattens on the way in.

use serde_json::{json, Map, Value};
use tracing::warn;

use rampart_core::error::{Error, RampartResult};
use rampart_core::orchestrator::SecurityGroupApi;
use rampart_core::types::{Protocol, SecurityGroup, SgRule};

use crate::cli::AwsCli;

pub struct Ec2Client {
    cli: AwsCli,
}

impl Ec2Client {
    pub fn new(cli: AwsCli) -> Self {
        Self { cli }
    }
}

impl SecurityGroupApi for Ec2Client {
    fn describe_groups(&self) -> RampartResult<Vec<SecurityGroup>> {
        let response = self.cli.run(&["ec2", "describe-security-groups"])?;
        parse_groups(&response)
    }

    fn describe_group(&self, group_id: &str) -> RampartResult<SecurityGroup> {
        let response = self
            .cli
            .run(&["ec2", "describe-security-groups", "--group-ids", group_id])?;
        parse_groups(&response)?
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(format!("security group {group_id}")))
    }

    fn authorize_ingress(&self, group_id: &str, rule: &SgRule) -> RampartResult<()> {
        let permissions = ip_permission_json(rule);
        self.cli.run(&[
            "ec2",
            "authorize-security-group-ingress",
            "--group-id",
            group_id,
            "--ip-permissions",
            &permissions,
        ])?;
        Ok(())
    }

    fn revoke_ingress(&self, group_id: &str, rule: &SgRule) -> RampartResult<()> {
        let permissions = ip_permission_json(rule);
        self.cli.run(&[
            "ec2",
            "revoke-security-group-ingress",
            "--group-id",
            group_id,
            "--ip-permissions",
            &permissions,
        ])?;
        Ok(())
    }
}

// ── Wire parsing ────────────────────────────────────────────────────────────

pub(crate) fn parse_groups(response: &Value) -> RampartResult<Vec<SecurityGroup>> {
    let groups = response["SecurityGroups"]
        .as_array()
        .ok_or_else(|| Error::Validation("response has no SecurityGroups array".into()))?;
    Ok(groups.iter().map(parse_group).collect())
}

fn parse_group(value: &Value) -> SecurityGroup {
    let mut ingress = Vec::new();
    for permission in value["IpPermissions"].as_array().unwrap_or(&Vec::new()) {
        let wire_protocol = permission["IpProtocol"].as_str().unwrap_or("");
        let Some(protocol) = Protocol::from_wire(wire_protocol) else {
            warn!(protocol = wire_protocol, "skipping unsupported protocol");
            continue;
        };
        let from_port = parse_port(&permission["FromPort"]);
        let to_port = parse_port(&permission["ToPort"]);

        for range in permission["IpRanges"].as_array().unwrap_or(&Vec::new()) {
            if let Some(cidr) = range["CidrIp"].as_str() {
                ingress.push(SgRule::new(protocol, from_port, to_port, cidr));
            }
        }
        for range in permission["Ipv6Ranges"].as_array().unwrap_or(&Vec::new()) {
            if let Some(cidr) = range["CidrIpv6"].as_str() {
                ingress.push(SgRule::new(protocol, from_port, to_port, cidr));
            }
        }
    }

    let tags = value["Tags"]
        .as_array()
        .unwrap_or(&Vec::new())
        .iter()
        .filter_map(|tag| {
            Some((
                tag["Key"].as_str()?.to_string(),
                tag["Value"].as_str()?.to_string(),
            ))
        })
        .collect();

    SecurityGroup {
        group_id: value["GroupId"].as_str().unwrap_or_default().into(),
        name: value["GroupName"].as_str().unwrap_or_default().into(),
        vpc_id: value["VpcId"].as_str().unwrap_or_default().into(),
        ingress,
        tags,
    }
}

/// The wire uses -1 (or omission) for portless permissions.
fn parse_port(value: &Value) -> Option<u16> {
    value.as_i64().and_then(|p| u16::try_from(p).ok())
}

/// Build the `--ip-permissions` argument for one rule. The v4/v6 range slot
/// is chosen by the rule's own address family.
pub(crate) fn ip_permission_json(rule: &SgRule) -> String {
    let mut permission = Map::new();
    permission.insert("IpProtocol".into(), json!(rule.protocol.as_wire()));
    if let Some(from) = rule.from_port {
        permission.insert("FromPort".into(), json!(from));
    }
    if let Some(to) = rule.to_port {
        permission.insert("ToPort".into(), json!(to));
    }
    if rule.cidr.contains(':') {
        permission.insert("Ipv6Ranges".into(), json!([{ "CidrIpv6": rule.cidr }]));
    } else {
        permission.insert("IpRanges".into(), json!([{ "CidrIp": rule.cidr }]));
    }
    json!([permission]).to_string()
}
