//! Shared types for the risk engine: rules, groups, risk levels, plans.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, RampartResult};

// ── Protocol ────────────────────────────────────────────────────────────────

/// IP protocol of an ingress rule. `All` models the wire value `-1`
/// (every protocol, every port).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
    Icmp,
    #[serde(rename = "-1", alias = "all")]
    All,
}

impl Protocol {
    /// Parse the wire value used by the security-group API. Numeric protocol
    /// ids for tcp/udp/icmp are accepted; anything else is unsupported.
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "tcp" | "6" => Some(Protocol::Tcp),
            "udp" | "17" => Some(Protocol::Udp),
            "icmp" | "1" | "icmpv6" | "58" => Some(Protocol::Icmp),
            "-1" | "all" => Some(Protocol::All),
            _ => None,
        }
    }

    pub fn as_wire(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::Icmp => "icmp",
            Protocol::All => "-1",
        }
    }
}

// ── Rules and groups ────────────────────────────────────────────────────────

/// A single ingress allow-rule. Immutable once fetched — remediation builds
/// fresh rule values rather than editing one in place.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SgRule {
    pub protocol: Protocol,
    /// Port range start; equal to `to_port` for a single port, `None` for
    /// portless rules (icmp, all-protocol).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_port: Option<u16>,
    /// Source range in CIDR notation, v4 or v6.
    pub cidr: String,
}

impl SgRule {
    pub fn new(
        protocol: Protocol,
        from_port: Option<u16>,
        to_port: Option<u16>,
        cidr: impl Into<String>,
    ) -> Self {
        Self {
            protocol,
            from_port,
            to_port,
            cidr: cidr.into(),
        }
    }

    /// Same protocol and port range, different source — the replacement rule
    /// shape used by the remediation planner.
    pub fn with_cidr(&self, cidr: &str) -> Self {
        Self {
            protocol: self.protocol,
            from_port: self.from_port,
            to_port: self.to_port,
            cidr: cidr.into(),
        }
    }

    /// True when the source range admits the entire internet. IPv4 and IPv6
    /// are treated symmetrically.
    pub fn is_world_open(&self) -> bool {
        self.cidr == "0.0.0.0/0" || self.cidr == "::/0"
    }

    /// Whether the rule's port span covers `port`. Portless rules (icmp,
    /// all-protocol) span every port.
    pub fn covers_port(&self, port: u16) -> bool {
        match (self.from_port, self.to_port) {
            (Some(from), Some(to)) => from <= port && port <= to,
            _ => true,
        }
    }
}

impl fmt::Display for SgRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.from_port, self.to_port) {
            (Some(from), Some(to)) if from == to => {
                write!(f, "{}/{} from {}", self.protocol.as_wire(), from, self.cidr)
            }
            (Some(from), Some(to)) => write!(
                f,
                "{}/{}-{} from {}",
                self.protocol.as_wire(),
                from,
                to,
                self.cidr
            ),
            _ => write!(f, "{}/* from {}", self.protocol.as_wire(), self.cidr),
        }
    }
}

/// A security group as fetched from the cloud: identity plus its ingress
/// rule set. Rule order is irrelevant to evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroup {
    pub group_id: String,
    pub name: String,
    #[serde(default)]
    pub vpc_id: String,
    #[serde(default)]
    pub ingress: Vec<SgRule>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

// ── Risk levels ─────────────────────────────────────────────────────────────

/// Exposure classification for a group. Ordered so the group level is the
/// maximum over its rules. Never stored — always recomputed from rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Secure,
    Low,
    Medium,
    High,
    Extreme,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Secure => "SECURE",
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Extreme => "EXTREME",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ── Findings and plans ──────────────────────────────────────────────────────

/// One row of `find`/`report` output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub group_id: String,
    pub group_name: String,
    pub risk_level: RiskLevel,
    pub violating_rules: Vec<SgRule>,
}

/// The rule mutation needed to remediate one group. Constructed fresh per
/// invocation, never persisted between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemediationPlan {
    pub revoke: Vec<SgRule>,
    pub authorize: Vec<SgRule>,
}

impl RemediationPlan {
    pub fn is_empty(&self) -> bool {
        self.revoke.is_empty() && self.authorize.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    /// Revoke/authorize calls were issued and succeeded.
    Remediated,
    /// Dry-run: the plan was computed and logged, nothing was changed.
    Planned,
    /// Empty plan — nothing to do for this group.
    Skipped,
    /// The group failed mid-batch; `error` carries the reason.
    Error,
}

/// Per-group result row for `remediate`/`bulk-remediate` output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemediationOutcome {
    pub group_id: String,
    pub status: OutcomeStatus,
    pub revoked: Vec<SgRule>,
    pub authorized: Vec<SgRule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RemediationOutcome {
    pub fn error(group_id: &str, message: String) -> Self {
        Self {
            group_id: group_id.into(),
            status: OutcomeStatus::Error,
            revoked: Vec::new(),
            authorized: Vec::new(),
            error: Some(message),
        }
    }
}

// ── Port filters and input validation ───────────────────────────────────────

/// Which ports a `find`/`remediate` invocation cares about, parsed from
/// `--ports <csv|all>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortFilter {
    /// Match any world-open rule regardless of port.
    All,
    /// Match world-open rules whose span covers one of these ports.
    Watched(BTreeSet<u16>),
}

impl PortFilter {
    pub fn parse(s: &str) -> RampartResult<Self> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(PortFilter::All)
        } else {
            Ok(PortFilter::Watched(parse_ports(s)?))
        }
    }

    pub fn matches(&self, rule: &SgRule) -> bool {
        match self {
            PortFilter::All => true,
            // icmp carries no ports, so a port-scoped filter never selects it
            PortFilter::Watched(ports) => {
                rule.protocol != Protocol::Icmp && ports.iter().any(|p| rule.covers_port(*p))
            }
        }
    }
}

/// Parse a comma-separated port list. Empty input or a non-port token is a
/// validation error.
pub fn parse_ports(s: &str) -> RampartResult<BTreeSet<u16>> {
    let mut ports = BTreeSet::new();
    for token in s.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let port: u16 = token
            .parse()
            .map_err(|_| Error::Validation(format!("invalid port '{token}'")))?;
        ports.insert(port);
    }
    if ports.is_empty() {
        return Err(Error::Validation(format!("no ports in '{s}'")));
    }
    Ok(ports)
}

/// Parse a comma-separated CIDR list, validating each entry.
pub fn parse_cidrs(s: &str) -> RampartResult<Vec<String>> {
    let mut cidrs = Vec::new();
    for token in s.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        validate_cidr(token)?;
        cidrs.push(token.to_string());
    }
    if cidrs.is_empty() {
        return Err(Error::Validation(format!("no CIDR ranges in '{s}'")));
    }
    Ok(cidrs)
}

/// Syntactic CIDR check: `address/prefix` with a prefix length that fits the
/// address family.
pub fn validate_cidr(s: &str) -> RampartResult<()> {
    let (addr, prefix) = s
        .split_once('/')
        .ok_or_else(|| Error::Validation(format!("'{s}' is not CIDR notation")))?;
    let addr: IpAddr = addr
        .parse()
        .map_err(|_| Error::Validation(format!("'{s}' has an invalid address")))?;
    let prefix: u8 = prefix
        .parse()
        .map_err(|_| Error::Validation(format!("'{s}' has an invalid prefix length")))?;
    let max = if addr.is_ipv4() { 32 } else { 128 };
    if prefix > max {
        return Err(Error::Validation(format!(
            "'{s}' prefix length exceeds /{max}"
        )));
    }
    Ok(())
}
