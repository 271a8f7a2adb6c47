//! Blocking `aws` CLI runner with error mapping.

use std::process::Command;

use serde_json::Value;
use tracing::debug;

use rampart_core::error::{Error, RampartResult};

/// Runs `aws <args> --output json`, with region/profile forwarded when set.
#[derive(Debug, Clone, Default)]
pub struct AwsCli {
    region: Option<String>,
    profile: Option<String>,
}

impl AwsCli {
    pub fn new(region: Option<String>, profile: Option<String>) -> Self {
        Self { region, profile }
    }

    /// Run one CLI operation synchronously and parse stdout as JSON.
    /// Mutating operations that print nothing yield `Value::Null`.
    pub fn run(&self, args: &[&str]) -> RampartResult<Value> {
        let mut cmd = Command::new("aws");
        cmd.args(args).args(["--output", "json"]);
        if let Some(region) = &self.region {
            cmd.args(["--region", region]);
        }
        if let Some(profile) = &self.profile {
            cmd.args(["--profile", profile]);
        }

        debug!(?args, "aws cli call");
        let output = cmd.output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::Credential(
                    "aws CLI not found on PATH; install it to resolve credentials".into(),
                )
            } else {
                Error::Io(e)
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(map_failure(output.status.code().unwrap_or(-1), stderr.trim()));
        }
        if output.stdout.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&output.stdout)?)
    }
}

/// Map a failed CLI invocation onto the error taxonomy by the markers the
/// CLI prints to stderr.
pub(crate) fn map_failure(status: i32, stderr: &str) -> Error {
    const CREDENTIAL_MARKERS: [&str; 4] = [
        "Unable to locate credentials",
        "ExpiredToken",
        "InvalidClientTokenId",
        "SSO session",
    ];
    const PERMISSION_MARKERS: [&str; 2] = ["UnauthorizedOperation", "AccessDenied"];
    const THROTTLING_MARKERS: [&str; 2] = ["Throttling", "RequestLimitExceeded"];
    const NOT_FOUND_MARKERS: [&str; 2] = ["InvalidGroup.NotFound", "InvalidGroupId.Malformed"];

    let matched = |markers: &[&str]| markers.iter().any(|m| stderr.contains(m));

    if matched(&CREDENTIAL_MARKERS) {
        Error::Credential(stderr.into())
    } else if matched(&PERMISSION_MARKERS) {
        Error::Permission(stderr.into())
    } else if matched(&THROTTLING_MARKERS) {
        Error::Throttling(stderr.into())
    } else if matched(&NOT_FOUND_MARKERS) {
        Error::NotFound(stderr.into())
    } else {
        Error::Aws {
            status,
            stderr: stderr.into(),
        }
    }
}
