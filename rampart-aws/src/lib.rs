//! # Rampart AWS — the cloud collaborator
//!
//! Talks to the security-group API by invoking the `aws` CLI as a blocking
//! subprocess and parsing its JSON output. Credential resolution (profile /
//! role chain / SSO) is entirely the CLI's problem — this crate never handles
//! a credential itself, it only maps the CLI's failures onto the core error
//! taxonomy.

pub mod cli;
pub mod ec2;

pub use cli::AwsCli;
pub use ec2::Ec2Client;
