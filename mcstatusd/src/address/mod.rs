pub mod srv;

use std::num::ParseIntError;
use std::sync::OnceLock;
use regex::Regex;
use thiserror::Error;
use shared::types::SrvInfo;
use crate::address::srv::{SrvDiscovery, SrvError};

/// Dotted quad with an optional port. Octets are only checked for digit
/// count, so `999.1.1.1` is accepted and passed through.
fn ipv4_with_port() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3})(?::([0-9]+))?$")
            .expect("IPv4 pattern is valid")
    })
}

/// A user supplied address after interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressSpec {
    /// Always the host the caller gave us, never the SRV target
    pub host: String,
    pub port: Option<u16>,
    pub srv_target: Option<String>,
    pub srv_port: Option<u16>,
}

impl AddressSpec {
    pub fn srv(&self) -> SrvInfo {
        SrvInfo {
            target: self.srv_target.clone(),
            port: self.srv_port,
        }
    }
}

/// How an address string is to be treated, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressForm<'a> {
    Literal { host: &'a str, port: Option<&'a str> },
    ExplicitPort { host: &'a str, port: &'a str },
    NeedsDiscovery(&'a str),
}

#[derive(Debug, Error)]
pub enum AddressError {
    #[error("invalid port {port:?} in address {address:?}")]
    InvalidPort {
        address: String,
        port: String,
        #[source]
        source: ParseIntError,
    },
    #[error(transparent)]
    Srv(#[from] SrvError),
}

pub fn classify(address: &str) -> AddressForm<'_> {
    if let Some(caps) = ipv4_with_port().captures(address) {
        // Group 1 always participates in a match
        let host = caps.get(1).map_or(address, |m| m.as_str());
        return AddressForm::Literal {
            host,
            port: caps.get(2).map(|m| m.as_str()),
        };
    }

    // A trailing colon does not count as a port; "host:" goes to discovery as-is
    if !address.ends_with(':') {
        if let Some((host, port)) = address.split_once(':') {
            return AddressForm::ExplicitPort { host, port };
        }
    }

    AddressForm::NeedsDiscovery(address)
}

/// Interpret `address`, consulting SRV discovery only for bare hostnames.
pub async fn resolve(address: &str, srv: &dyn SrvDiscovery) -> Result<AddressSpec, AddressError> {
    let spec = match classify(address) {
        AddressForm::Literal { host, port } => AddressSpec {
            host: host.to_string(),
            port: port.map(|p| parse_port(address, p)).transpose()?,
            srv_target: None,
            srv_port: None,
        },
        AddressForm::ExplicitPort { host, port } => AddressSpec {
            host: host.to_string(),
            port: Some(parse_port(address, port)?),
            srv_target: None,
            srv_port: None,
        },
        AddressForm::NeedsDiscovery(host) => {
            let record = srv.discover(host).await?;
            AddressSpec {
                host: host.to_string(),
                port: None,
                srv_target: record.as_ref().map(|r| r.target.clone()),
                srv_port: record.map(|r| r.port),
            }
        }
    };

    tracing::debug!(?spec, "Resolved address {}", address);
    Ok(spec)
}

fn parse_port(address: &str, port: &str) -> Result<u16, AddressError> {
    port.parse::<u16>().map_err(|source| AddressError::InvalidPort {
        address: address.to_string(),
        port: port.to_string(),
        source,
    })
}
