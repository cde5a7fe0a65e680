use serde::{Serialize, Deserialize};

/// Minecraft edition a status lookup targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Edition {
    Java,
    Bedrock,
}

/// The record returned by the API for one lookup.
/// This is the canonical data model shared by the daemon and its clients.
///
/// An offline server only carries `online`, `host`, `port` and `type`;
/// everything else lives in `details` and is omitted from the JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerStatus {
    pub online: bool,

    /// Host as given by the caller (never the SRV target)
    pub host: String,

    /// Resolved port, if one was known
    pub port: Option<u16>,

    #[serde(rename = "type")]
    pub edition: Edition,

    #[serde(flatten)]
    pub details: Option<StatusDetails>,
}

/// Fields only present when the server answered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusDetails {
    pub srv: SrvInfo,
    pub version: Version,
    pub players: Players,
    pub motd: Motd,
    /// PNG icon as a data URI; always null for Bedrock
    pub icon: Option<String>,
}

/// Result of the `_minecraft._tcp` SRV lookup, echoed back for information.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SrvInfo {
    pub target: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Version {
    Java(JavaVersion),
    /// Bedrock only reports a version name
    Bedrock(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JavaVersion {
    pub name_clean: String,
    pub protocol: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Players {
    pub online: i32,
    pub max: i32,
    /// Sampled player names; empty when the server sent no sample
    pub list: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Motd {
    Formatted(FormattedMotd),
    /// Bedrock message of the day, passed through untouched
    Plain(String),
}

/// Three views of the same Java description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedMotd {
    pub raw: String,
    pub clean: String,
    pub html: String,
}

impl ServerStatus {
    pub fn offline(host: impl Into<String>, port: Option<u16>, edition: Edition) -> Self {
        Self {
            online: false,
            host: host.into(),
            port,
            edition,
            details: None,
        }
    }

    pub fn online(
        host: impl Into<String>,
        port: Option<u16>,
        edition: Edition,
        details: StatusDetails,
    ) -> Self {
        Self {
            online: true,
            host: host.into(),
            port,
            edition,
            details: Some(details),
        }
    }
}
