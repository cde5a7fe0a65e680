use std::sync::Arc;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;
use shared::protocol::{DEFAULT_JAVA_PORT, ICON_DATA_URI_PREFIX};
use shared::types::{
    Edition, FormattedMotd, JavaVersion, Motd, Players, ServerStatus, StatusDetails, Version,
};
use crate::address::{self, AddressError, AddressSpec};
use crate::address::srv::SrvDiscovery;
use crate::motd;
use crate::query::{BedrockStatus, JavaStatus, QueryError, QueryTarget, StatusQuery};

/// Anything that turns a lookup into an offline result.
#[derive(Debug, Error)]
pub enum StatusError {
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error("status query failed: {0}")]
    Query(#[from] QueryError),
    #[error("malformed icon payload: {0}")]
    Icon(String),
}

/// Resolves an address, queries the server and builds the API record.
pub struct StatusService {
    srv: Arc<dyn SrvDiscovery>,
    query: Arc<dyn StatusQuery>,
}

impl StatusService {
    pub fn new(srv: Arc<dyn SrvDiscovery>, query: Arc<dyn StatusQuery>) -> Self {
        Self { srv, query }
    }

    /// Never fails: any error yields `online = false` with whatever
    /// host and port were known at the time.
    pub async fn get_status(&self, address: &str, edition: Edition) -> ServerStatus {
        let mut known = ServerStatus::offline(address, None, edition);

        match self.lookup(address, edition, &mut known).await {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(?edition, "Status lookup for {} failed: {}", address, e);
                known
            }
        }
    }

    async fn lookup(
        &self,
        address: &str,
        edition: Edition,
        known: &mut ServerStatus,
    ) -> Result<ServerStatus, StatusError> {
        let spec = address::resolve(address, self.srv.as_ref()).await?;
        known.host = spec.host.clone();
        known.port = spec.port;

        // The SRV target is informational; the query goes to the original host
        let target = QueryTarget::new(spec.host.clone(), spec.port);
        tracing::debug!(?edition, "Querying {}", target);

        match edition {
            Edition::Java => {
                let report = self.query.query_java(&target).await?;
                java_status(spec, report)
            }
            Edition::Bedrock => {
                let report = self.query.query_bedrock(&target).await?;
                Ok(bedrock_status(spec, report))
            }
        }
    }
}

fn java_status(spec: AddressSpec, report: JavaStatus) -> Result<ServerStatus, StatusError> {
    let icon = match report.icon.as_deref() {
        Some(icon) if !icon.is_empty() => reencode_icon(icon)?,
        _ => None,
    };
    let rendered = motd::render(&report.description);

    let details = StatusDetails {
        srv: spec.srv(),
        version: Version::Java(JavaVersion {
            name_clean: report.version_name,
            protocol: report.protocol,
        }),
        players: Players {
            online: report.players_online,
            max: report.players_max,
            list: report.sample.unwrap_or_default(),
        },
        motd: Motd::Formatted(FormattedMotd {
            raw: report.description,
            clean: rendered.clean,
            html: rendered.html,
        }),
        icon,
    };

    Ok(ServerStatus::online(
        spec.host,
        Some(spec.port.unwrap_or(DEFAULT_JAVA_PORT)),
        Edition::Java,
        details,
    ))
}

fn bedrock_status(spec: AddressSpec, report: BedrockStatus) -> ServerStatus {
    tracing::debug!(
        protocol = ?report.protocol,
        map = ?report.map,
        game_mode = ?report.game_mode,
        "Bedrock pong from {}",
        spec.host
    );

    let details = StatusDetails {
        srv: spec.srv(),
        version: Version::Bedrock(report.version_name),
        // The pong carries a count but no names
        players: Players {
            online: report.players_online,
            max: report.players_max,
            list: Vec::new(),
        },
        motd: Motd::Plain(report.motd),
        icon: None,
    };

    ServerStatus::online(spec.host, spec.port, Edition::Bedrock, details)
}

/// Decode the base64 section of the icon data URI and encode it again.
/// An icon that decodes to nothing is treated as absent.
fn reencode_icon(icon: &str) -> Result<Option<String>, StatusError> {
    let payload = icon
        .split(',')
        .nth(1)
        .ok_or_else(|| StatusError::Icon("no data URI separator".into()))?;

    let payload: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| StatusError::Icon(e.to_string()))?;

    if bytes.is_empty() {
        return Ok(None);
    }
    Ok(Some(format!("{}{}", ICON_DATA_URI_PREFIX, STANDARD.encode(bytes))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::srv::fake::{Answer, FakeSrv};
    use crate::query::fake::FakeQuery;

    fn java_report() -> JavaStatus {
        JavaStatus {
            description: "§aHello §lWorld§r!\n§7Second line".to_string(),
            version_name: "Paper 1.20.4".to_string(),
            protocol: 765,
            players_online: 3,
            players_max: 100,
            sample: Some(vec!["alex".to_string(), "kai".to_string()]),
            icon: Some("data:image/png;base64,iVBORw0KGgo=".to_string()),
        }
    }

    fn bedrock_report() -> BedrockStatus {
        BedrockStatus {
            motd: "Dedicated Server".to_string(),
            version_name: "1.21.2".to_string(),
            protocol: Some(686),
            players_online: 4,
            players_max: 10,
            map: Some("Bedrock level".to_string()),
            game_mode: Some("Survival".to_string()),
        }
    }

    fn service(srv: FakeSrv, query: FakeQuery) -> (Arc<FakeSrv>, Arc<FakeQuery>, StatusService) {
        let srv = Arc::new(srv);
        let query = Arc::new(query);
        let service = StatusService::new(srv.clone(), query.clone());
        (srv, query, service)
    }

    fn assert_offline_shape(status: &ServerStatus) {
        let value = serde_json::to_value(status).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 4, "unexpected keys {:?}", keys);
        for key in ["online", "host", "port", "type"] {
            assert!(value.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(value["online"], false);
    }

    #[tokio::test]
    async fn test_java_online_record() {
        let (_, query, service) = service(
            FakeSrv::found("node1.example.org.", 25570),
            FakeQuery { java: Some(java_report()), ..Default::default() },
        );

        let status = service.get_status("play.example.org", Edition::Java).await;
        assert!(status.online);
        assert_eq!(status.host, "play.example.org");
        assert_eq!(status.port, Some(25565));

        let details = status.details.unwrap();
        assert_eq!(details.srv.target.as_deref(), Some("node1.example.org."));
        assert_eq!(details.srv.port, Some(25570));
        assert_eq!(details.players.list, vec!["alex", "kai"]);
        assert_eq!(
            details.icon.as_deref(),
            Some("data:image/png;base64,iVBORw0KGgo=")
        );

        let Motd::Formatted(motd) = details.motd else {
            panic!("Java MOTD should be formatted");
        };
        assert_eq!(motd.clean, "Hello World!\nSecond line");
        assert!(motd.html.contains("<br>"));
        assert!(motd.raw.starts_with("§a"));

        // Query goes to the original host without a port, not the SRV target
        assert_eq!(query.targets(), vec![QueryTarget::new("play.example.org", None)]);
    }

    #[tokio::test]
    async fn test_java_keeps_explicit_port() {
        let (srv, query, service) = service(
            FakeSrv::new(Answer::Absent),
            FakeQuery { java: Some(java_report()), ..Default::default() },
        );

        let status = service.get_status("10.1.1.1:25600", Edition::Java).await;
        assert_eq!(status.port, Some(25600));
        assert_eq!(query.targets(), vec![QueryTarget::new("10.1.1.1", Some(25600))]);
        assert_eq!(srv.calls(), 0);
    }

    #[tokio::test]
    async fn test_java_without_sample_has_empty_list() {
        let mut report = java_report();
        report.sample = None;
        report.icon = None;
        let (_, _, service) = service(
            FakeSrv::new(Answer::Absent),
            FakeQuery { java: Some(report), ..Default::default() },
        );

        let details = service.get_status("1.2.3.4", Edition::Java).await.details.unwrap();
        assert!(details.players.list.is_empty());
        assert_eq!(details.players.online, 3);
        assert_eq!(details.icon, None);
        assert_eq!(details.srv.target, None);
    }

    #[tokio::test]
    async fn test_unreachable_is_offline_for_both_editions() {
        for edition in [Edition::Java, Edition::Bedrock] {
            let (_, _, service) = service(FakeSrv::new(Answer::Absent), FakeQuery::default());

            let status = service.get_status("mc.example.org:25599", edition).await;
            assert_offline_shape(&status);
            assert_eq!(status.host, "mc.example.org");
            assert_eq!(status.port, Some(25599));
            assert_eq!(status.edition, edition);
        }
    }

    #[tokio::test]
    async fn test_unreachable_java_keeps_port_unset() {
        let (_, _, service) = service(FakeSrv::new(Answer::Absent), FakeQuery::default());

        let status = service.get_status("play.example.org", Edition::Java).await;
        assert_offline_shape(&status);
        assert_eq!(status.port, None);
    }

    #[tokio::test]
    async fn test_srv_failure_is_offline() {
        let (_, query, service) = service(
            FakeSrv::new(Answer::Fail),
            FakeQuery { java: Some(java_report()), ..Default::default() },
        );

        let status = service.get_status("play.example.org", Edition::Java).await;
        assert_offline_shape(&status);
        assert_eq!(status.host, "play.example.org");
        assert!(query.targets().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_port_is_offline_with_raw_host() {
        let (_, query, service) = service(FakeSrv::new(Answer::Absent), FakeQuery::default());

        let status = service.get_status("mc.example.org:port", Edition::Bedrock).await;
        assert_offline_shape(&status);
        assert_eq!(status.host, "mc.example.org:port");
        assert_eq!(status.port, None);
        assert!(query.targets().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_icon_is_offline() {
        let mut report = java_report();
        report.icon = Some("data:image/png;base64".to_string());
        let (_, _, service) = service(
            FakeSrv::new(Answer::Absent),
            FakeQuery { java: Some(report), ..Default::default() },
        );

        let status = service.get_status("1.2.3.4", Edition::Java).await;
        assert_offline_shape(&status);
        assert_eq!(status.host, "1.2.3.4");
    }

    #[tokio::test]
    async fn test_bedrock_record() {
        let (_, query, service) = service(
            FakeSrv::new(Answer::Absent),
            FakeQuery { bedrock: Some(bedrock_report()), ..Default::default() },
        );

        let status = service.get_status("bedrock.example.org", Edition::Bedrock).await;
        assert!(status.online);
        assert_eq!(status.port, None);

        let details = status.details.unwrap();
        assert_eq!(details.version, Version::Bedrock("1.21.2".to_string()));
        assert_eq!(details.motd, Motd::Plain("Dedicated Server".to_string()));
        assert_eq!(details.players.online, 4);
        assert_eq!(details.players.max, 10);
        assert_eq!(details.icon, None);
        assert_eq!(query.targets(), vec![QueryTarget::new("bedrock.example.org", None)]);
    }

    #[test]
    fn test_reencode_icon() {
        assert_eq!(
            reencode_icon("data:image/png;base64,aGVs\nbG8=").unwrap().as_deref(),
            Some("data:image/png;base64,aGVsbG8=")
        );
        assert_eq!(reencode_icon("data:image/png;base64,").unwrap(), None);
        assert!(reencode_icon("data:image/png;base64,!!!").is_err());
    }
}
