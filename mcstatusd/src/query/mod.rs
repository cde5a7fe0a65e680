pub mod bedrock;
pub mod chat;
pub mod java;
pub mod varint;

use std::fmt;
use std::future::Future;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use thiserror::Error;
use shared::protocol::{DEFAULT_BEDROCK_PORT, DEFAULT_JAVA_PORT};
use crate::address::srv::SrvDiscovery;
use crate::config::QueryConfig;

/// Where to send a status query. Without a port the edition default applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTarget {
    pub host: String,
    pub port: Option<u16>,
}

impl QueryTarget {
    pub fn new(host: impl Into<String>, port: Option<u16>) -> Self {
        Self { host: host.into(), port }
    }
}

impl fmt::Display for QueryTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}:{}", self.host, port),
            None => f.write_str(&self.host),
        }
    }
}

/// Status reported by a Java server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaStatus {
    /// Legacy-formatted description, may contain `\n`
    pub description: String,
    pub version_name: String,
    pub protocol: i32,
    pub players_online: i32,
    pub players_max: i32,
    /// `None` when the server sent no sample at all
    pub sample: Option<Vec<String>>,
    /// Data URI as sent by the server
    pub icon: Option<String>,
}

/// Status reported by a Bedrock server's unconnected pong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BedrockStatus {
    pub motd: String,
    pub version_name: String,
    pub protocol: Option<i32>,
    pub players_online: i32,
    pub players_max: i32,
    pub map: Option<String>,
    pub game_mode: Option<String>,
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no response within {0:?}")]
    Timeout(Duration),
    #[error("no address found for {0}")]
    Unresolvable(String),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("invalid status JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[async_trait]
pub trait StatusQuery: Send + Sync {
    async fn query_java(&self, target: &QueryTarget) -> Result<JavaStatus, QueryError>;
    async fn query_bedrock(&self, target: &QueryTarget) -> Result<BedrockStatus, QueryError>;
}

/// Queries real servers over the network.
pub struct MinecraftQuery {
    srv: Arc<dyn SrvDiscovery>,
    timeout: Duration,
    bedrock_tries: u32,
}

impl MinecraftQuery {
    pub fn new(srv: Arc<dyn SrvDiscovery>, config: &QueryConfig) -> Self {
        Self {
            srv,
            timeout: config.timeout(),
            bedrock_tries: config.bedrock_tries.max(1),
        }
    }

    /// Java clients follow the SRV record when no port was given.
    async fn java_endpoint(&self, target: &QueryTarget) -> (String, u16) {
        if let Some(port) = target.port {
            return (target.host.clone(), port);
        }
        if target.host.parse::<IpAddr>().is_ok() {
            return (target.host.clone(), DEFAULT_JAVA_PORT);
        }

        match self.srv.discover(&target.host).await {
            Ok(Some(record)) => (record.target.trim_end_matches('.').to_string(), record.port),
            Ok(None) => (target.host.clone(), DEFAULT_JAVA_PORT),
            Err(e) => {
                tracing::debug!("Ignoring SRV failure for {}: {}", target.host, e);
                (target.host.clone(), DEFAULT_JAVA_PORT)
            }
        }
    }
}

#[async_trait]
impl StatusQuery for MinecraftQuery {
    async fn query_java(&self, target: &QueryTarget) -> Result<JavaStatus, QueryError> {
        let (host, port) = self.java_endpoint(target).await;
        tracing::debug!("Pinging Java server {}:{}", host, port);
        with_deadline(self.timeout, java::ping(&host, port)).await
    }

    async fn query_bedrock(&self, target: &QueryTarget) -> Result<BedrockStatus, QueryError> {
        let port = target.port.unwrap_or(DEFAULT_BEDROCK_PORT);
        let per_try = self.timeout / self.bedrock_tries;
        tracing::debug!("Pinging Bedrock server {}:{}", target.host, port);
        with_deadline(
            self.timeout,
            bedrock::ping(&target.host, port, self.bedrock_tries, per_try),
        )
        .await
    }
}

async fn with_deadline<T>(
    limit: Duration,
    fut: impl Future<Output = Result<T, QueryError>>,
) -> Result<T, QueryError> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| QueryError::Timeout(limit))?
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::srv::fake::{Answer, FakeSrv};

    fn query_with(srv: FakeSrv) -> (Arc<FakeSrv>, MinecraftQuery) {
        let srv = Arc::new(srv);
        let query = MinecraftQuery::new(srv.clone(), &QueryConfig::default());
        (srv, query)
    }

    #[test]
    fn test_target_display() {
        assert_eq!(QueryTarget::new("mc.example.org", None).to_string(), "mc.example.org");
        assert_eq!(QueryTarget::new("10.0.0.1", Some(25566)).to_string(), "10.0.0.1:25566");
    }

    #[tokio::test]
    async fn test_java_endpoint_follows_srv() {
        let (srv, query) = query_with(FakeSrv::found("node3.example.org.", 25601));
        let endpoint = query.java_endpoint(&QueryTarget::new("play.example.org", None)).await;

        assert_eq!(endpoint, ("node3.example.org".to_string(), 25601));
        assert_eq!(srv.calls(), 1);
    }

    #[tokio::test]
    async fn test_java_endpoint_defaults() {
        let (srv, query) = query_with(FakeSrv::new(Answer::Fail));

        let endpoint = query.java_endpoint(&QueryTarget::new("play.example.org", None)).await;
        assert_eq!(endpoint, ("play.example.org".to_string(), 25565));

        let endpoint = query.java_endpoint(&QueryTarget::new("127.0.0.1", None)).await;
        assert_eq!(endpoint, ("127.0.0.1".to_string(), 25565));

        let endpoint = query.java_endpoint(&QueryTarget::new("play.example.org", Some(1))).await;
        assert_eq!(endpoint, ("play.example.org".to_string(), 1));

        assert_eq!(srv.calls(), 1);
    }

    #[tokio::test]
    async fn test_deadline_maps_to_timeout() {
        let limit = Duration::from_millis(10);
        let result: Result<(), QueryError> = with_deadline(limit, async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(QueryError::Timeout(d)) if d == limit));
    }
}
