use async_trait::async_trait;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::TokioAsyncResolver;
use thiserror::Error;
use shared::protocol::SRV_SERVICE;

/// First record of a `_minecraft._tcp` SRV answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrvRecord {
    /// Target as returned by DNS, trailing dot included
    pub target: String,
    pub port: u16,
}

/// A lookup that failed for a reason other than "no such record".
#[derive(Debug, Error)]
pub enum SrvError {
    #[error("SRV lookup for {name} failed: {source}")]
    Transport {
        name: String,
        #[source]
        source: ResolveError,
    },
}

#[async_trait]
pub trait SrvDiscovery: Send + Sync {
    /// Look up `_minecraft._tcp.<domain>`. An absent record is `Ok(None)`.
    async fn discover(&self, domain: &str) -> Result<Option<SrvRecord>, SrvError>;
}

pub fn srv_name(domain: &str) -> String {
    format!("{}.{}", SRV_SERVICE, domain)
}

/// SRV discovery backed by the hickory tokio resolver.
pub struct HickorySrvDiscovery {
    resolver: TokioAsyncResolver,
}

impl HickorySrvDiscovery {
    pub fn new(use_system_conf: bool) -> Self {
        let resolver = if use_system_conf {
            match TokioAsyncResolver::tokio_from_system_conf() {
                Ok(resolver) => resolver,
                Err(e) => {
                    tracing::warn!("Falling back to default resolver config: {}", e);
                    Self::default_resolver()
                }
            }
        } else {
            Self::default_resolver()
        };

        Self { resolver }
    }

    fn default_resolver() -> TokioAsyncResolver {
        TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
    }
}

#[async_trait]
impl SrvDiscovery for HickorySrvDiscovery {
    async fn discover(&self, domain: &str) -> Result<Option<SrvRecord>, SrvError> {
        let name = srv_name(domain);

        match self.resolver.srv_lookup(name.as_str()).await {
            // First record in the answer wins; priority and weight are ignored
            Ok(lookup) => Ok(lookup.iter().next().map(|srv| SrvRecord {
                target: srv.target().to_utf8(),
                port: srv.port(),
            })),
            Err(e) if is_absent(&e) => {
                tracing::debug!("No SRV record for {}", name);
                Ok(None)
            }
            Err(source) => Err(SrvError::Transport { name, source }),
        }
    }
}

/// NXDOMAIN and empty answers both surface as `NoRecordsFound`
fn is_absent(err: &ResolveError) -> bool {
    matches!(err.kind(), ResolveErrorKind::NoRecordsFound { .. })
}
