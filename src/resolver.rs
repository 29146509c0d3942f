// src/resolver.rs
use crate::types::{Config, NescError, Protocol, ResolverSettings};
use async_trait::async_trait;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use trust_dns_resolver::config::{
    LookupIpStrategy, NameServerConfig, Protocol as DnsProtocol, ResolverConfig as DnsResolverConfig,
    ResolverOpts,
};
use trust_dns_resolver::TokioAsyncResolver;

/// Host-address lookup used by the worker pool.
#[async_trait]
pub trait HostLookup: Send + Sync {
    async fn lookup_host(&self, name: &str) -> Result<Vec<IpAddr>, NescError>;
}

/// A resolver pinned to one nameserver and one transport.
pub struct ResolutionEnvironment {
    resolver: TokioAsyncResolver,
    nameserver: SocketAddr,
    protocol: Protocol,
}

impl ResolutionEnvironment {
    pub fn new(config: &Config) -> Result<Self, NescError> {
        Self::with_settings(config.protocol(), config.resolver())
    }

    pub fn with_settings(protocol: Protocol, settings: &ResolverSettings) -> Result<Self, NescError> {
        let nameserver = SocketAddr::from_str(&settings.nameserver).map_err(|e| {
            NescError::Settings(format!("Invalid nameserver address {}: {}", settings.nameserver, e))
        })?;

        let mut resolver_config = DnsResolverConfig::new();
        resolver_config.add_name_server(NameServerConfig {
            socket_addr: nameserver,
            protocol: dns_protocol(protocol),
            tls_dns_name: None,
            trust_negative_responses: false,
            bind_addr: None,
        });

        Ok(Self {
            resolver: TokioAsyncResolver::tokio(resolver_config, resolver_opts(settings)),
            nameserver,
            protocol,
        })
    }

    pub fn nameserver(&self) -> SocketAddr {
        self.nameserver
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }
}

#[async_trait]
impl HostLookup for ResolutionEnvironment {
    async fn lookup_host(&self, name: &str) -> Result<Vec<IpAddr>, NescError> {
        self.resolver
            .lookup_ip(name)
            .await
            .map(|lookup| lookup.iter().collect())
            .map_err(|e| NescError::Resolution(format!("Failed to resolve {}: {}", name, e)))
    }
}

/// One attempt per name, both address families in a single answer set.
pub(crate) fn resolver_opts(settings: &ResolverSettings) -> ResolverOpts {
    let mut opts = ResolverOpts::default();
    opts.timeout = settings.connect_timeout();
    opts.attempts = 1;
    opts.ip_strategy = LookupIpStrategy::Ipv4AndIpv6;
    opts
}

fn dns_protocol(protocol: Protocol) -> DnsProtocol {
    match protocol {
        Protocol::Udp => DnsProtocol::Udp,
        Protocol::Tcp => DnsProtocol::Tcp,
    }
}

/// Joins a wordlist label and the target domain.
pub fn subdomain(label: &str, domain: &str) -> String {
    format!("{}.{}", label, domain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subdomain() {
        assert_eq!(subdomain("www", "example.com"), "www.example.com");
    }

    #[test]
    fn test_dns_protocol() {
        assert_eq!(dns_protocol(Protocol::Udp), DnsProtocol::Udp);
        assert_eq!(dns_protocol(Protocol::Tcp), DnsProtocol::Tcp);
    }

    #[test]
    fn test_resolver_opts_return_both_address_families() {
        let settings = ResolverSettings {
            nameserver: "8.8.8.8:53".to_string(),
            connect_timeout_secs: 3,
        };
        let opts = resolver_opts(&settings);
        assert_eq!(opts.ip_strategy, LookupIpStrategy::Ipv4AndIpv6);
        assert_eq!(opts.timeout, std::time::Duration::from_secs(3));
        assert_eq!(opts.attempts, 1);
    }

    #[tokio::test]
    async fn test_environment_binds_endpoint_and_transport() {
        let settings = ResolverSettings {
            nameserver: "1.1.1.1:53".to_string(),
            connect_timeout_secs: 2,
        };
        let env = ResolutionEnvironment::with_settings(Protocol::Tcp, &settings).unwrap();
        assert_eq!(env.nameserver(), "1.1.1.1:53".parse().unwrap());
        assert_eq!(env.protocol(), Protocol::Tcp);
    }

    #[tokio::test]
    async fn test_environment_rejects_bad_nameserver() {
        let settings = ResolverSettings {
            nameserver: "not-an-address".to_string(),
            connect_timeout_secs: 2,
        };
        assert!(matches!(
            ResolutionEnvironment::with_settings(Protocol::Udp, &settings),
            Err(NescError::Settings(_))
        ));
    }
}
