// src/types.rs
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_WORKERS: usize = 10;
pub const MIN_WORKERS: usize = 1;
pub const MAX_WORKERS: usize = 200;
pub const WORDLIST_EXTENSION: &str = "txt";

/// Options as handed over by the caller, before validation.
#[derive(Debug, Clone)]
pub struct Options {
    /// Positional arguments; the first one is the target domain.
    pub args: Vec<String>,
    pub wordlist: PathBuf,
    pub workers: usize,
    pub protocol: String,
    pub resolver: ResolverSettings,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            args: Vec::new(),
            wordlist: PathBuf::new(),
            workers: DEFAULT_WORKERS,
            protocol: "udp".to_string(),
            resolver: ResolverSettings::default(),
        }
    }
}

/// Validated run configuration. Only `config::validate` builds one.
#[derive(Debug, Clone)]
pub struct Config {
    pub(crate) domain: String,
    pub(crate) wordlist: PathBuf,
    pub(crate) workers: usize,
    pub(crate) protocol: Protocol,
    pub(crate) resolver: ResolverSettings,
}

impl Config {
    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn wordlist(&self) -> &PathBuf {
        &self.wordlist
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn resolver(&self) -> &ResolverSettings {
        &self.resolver
    }

    /// Capacity of the candidate queue.
    pub fn queue_capacity(&self) -> usize {
        self.workers * 2
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Udp,
    Tcp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Udp => "udp",
            Protocol::Tcp => "tcp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "udp" => Ok(Protocol::Udp),
            "tcp" => Ok(Protocol::Tcp),
            _ => Err(ConfigError::InvalidProtocol(s.to_string())),
        }
    }
}

/// Where and how fast the resolver is contacted. Loaded from the optional
/// config file, then overridden from the environment and the command line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ResolverSettings {
    pub nameserver: String,
    pub connect_timeout_secs: u64,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            nameserver: "8.8.8.8:53".to_string(),
            connect_timeout_secs: 2,
        }
    }
}

impl ResolverSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionResult {
    pub subdomain: String,
    pub addresses: Vec<IpAddr>,
}

impl ResolutionResult {
    pub fn new(subdomain: String, addresses: Vec<IpAddr>) -> Self {
        Self { subdomain, addresses }
    }
}

impl fmt::Display for ResolutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let addresses: Vec<String> = self.addresses.iter().map(|ip| ip.to_string()).collect();
        write!(f, "{}: {}", self.subdomain, addresses.join(","))
    }
}

#[derive(Debug, Clone)]
pub struct EnumerationStats {
    /// Non-empty labels handed to the worker pool.
    pub candidates: usize,
    pub attempted: usize,
    pub resolved: usize,
    pub duration: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing domain argument")]
    MissingDomain,

    #[error("missing wordlist path. Provide a path using --wordlist or -w")]
    MissingWordlist,

    #[error("invalid wordlist extension for '{0}'. Allowed extensions: txt")]
    InvalidExtension(String),

    #[error("wordlist file '{0}' not found")]
    WordlistNotFound(String),

    #[error("cannot access wordlist file '{path}': {reason}")]
    WordlistUnreadable { path: String, reason: String },

    #[error("invalid protocol: '{0}'. Use 'udp' or 'tcp'")]
    InvalidProtocol(String),

    #[error("invalid workers value: '{0}'. Allowed range: 1-200")]
    InvalidConcurrency(usize),

    #[error("invalid resolver address '{0}'. Expected ip:port")]
    InvalidResolver(String),

    #[error("resolver timeout must be greater than 0")]
    InvalidTimeout,
}

#[derive(Debug, Error)]
pub enum NescError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("Error reading wordlist '{path}': {source}")]
    WordlistIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Enumeration interrupted")]
    Cancelled,

    #[error("Resolution error: {0}")]
    Resolution(String),

    #[error("Output error: {0}")]
    Output(String),

    #[error("Wordlist reader stopped without reporting a status")]
    TerminalStatusLost,
}

impl NescError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, NescError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_parse_is_case_insensitive() {
        assert_eq!("UDP".parse::<Protocol>(), Ok(Protocol::Udp));
        assert_eq!("Tcp".parse::<Protocol>(), Ok(Protocol::Tcp));
        assert_eq!(
            "icmp".parse::<Protocol>(),
            Err(ConfigError::InvalidProtocol("icmp".to_string()))
        );
    }

    #[test]
    fn test_result_display() {
        let result = ResolutionResult::new(
            "www.example.com".to_string(),
            vec!["93.184.216.34".parse().unwrap(), "2606:2800:220:1::1".parse().unwrap()],
        );
        assert_eq!(result.to_string(), "www.example.com: 93.184.216.34,2606:2800:220:1::1");
    }
}
